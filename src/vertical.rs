use serde::Serialize;

use crate::types::{Cylinder, GapBounds};

/// Why a cylinder cannot carry the label around its development.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, thiserror::Error)]
pub enum VerticalRejection {
    #[error("development {development_mm:.1}mm below label height {height_mm}mm")]
    DevelopmentBelowLabel { development_mm: f64, height_mm: f64 },
    #[error("no valid repeat count")]
    NoValidRepeatCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VerticalFit {
    pub cylinder: Cylinder,
    pub development_mm: f64,
    pub repeats: u32,
    pub gap_mm: f64,
    pub deviation_from_target: f64,
    pub rejection: Option<VerticalRejection>,
}

impl VerticalFit {
    fn rejected(cylinder: Cylinder, development_mm: f64, rejection: VerticalRejection) -> Self {
        Self {
            cylinder,
            development_mm,
            repeats: 0,
            gap_mm: 0.0,
            deviation_from_target: f64::INFINITY,
            rejection: Some(rejection),
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.rejection.is_none()
    }

    pub fn diagnostic(&self) -> String {
        match &self.rejection {
            None => "OK".to_string(),
            Some(r) => r.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    repeats: u32,
    gap: f64,
    deviation: f64,
}

impl Candidate {
    /// More repeats, then closer to the target gap, then the smaller gap.
    fn beats(&self, other: &Candidate) -> bool {
        self.repeats > other.repeats
            || (self.repeats == other.repeats
                && (self.deviation < other.deviation
                    || (self.deviation == other.deviation && self.gap < other.gap)))
    }
}

/// Finds how many label repeats fit around one cylinder.
#[derive(Debug, Clone, Copy)]
pub struct VerticalFitEvaluator {
    cylinder_to_mm: f64,
    gap: GapBounds,
    max_repeats: u32,
}

impl VerticalFitEvaluator {
    pub fn new(cylinder_to_mm: f64, gap: GapBounds, max_repeats: u32) -> Self {
        Self {
            cylinder_to_mm,
            gap,
            max_repeats,
        }
    }

    pub fn evaluate(&self, cylinder: Cylinder, label_height_mm: f64) -> VerticalFit {
        let development = cylinder.development_mm(self.cylinder_to_mm);

        if development < label_height_mm {
            return VerticalFit::rejected(
                cylinder,
                development,
                VerticalRejection::DevelopmentBelowLabel {
                    development_mm: development,
                    height_mm: label_height_mm,
                },
            );
        }

        let mut best: Option<Candidate> = None;

        for repeats in 1..=self.max_repeats {
            let printed = repeats as f64 * label_height_mm;
            if development < printed {
                break;
            }

            let mut gap = (development - printed) / repeats as f64;
            if gap < 0.0 {
                continue;
            }

            // A single repeat always fits; report at least the minimum gap.
            if repeats == 1 {
                gap = gap.max(self.gap.min);
            } else if !self.gap.contains(gap) {
                continue;
            }

            let cand = Candidate {
                repeats,
                gap,
                deviation: (gap - self.gap.target).abs(),
            };
            if best.is_none_or(|b| cand.beats(&b)) {
                best = Some(cand);
            }
        }

        match best {
            Some(c) => VerticalFit {
                cylinder,
                development_mm: development,
                repeats: c.repeats,
                gap_mm: c.gap,
                deviation_from_target: c.deviation,
                rejection: None,
            },
            None => VerticalFit::rejected(
                cylinder,
                development,
                VerticalRejection::NoValidRepeatCount,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> VerticalFitEvaluator {
        VerticalFitEvaluator::new(
            3.175,
            GapBounds {
                target: 2.7,
                min: 2.5,
                max: 20.0,
            },
            8,
        )
    }

    fn assert_fit_consistent(fit: &VerticalFit, height: f64) {
        assert!(fit.is_feasible());
        if fit.repeats > 1 {
            assert!(fit.gap_mm >= 2.5 && fit.gap_mm <= 20.0, "gap {}", fit.gap_mm);
            let total = fit.repeats as f64 * (height + fit.gap_mm);
            assert!((total - fit.development_mm).abs() < 1e-9);
        } else {
            assert!(fit.gap_mm >= 2.5);
        }
    }

    #[test]
    fn test_picks_most_repeats_within_gap_band() {
        // 317.5mm development: 6 x 50mm leaves 17.5mm, 2.9167mm per gap
        let fit = evaluator().evaluate(Cylinder(100), 50.0);
        assert_fit_consistent(&fit, 50.0);
        assert_eq!(fit.repeats, 6);
        assert!((fit.gap_mm - 17.5 / 6.0).abs() < 1e-9);
        assert!((fit.deviation_from_target - (17.5 / 6.0 - 2.7)).abs() < 1e-9);
        assert_eq!(fit.diagnostic(), "OK");
    }

    #[test]
    fn test_gap_above_max_rejects_repeat() {
        // 97 x 3.175 = 307.975: 6 x 30mm leaves 21.33mm gaps (> 20) but the
        // search keeps climbing, 8 x 30mm leaves 8.497mm gaps
        let fit = evaluator().evaluate(Cylinder(97), 30.0);
        assert_fit_consistent(&fit, 30.0);
        assert_eq!(fit.repeats, 8);
        assert!((fit.gap_mm - 67.975 / 8.0).abs() < 1e-9);

        // 4 x 50mm leaves 26.99mm gaps, 5 x 50mm leaves 11.595mm
        let fit = evaluator().evaluate(Cylinder(97), 50.0);
        assert_fit_consistent(&fit, 50.0);
        assert_eq!(fit.repeats, 5);
        assert!((fit.gap_mm - 11.595).abs() < 1e-9);
    }

    #[test]
    fn test_single_repeat_gap_clamped_to_min() {
        // 190.5mm development with a 189mm label leaves 1.5mm
        let fit = evaluator().evaluate(Cylinder(60), 189.0);
        assert_fit_consistent(&fit, 189.0);
        assert_eq!(fit.repeats, 1);
        assert_eq!(fit.gap_mm, 2.5);
        assert!((fit.deviation_from_target - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_development_below_label() {
        let fit = evaluator().evaluate(Cylinder(60), 200.0);
        assert!(!fit.is_feasible());
        assert_eq!(fit.repeats, 0);
        assert!(matches!(
            fit.rejection,
            Some(VerticalRejection::DevelopmentBelowLabel { .. })
        ));
        assert_eq!(fit.diagnostic(), "development 190.5mm below label height 200mm");
    }

    #[test]
    fn test_no_valid_repeat_count() {
        let ev = VerticalFitEvaluator::new(
            3.175,
            GapBounds {
                target: 2.7,
                min: 2.5,
                max: 20.0,
            },
            0,
        );
        let fit = ev.evaluate(Cylinder(100), 50.0);
        assert_eq!(fit.rejection, Some(VerticalRejection::NoValidRepeatCount));
        assert_eq!(fit.diagnostic(), "no valid repeat count");
    }

    #[test]
    fn test_max_repeats_caps_search() {
        // 10mm labels on 317.5mm: 8 repeats leave 29.6875mm gaps (> 20),
        // 7 leaves 35.36, ... so only the single repeat survives
        let fit = evaluator().evaluate(Cylinder(100), 10.0);
        assert_fit_consistent(&fit, 10.0);
        assert_eq!(fit.repeats, 1);

        let wide = VerticalFitEvaluator::new(
            3.175,
            GapBounds {
                target: 2.7,
                min: 2.5,
                max: 20.0,
            },
            30,
        );
        let fit = wide.evaluate(Cylinder(100), 10.0);
        assert_fit_consistent(&fit, 10.0);
        // 24 x 10 = 240, (317.5 - 240) / 24 = 3.229; 25 leaves 2.7 exactly
        assert_eq!(fit.repeats, 25);
    }

    #[test]
    fn test_candidate_tie_break() {
        let a = Candidate {
            repeats: 3,
            gap: 3.0,
            deviation: 0.3,
        };
        let b = Candidate {
            repeats: 3,
            gap: 2.4,
            deviation: 0.3,
        };
        let c = Candidate {
            repeats: 4,
            gap: 10.0,
            deviation: 7.3,
        };
        assert!(b.beats(&a));
        assert!(!a.beats(&b));
        assert!(c.beats(&a));
        assert!(!a.beats(&c));
    }
}
