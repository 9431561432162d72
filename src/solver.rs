use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::horizontal::{HorizontalFit, HorizontalFitEvaluator};
use crate::material::MaterialUsageCalculator;
use crate::types::{
    Cylinder, Infeasibility, InfeasibilityReason, Label, OptimizationOutcome, Solution,
};
use crate::vertical::{VerticalFitEvaluator, VerticalRejection};

/// Picks the cylinder and layout that consume the least roll for a label.
#[derive(Debug, Clone)]
pub struct Solver {
    config: EngineConfig,
    vertical: VerticalFitEvaluator,
    horizontal: HorizontalFitEvaluator,
    material: MaterialUsageCalculator,
}

/// Accumulator threaded through one pass over the cylinder catalog.
#[derive(Debug, Default)]
struct Scan {
    best: Option<Solution>,
    first_vertical_rejection: Option<VerticalRejection>,
    first_horizontal_miss: Option<Cylinder>,
    first_count_overflow: Option<Cylinder>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Solver {
    pub fn new(config: EngineConfig) -> Self {
        let vertical = VerticalFitEvaluator::new(
            config.cylinder_to_mm,
            config.vertical_gap,
            config.max_vertical_repeats,
        );
        let horizontal =
            HorizontalFitEvaluator::new(config.horizontal_gap.target, config.flag_margin_mm);
        let material = MaterialUsageCalculator::new(config.trim_allowance_mm);
        Self {
            config,
            vertical,
            horizontal,
            material,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the search on the detected roll width, then on the standard roll
    /// if nothing fit and the two differ.
    ///
    /// A quantity of zero is searched as one label. A missing detected width
    /// means the standard roll. A non-finite or non-positive one fits nothing,
    /// so the search goes straight to the standard roll as a fallback.
    pub fn solve(
        &self,
        label: Label,
        quantity: u64,
        detected_roll_width_mm: Option<f64>,
    ) -> OptimizationOutcome {
        let quantity = quantity.max(1);
        let standard = self.config.standard_roll_width_mm;
        let preferred = detected_roll_width_mm.unwrap_or(standard);

        if preferred.is_finite() && preferred > 0.0 {
            let first = self.scan(&label, quantity, preferred, false);
            if let Some(best) = first.best {
                return OptimizationOutcome::Solved(best);
            }
            if preferred == standard {
                return OptimizationOutcome::Infeasible(self.infeasibility(
                    &label,
                    &first,
                    preferred,
                    |width_mm, roll_width_mm| InfeasibilityReason::LabelTooWide {
                        width_mm,
                        roll_width_mm,
                    },
                ));
            }
        }

        info!(
            label = %label,
            preferred_mm = preferred,
            standard_mm = standard,
            "no layout on preferred roll, retrying on standard roll"
        );
        let second = self.scan(&label, quantity, standard, true);
        if let Some(best) = second.best {
            return OptimizationOutcome::Solved(best);
        }
        OptimizationOutcome::Infeasible(self.infeasibility(
            &label,
            &second,
            standard,
            |width_mm, roll_width_mm| InfeasibilityReason::LabelTooWideForStandardRoll {
                width_mm,
                roll_width_mm,
            },
        ))
    }

    fn scan(&self, label: &Label, quantity: u64, roll_width_mm: f64, fallback: bool) -> Scan {
        // Horizontal fit does not depend on the cylinder.
        let across = self.horizontal.evaluate(roll_width_mm, label.width_mm());

        self.config
            .cylinders
            .iter()
            .fold(Scan::default(), |mut scan, &cylinder| {
                let vertical = self.vertical.evaluate(cylinder, label.height_mm());
                if let Some(rejection) = vertical.rejection {
                    debug!(%cylinder, reason = %rejection, "cylinder rejected");
                    scan.first_vertical_rejection.get_or_insert(rejection);
                    return scan;
                }

                if across.count_overflow {
                    debug!(%cylinder, roll_width_mm, "too many labels across roll");
                    scan.first_count_overflow.get_or_insert(cylinder);
                    return scan;
                }
                if !across.fits() {
                    debug!(%cylinder, roll_width_mm, "label does not fit across roll");
                    scan.first_horizontal_miss.get_or_insert(cylinder);
                    return scan;
                }
                let Some(labels_per_revolution) =
                    vertical.repeats.checked_mul(across.across_count)
                else {
                    debug!(%cylinder, "too many labels per revolution");
                    scan.first_count_overflow.get_or_insert(cylinder);
                    return scan;
                };

                let candidate = self.build_solution(
                    cylinder,
                    vertical.development_mm,
                    vertical.repeats,
                    vertical.gap_mm,
                    &across,
                    labels_per_revolution,
                    quantity,
                    roll_width_mm,
                    fallback,
                );
                debug!(
                    %cylinder,
                    repeats = candidate.repeats,
                    across = candidate.across_count,
                    linear_meters = candidate.linear_meters,
                    "candidate layout"
                );
                if scan
                    .best
                    .as_ref()
                    .is_none_or(|b| candidate.linear_meters < b.linear_meters)
                {
                    scan.best = Some(candidate);
                }
                scan
            })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_solution(
        &self,
        cylinder: Cylinder,
        development_mm: f64,
        repeats: u32,
        gap_vertical_mm: f64,
        across: &HorizontalFit,
        labels_per_revolution: u32,
        quantity: u64,
        roll_width_mm: f64,
        fallback: bool,
    ) -> Solution {
        let usage =
            self.material
                .calculate(quantity, labels_per_revolution, development_mm, roll_width_mm);
        Solution {
            cylinder,
            development_mm,
            repeats,
            across_count: across.across_count,
            gap_vertical_mm,
            gap_horizontal_mm: across.gap_mm,
            horizontal_gap_in_tolerance: across.gap_within(&self.config.horizontal_gap),
            roll_width_used_mm: roll_width_mm,
            labels_per_revolution,
            revolutions: usage.revolutions,
            trim_mm: usage.trim_mm,
            linear_meters: usage.linear_meters,
            area_m2: usage.area_m2,
            used_fallback_roll: fallback,
        }
    }

    /// A horizontal miss wins over vertical rejections: once any cylinder
    /// carries the label vertically, width is what failed.
    fn infeasibility(
        &self,
        label: &Label,
        scan: &Scan,
        roll_width_mm: f64,
        too_wide: impl FnOnce(f64, f64) -> InfeasibilityReason,
    ) -> Infeasibility {
        if let Some(cylinder) = scan.first_count_overflow {
            return Infeasibility::new(
                Some(cylinder),
                roll_width_mm,
                InfeasibilityReason::TooManyLabelsPerRevolution {
                    width_mm: label.width_mm(),
                    roll_width_mm,
                },
            );
        }
        if let Some(cylinder) = scan.first_horizontal_miss {
            return Infeasibility::new(
                Some(cylinder),
                roll_width_mm,
                too_wide(label.width_mm(), roll_width_mm),
            );
        }

        let cause = InfeasibilityReason::LabelTooTall {
            height_mm: label.height_mm(),
            min_code: self.config.smallest_cylinder().map_or(0, |z| z.code()),
            max_code: self.config.largest_cylinder().map_or(0, |z| z.code()),
            first_rejection: scan
                .first_vertical_rejection
                .unwrap_or(VerticalRejection::NoValidRepeatCount),
        };
        Infeasibility::new(None, roll_width_mm, cause)
    }
}

/// Optimizes one label with the default press configuration.
pub fn optimize(
    label: Label,
    quantity_to_produce: u64,
    detected_roll_width_mm: Option<f64>,
) -> OptimizationOutcome {
    Solver::default().solve(label, quantity_to_produce, detected_roll_width_mm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GapBounds;

    fn label(h: f64, w: f64) -> Label {
        Label::new(h, w).unwrap()
    }

    /// Checks every structural invariant of a solved layout:
    /// 1. Vertical gap within bounds when more than one repeat
    /// 2. The printed columns fit the roll
    /// 3. Labels per revolution and material agree with the layout
    fn assert_solution_valid(sol: &Solution, label: &Label, quantity: u64) {
        let config = EngineConfig::default();
        assert!(sol.repeats >= 1);
        assert!(sol.across_count >= 1);
        if sol.repeats > 1 {
            assert!(
                config.vertical_gap.contains(sol.gap_vertical_mm),
                "vertical gap {} out of bounds",
                sol.gap_vertical_mm
            );
        } else {
            assert!(sol.gap_vertical_mm >= config.vertical_gap.min);
        }
        assert!(
            sol.across_count as f64 * label.width_mm() <= sol.roll_width_used_mm,
            "{} columns of {}mm exceed roll {}mm",
            sol.across_count,
            label.width_mm(),
            sol.roll_width_used_mm
        );
        assert_eq!(sol.labels_per_revolution, sol.repeats * sol.across_count);
        let expected_revs = quantity.max(1) as f64 / sol.labels_per_revolution as f64;
        assert!((sol.revolutions - expected_revs).abs() < 1e-9);
        assert!(sol.linear_meters > 0.0);
        assert!(sol.area_m2 > 0.0);
    }

    #[test]
    fn test_standard_roll_scenario() {
        let l = label(50.0, 30.0);
        let outcome = optimize(l, 10_000, None);
        let sol = outcome.solution().expect("solved");
        assert_solution_valid(sol, &l, 10_000);
        assert_eq!(sol.cylinder, Cylinder(116));
        assert_eq!(sol.repeats, 7);
        assert_eq!(sol.across_count, 9);
        assert_eq!(sol.labels_per_revolution, 63);
        assert!((sol.gap_vertical_mm - 2.6142857142857).abs() < 1e-9);
        assert_eq!(sol.gap_horizontal_mm, Some(5.0));
        assert!(sol.horizontal_gap_in_tolerance);
        assert_eq!(sol.roll_width_used_mm, 330.0);
        assert!((sol.linear_meters - 58.579365079365).abs() < 1e-9);
        assert!((sol.area_m2 - 19.331190476190).abs() < 1e-9);
        assert!(!sol.used_fallback_roll);
    }

    #[test]
    fn test_idempotent() {
        let l = label(50.0, 30.0);
        let a = optimize(l, 10_000, None);
        let b = optimize(l, 10_000, None);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_choice_invariant_to_quantity() {
        let solver = Solver::default();
        for (h, w) in [(50.0, 30.0), (100.0, 80.0), (75.0, 100.0), (33.0, 47.5)] {
            let l = label(h, w);
            let one = solver.solve(l, 5_000, None);
            let two = solver.solve(l, 10_000, None);
            let (one, two) = (one.solution().unwrap(), two.solution().unwrap());
            assert_eq!(one.cylinder, two.cylinder);
            assert_eq!(one.repeats, two.repeats);
            assert_eq!(one.across_count, two.across_count);
            assert!((two.linear_meters - 2.0 * one.linear_meters).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_quantity_searched_as_one() {
        let l = label(50.0, 30.0);
        let zero = optimize(l, 0, None);
        let one = optimize(l, 1, None);
        assert_eq!(zero, one);
        let sol = zero.solution().unwrap();
        assert!(sol.linear_meters > 0.0);
        assert!((sol.revolutions - 1.0 / 63.0).abs() < 1e-12);
    }

    #[test]
    fn test_preferred_roll_used_when_it_fits() {
        let l = label(75.0, 100.0);
        let outcome = optimize(l, 3_000, Some(250.0));
        let sol = outcome.solution().unwrap();
        assert_solution_valid(sol, &l, 3_000);
        assert_eq!(sol.cylinder, Cylinder(74));
        assert_eq!(sol.repeats, 3);
        assert_eq!(sol.across_count, 2);
        assert_eq!(sol.gap_horizontal_mm, Some(30.0));
        assert_eq!(sol.roll_width_used_mm, 250.0);
        assert!((sol.linear_meters - 117.85).abs() < 1e-9);
        assert!(!sol.used_fallback_roll);
    }

    #[test]
    fn test_fallback_to_standard_roll() {
        // 290mm label on a 280mm roll only fits the 330mm standard
        let l = label(40.0, 290.0);
        let outcome = optimize(l, 1_000, Some(280.0));
        let sol = outcome.solution().unwrap();
        assert_solution_valid(sol, &l, 1_000);
        assert!(sol.used_fallback_roll);
        assert_eq!(sol.roll_width_used_mm, 330.0);
        assert_eq!(sol.cylinder, Cylinder(67));
        assert_eq!(sol.repeats, 5);
        assert_eq!(sol.across_count, 1);
        assert_eq!(sol.gap_horizontal_mm, None);
        assert!((sol.linear_meters - 42.695).abs() < 1e-9);
    }

    #[test]
    fn test_too_wide_for_standard_roll() {
        let outcome = optimize(label(50.0, 340.0), 100, None);
        let inf = outcome.infeasibility().expect("infeasible");
        assert_eq!(inf.attempted_cylinder, Some(Cylinder(168)));
        assert_eq!(inf.roll_width_used_mm, 330.0);
        assert_eq!(inf.gap_horizontal_mm, 0.0);
        assert!(matches!(inf.cause, InfeasibilityReason::LabelTooWide { .. }));
        assert_eq!(inf.reason, "label width 340mm does not fit roll 330mm");
    }

    #[test]
    fn test_too_wide_for_both_rolls() {
        let outcome = optimize(label(50.0, 340.0), 100, Some(280.0));
        let inf = outcome.infeasibility().unwrap();
        assert_eq!(inf.attempted_cylinder, Some(Cylinder(168)));
        assert_eq!(inf.roll_width_used_mm, 330.0);
        assert!(matches!(
            inf.cause,
            InfeasibilityReason::LabelTooWideForStandardRoll { .. }
        ));
        assert!(!inf.reason.is_empty());
    }

    #[test]
    fn test_forced_single_column_flags_gap() {
        // 328.5mm leaves no room for a full step on the 330mm roll
        let l = label(50.0, 328.5);
        let outcome = optimize(l, 500, None);
        let sol = outcome.solution().unwrap();
        assert_solution_valid(sol, &l, 500);
        assert_eq!(sol.across_count, 1);
        assert!((sol.gap_horizontal_mm.unwrap() - 1.5).abs() < 1e-9);
        assert!(!sol.horizontal_gap_in_tolerance);
    }

    #[test]
    fn test_too_tall_for_every_cylinder() {
        // Largest development is 168 x 3.175 = 533.4mm
        let outcome = optimize(label(600.0, 30.0), 10, None);
        let inf = outcome.infeasibility().unwrap();
        assert_eq!(inf.attempted_cylinder, None);
        assert_eq!(inf.roll_width_used_mm, 330.0);
        assert!(matches!(
            inf.cause,
            InfeasibilityReason::LabelTooTall {
                min_code: 60,
                max_code: 168,
                first_rejection: VerticalRejection::DevelopmentBelowLabel { .. },
                ..
            }
        ));
        assert!(inf.reason.starts_with("label height 600mm"));
        assert!(inf.reason.contains("development 533.4mm"));
    }

    #[test]
    fn test_too_tall_reports_last_roll_attempted() {
        let outcome = optimize(label(600.0, 30.0), 10, Some(250.0));
        let inf = outcome.infeasibility().unwrap();
        assert_eq!(inf.roll_width_used_mm, 330.0);
        assert!(matches!(inf.cause, InfeasibilityReason::LabelTooTall { .. }));
    }

    #[test]
    fn test_unusable_detected_width_falls_back_to_standard() {
        let l = label(50.0, 30.0);
        let standard = optimize(l, 100, None);
        let standard = standard.solution().unwrap();
        assert_eq!(optimize(l, 100, Some(330.0)).solution(), Some(standard));

        for detected in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let outcome = optimize(l, 100, Some(detected));
            let sol = outcome.solution().unwrap();
            assert!(sol.used_fallback_roll, "no fallback flag for {detected}");
            assert_eq!(sol.roll_width_used_mm, 330.0);
            assert_eq!(sol.cylinder, standard.cylinder);
            assert_eq!(sol.linear_meters, standard.linear_meters);
        }
    }

    #[test]
    fn test_unusable_detected_width_too_wide_for_standard() {
        let outcome = optimize(label(50.0, 340.0), 100, Some(0.0));
        let inf = outcome.infeasibility().unwrap();
        assert_eq!(inf.roll_width_used_mm, 330.0);
        assert!(matches!(
            inf.cause,
            InfeasibilityReason::LabelTooWideForStandardRoll { .. }
        ));
    }

    #[test]
    fn test_uncountable_labels_are_infeasible() {
        let config = EngineConfig {
            horizontal_gap: GapBounds {
                target: 0.0,
                min: 0.0,
                max: 20.0,
            },
            ..EngineConfig::default()
        };
        let solver = Solver::new(config);
        let outcome = solver.solve(label(50.0, 1e-9), 100, None);
        let inf = outcome.infeasibility().expect("infeasible");
        assert_eq!(inf.attempted_cylinder, Some(Cylinder(168)));
        assert_eq!(inf.roll_width_used_mm, 330.0);
        assert!(matches!(
            inf.cause,
            InfeasibilityReason::TooManyLabelsPerRevolution { .. }
        ));
    }

    #[test]
    fn test_labels_per_revolution_overflow_skips_cylinder() {
        // ~1e9 columns fit a u32 but 5+ repeats around do not; Z60's
        // 3 repeats still do
        let config = EngineConfig {
            horizontal_gap: GapBounds {
                target: 0.0,
                min: 0.0,
                max: 20.0,
            },
            ..EngineConfig::default()
        };
        let solver = Solver::new(config);
        let l = label(50.0, 3.1e-7);
        let outcome = solver.solve(l, 100, None);
        let sol = outcome.solution().expect("solved");
        assert!(sol.across_count > 900_000_000);
        assert!(sol.repeats <= 4);
        assert_eq!(
            sol.labels_per_revolution as u64,
            sol.repeats as u64 * sol.across_count as u64
        );
    }

    #[test]
    fn test_exact_tie_keeps_first_cylinder() {
        // 47mm labels: Z200 carries 4 and Z100 carries 2, both 50mm per repeat
        let config = EngineConfig {
            cylinder_to_mm: 1.0,
            trim_allowance_mm: 0.0,
            cylinders: vec![Cylinder(100), Cylinder(200)],
            ..EngineConfig::default()
        }
        .normalized()
        .unwrap();
        let solver = Solver::new(config);
        let sol = solver.solve(label(47.0, 30.0), 1_000, None);
        let sol = sol.solution().unwrap();
        assert_eq!(sol.cylinder, Cylinder(200));
        assert_eq!(sol.repeats, 4);
    }

    #[test]
    fn test_invariants_across_label_sizes() {
        let solver = Solver::default();
        let mut solved = 0;
        for h in (10..=520).step_by(17) {
            for w in (8..=330).step_by(23) {
                let l = label(h as f64, w as f64);
                match solver.solve(l, 2_500, None) {
                    OptimizationOutcome::Solved(sol) => {
                        assert_solution_valid(&sol, &l, 2_500);
                        solved += 1;
                    }
                    OptimizationOutcome::Infeasible(inf) => {
                        assert!(!inf.reason.is_empty(), "empty reason for {l}");
                    }
                }
            }
        }
        assert!(solved > 0);
    }
}
