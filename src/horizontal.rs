use serde::Serialize;

use crate::types::GapBounds;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HorizontalFit {
    pub across_count: u32,
    /// Internal gap between columns; the one-sided leftover when a single
    /// label is forced onto the roll; `None` for a regular single column.
    pub gap_mm: Option<f64>,
    pub utilization_pct: f64,
    pub usable_width_mm: f64,
    pub flag_margin_applied: bool,
    /// The column count would not fit a `u32`.
    pub count_overflow: bool,
}

impl HorizontalFit {
    fn empty(usable_width_mm: f64) -> Self {
        Self {
            across_count: 0,
            gap_mm: None,
            utilization_pct: 0.0,
            usable_width_mm,
            flag_margin_applied: false,
            count_overflow: false,
        }
    }

    fn overflow(usable_width_mm: f64) -> Self {
        Self {
            count_overflow: true,
            ..Self::empty(usable_width_mm)
        }
    }

    pub fn fits(&self) -> bool {
        self.across_count > 0
    }

    /// Whether the realized gap sits inside `bounds`. A missing gap passes.
    pub fn gap_within(&self, bounds: &GapBounds) -> bool {
        self.gap_mm.is_none_or(|g| bounds.contains(g))
    }
}

/// Counts how many labels fit side by side across a roll.
#[derive(Debug, Clone, Copy)]
pub struct HorizontalFitEvaluator {
    gap_mm: f64,
    flag_margin_mm: f64,
}

impl HorizontalFitEvaluator {
    pub fn new(gap_mm: f64, flag_margin_mm: f64) -> Self {
        Self {
            gap_mm,
            flag_margin_mm,
        }
    }

    pub fn evaluate(&self, roll_width_mm: f64, label_width_mm: f64) -> HorizontalFit {
        if roll_width_mm <= 0.0 {
            return HorizontalFit::empty(0.0);
        }
        let step = label_width_mm + self.gap_mm;
        if step <= 0.0 {
            return HorizontalFit::empty(0.0);
        }

        let mut usable = (roll_width_mm - self.flag_margin_mm).max(0.0);
        let Some(mut across) = columns(usable, step) else {
            return HorizontalFit::overflow(usable);
        };
        let mut flag_margin_applied = true;

        // Nothing fits inside the margin: use the whole roll.
        if across == 0 {
            usable = roll_width_mm;
            across = match columns(usable, step) {
                Some(n) => n,
                None => return HorizontalFit::overflow(usable),
            };
            flag_margin_applied = false;
        }

        let gap_mm = if across == 0 && usable >= label_width_mm {
            // A single label without room for a full step. Its leftover is
            // reported as one gap on one side.
            across = 1;
            Some((usable - label_width_mm).max(0.0))
        } else if across > 1 {
            let leftover = (usable - across as f64 * label_width_mm).max(0.0);
            Some(leftover / (across - 1) as f64)
        } else {
            None
        };

        if across == 0 {
            return HorizontalFit::empty(usable);
        }

        let utilization_pct = if usable > 0.0 {
            across as f64 * label_width_mm / usable * 100.0
        } else {
            0.0
        };

        HorizontalFit {
            across_count: across,
            gap_mm,
            utilization_pct,
            usable_width_mm: usable,
            flag_margin_applied,
            count_overflow: false,
        }
    }
}

/// `None` when the count is not representable.
fn columns(usable_mm: f64, step_mm: f64) -> Option<u32> {
    let n = (usable_mm / step_mm).floor().max(0.0);
    (n <= u32::MAX as f64).then_some(n as u32)
}
