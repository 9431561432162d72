//! Per-item orchestration around the solver: resolves dimensions and roll
//! width from the item's descriptors, optimizes every item independently and
//! flattens each outcome into one report row.

use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::descriptor::{detect_roll_width_mm, parse_label_dimensions, resolve_roll_width};
use crate::solver::Solver;
use crate::types::{Label, OptimizationOutcome};

/// Accepts any JSON number; fractions are truncated and negatives read as zero.
pub fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = f64::deserialize(deserializer)?;
    if v.is_finite() && v > 0.0 {
        Ok(v.trunc() as u64)
    } else {
        Ok(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ItemRequest {
    pub code: String,
    /// Article name carrying the label size, e.g. `ETIQ 55x66`.
    #[serde(default)]
    pub article_name: Option<String>,
    /// Material name carrying the roll width, e.g. `LAMINADO PETG 280 MM`.
    #[serde(default)]
    pub component_name: Option<String>,
    #[serde(default)]
    pub label_height_mm: Option<f64>,
    #[serde(default)]
    pub label_width_mm: Option<f64>,
    #[serde(default)]
    pub roll_width_mm: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub quantity: u64,
}

impl ItemRequest {
    /// Explicit dimensions win over the article name.
    pub fn dimensions(&self) -> Option<(f64, f64)> {
        match (self.label_height_mm, self.label_width_mm) {
            (Some(h), Some(w)) => Some((h, w)),
            _ => self.article_name.as_deref().and_then(parse_label_dimensions),
        }
    }

    /// Explicit roll width wins over the component name.
    pub fn detected_roll_width_mm(&self) -> Option<f64> {
        self.roll_width_mm
            .or_else(|| self.component_name.as_deref().and_then(detect_roll_width_mm))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Solved,
    SolvedOnStandardRoll,
    Infeasible,
    MissingDimensions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    pub code: String,
    pub status: ItemStatus,
    pub label_height_mm: Option<f64>,
    pub label_width_mm: Option<f64>,
    pub roll_width_mm: f64,
    pub cylinder: Option<u32>,
    pub development_mm: Option<f64>,
    pub repeats: Option<u32>,
    pub gap_vertical_mm: Option<f64>,
    pub across_count: Option<u32>,
    pub gap_horizontal_mm: Option<f64>,
    pub horizontal_gap_in_tolerance: Option<bool>,
    pub labels_per_revolution: Option<u32>,
    pub revolutions: Option<f64>,
    pub trim_mm: Option<f64>,
    pub trim_m: Option<f64>,
    pub linear_meters: Option<f64>,
    pub area_m2: Option<f64>,
    pub reason: Option<String>,
}

impl ItemReport {
    fn blank(code: &str, status: ItemStatus, roll_width_mm: f64) -> Self {
        Self {
            code: code.to_string(),
            status,
            label_height_mm: None,
            label_width_mm: None,
            roll_width_mm,
            cylinder: None,
            development_mm: None,
            repeats: None,
            gap_vertical_mm: None,
            across_count: None,
            gap_horizontal_mm: None,
            horizontal_gap_in_tolerance: None,
            labels_per_revolution: None,
            revolutions: None,
            trim_mm: None,
            trim_m: None,
            linear_meters: None,
            area_m2: None,
            reason: None,
        }
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (v * factor).round() / factor
}

pub fn report_item(solver: &Solver, item: &ItemRequest) -> ItemReport {
    let config = solver.config();
    let detected = item.detected_roll_width_mm();

    let label = match item.dimensions().map(|(h, w)| Label::new(h, w)) {
        Some(Ok(label)) => label,
        missing => {
            let roll_width_mm = item.roll_width_mm.unwrap_or_else(|| {
                resolve_roll_width(
                    item.component_name.as_deref(),
                    config.standard_roll_width_mm,
                )
            });
            let mut report =
                ItemReport::blank(&item.code, ItemStatus::MissingDimensions, roll_width_mm);
            report.reason = Some(match missing {
                Some(Err(e)) => e.to_string(),
                _ => "no label dimensions".to_string(),
            });
            return report;
        }
    };

    let outcome = solver.solve(label, item.quantity, detected);
    let mut report = match &outcome {
        OptimizationOutcome::Solved(sol) => {
            let status = if sol.used_fallback_roll {
                ItemStatus::SolvedOnStandardRoll
            } else {
                ItemStatus::Solved
            };
            let mut report = ItemReport::blank(&item.code, status, sol.roll_width_used_mm);

            // A lone column with no step gap is shown centred on the roll.
            let gap_h = match sol.gap_horizontal_mm {
                Some(g) => g,
                None if sol.across_count == 1 && sol.roll_width_used_mm > label.width_mm() => {
                    (sol.roll_width_used_mm - label.width_mm()) / 2.0
                }
                None => 0.0,
            };

            report.cylinder = Some(sol.cylinder.code());
            report.development_mm = Some(round_to(sol.development_mm, 2));
            report.repeats = Some(sol.repeats);
            report.gap_vertical_mm = Some(round_to(sol.gap_vertical_mm, 2));
            report.across_count = Some(sol.across_count);
            report.gap_horizontal_mm = Some(round_to(gap_h, 2));
            report.horizontal_gap_in_tolerance = Some(sol.horizontal_gap_in_tolerance);
            report.labels_per_revolution = Some(sol.labels_per_revolution);
            report.revolutions = Some(round_to(sol.revolutions, 2));
            report.trim_mm = Some(round_to(sol.trim_mm, 2));
            report.trim_m = Some(round_to(sol.trim_mm / 1000.0, 4));
            report.linear_meters = Some(round_to(sol.linear_meters, 2));
            report.area_m2 = Some(round_to(sol.area_m2, 2));
            report
        }
        OptimizationOutcome::Infeasible(inf) => {
            warn!(code = %item.code, reason = %inf.reason, "item has no feasible layout");
            let mut report =
                ItemReport::blank(&item.code, ItemStatus::Infeasible, inf.roll_width_used_mm);
            report.cylinder = inf.attempted_cylinder.map(|z| z.code());
            report.gap_horizontal_mm = Some(inf.gap_horizontal_mm);
            report.reason = Some(inf.reason.clone());
            report
        }
    };
    report.label_height_mm = Some(label.height_mm());
    report.label_width_mm = Some(label.width_mm());
    report
}

/// Optimizes every item in parallel; reports keep the input order.
pub fn run_batch(solver: &Solver, items: &[ItemRequest]) -> Vec<ItemReport> {
    let reports: Vec<ItemReport> = items
        .par_iter()
        .map(|item| report_item(solver, item))
        .collect();
    let summary = BatchSummary::from_reports(&reports);
    info!(
        total = summary.total,
        solved = summary.solved,
        on_standard_roll = summary.on_standard_roll,
        infeasible = summary.infeasible,
        missing_dimensions = summary.missing_dimensions,
        "batch optimized"
    );
    reports
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub solved: usize,
    pub on_standard_roll: usize,
    pub infeasible: usize,
    pub missing_dimensions: usize,
    pub linear_meters: f64,
    pub area_m2: f64,
}

impl BatchSummary {
    pub fn from_reports(reports: &[ItemReport]) -> Self {
        reports.iter().fold(
            BatchSummary {
                total: reports.len(),
                ..Default::default()
            },
            |mut s, r| {
                match r.status {
                    ItemStatus::Solved => s.solved += 1,
                    ItemStatus::SolvedOnStandardRoll => {
                        s.solved += 1;
                        s.on_standard_roll += 1;
                    }
                    ItemStatus::Infeasible => s.infeasible += 1,
                    ItemStatus::MissingDimensions => s.missing_dimensions += 1,
                }
                s.linear_meters += r.linear_meters.unwrap_or(0.0);
                s.area_m2 += r.area_m2.unwrap_or(0.0);
                s
            },
        )
    }
}
