use serde::{Deserialize, Serialize};

use crate::error::LabelError;
use crate::vertical::VerticalRejection;

/// Printed label footprint. Height runs around the cylinder, width across the roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Label {
    height_mm: f64,
    width_mm: f64,
}

impl Label {
    pub fn new(height_mm: f64, width_mm: f64) -> Result<Self, LabelError> {
        if !height_mm.is_finite() || !width_mm.is_finite() {
            return Err(LabelError::NotFinite {
                height_mm,
                width_mm,
            });
        }
        if height_mm <= 0.0 {
            return Err(LabelError::NonPositiveHeight(height_mm));
        }
        if width_mm <= 0.0 {
            return Err(LabelError::NonPositiveWidth(width_mm));
        }
        Ok(Self {
            height_mm,
            width_mm,
        })
    }

    pub fn height_mm(&self) -> f64 {
        self.height_mm
    }

    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            height_mm: f64,
            width_mm: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        Label::new(raw.height_mm, raw.width_mm).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height_mm, self.width_mm)
    }
}

/// Printing cylinder code (Z). Its development is `code × cylinder_to_mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cylinder(pub u32);

impl Cylinder {
    pub fn code(&self) -> u32 {
        self.0
    }

    pub fn development_mm(&self, cylinder_to_mm: f64) -> f64 {
        self.0 as f64 * cylinder_to_mm
    }
}

impl std::fmt::Display for Cylinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Z{}", self.0)
    }
}

/// Target gap and the accepted band around it, in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapBounds {
    pub target: f64,
    pub min: f64,
    pub max: f64,
}

impl GapBounds {
    pub fn contains(&self, gap: f64) -> bool {
        gap >= self.min && gap <= self.max
    }
}

/// Lowest-material configuration found for one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub cylinder: Cylinder,
    pub development_mm: f64,
    pub repeats: u32,
    pub across_count: u32,
    pub gap_vertical_mm: f64,
    /// `None` when a single label fits across through the regular step.
    pub gap_horizontal_mm: Option<f64>,
    pub horizontal_gap_in_tolerance: bool,
    pub roll_width_used_mm: f64,
    pub labels_per_revolution: u32,
    pub revolutions: f64,
    pub trim_mm: f64,
    pub linear_meters: f64,
    pub area_m2: f64,
    pub used_fallback_roll: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfeasibilityReason {
    #[error(
        "label height {height_mm}mm does not fit any available cylinder ({min_code}-{max_code}): {first_rejection}"
    )]
    LabelTooTall {
        height_mm: f64,
        min_code: u32,
        max_code: u32,
        first_rejection: VerticalRejection,
    },
    #[error("label width {width_mm}mm does not fit roll {roll_width_mm}mm")]
    LabelTooWide { width_mm: f64, roll_width_mm: f64 },
    #[error("label width {width_mm}mm does not fit even the standard roll {roll_width_mm}mm")]
    LabelTooWideForStandardRoll { width_mm: f64, roll_width_mm: f64 },
    #[error(
        "label width {width_mm}mm gives more labels per revolution on roll {roll_width_mm}mm than can be counted"
    )]
    TooManyLabelsPerRevolution { width_mm: f64, roll_width_mm: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Infeasibility {
    /// First vertically feasible cylinder whose horizontal fit or label
    /// count failed.
    pub attempted_cylinder: Option<Cylinder>,
    pub roll_width_used_mm: f64,
    /// Zero sentinel marking the layout as impossible.
    pub gap_horizontal_mm: f64,
    pub cause: InfeasibilityReason,
    pub reason: String,
}

impl Infeasibility {
    pub fn new(
        attempted_cylinder: Option<Cylinder>,
        roll_width_used_mm: f64,
        cause: InfeasibilityReason,
    ) -> Self {
        Self {
            attempted_cylinder,
            roll_width_used_mm,
            gap_horizontal_mm: 0.0,
            reason: cause.to_string(),
            cause,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptimizationOutcome {
    Solved(Solution),
    Infeasible(Infeasibility),
}

impl OptimizationOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            OptimizationOutcome::Solved(s) => Some(s),
            OptimizationOutcome::Infeasible(_) => None,
        }
    }

    pub fn infeasibility(&self) -> Option<&Infeasibility> {
        match self {
            OptimizationOutcome::Solved(_) => None,
            OptimizationOutcome::Infeasible(i) => Some(i),
        }
    }
}
