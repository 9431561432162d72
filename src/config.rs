use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Cylinder, GapBounds};

/// Cylinder codes available on the press.
pub const DEFAULT_CYLINDERS: [u32; 22] = [
    60, 67, 70, 74, 77, 80, 84, 88, 91, 97, 99, 102, 105, 107, 108, 111, 116, 117, 122, 127, 129,
    168,
];

/// Named constants driving the layout search.
///
/// Every field has a default, so a JSON document only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// mm of development per cylinder code unit.
    pub cylinder_to_mm: f64,
    pub standard_roll_width_mm: f64,
    /// Non-printable margin subtracted from the roll width.
    pub flag_margin_mm: f64,
    pub vertical_gap: GapBounds,
    /// Only `target` drives the search; `min`/`max` flag reported gaps.
    pub horizontal_gap: GapBounds,
    pub max_vertical_repeats: u32,
    /// Extra material per cylinder revolution.
    pub trim_allowance_mm: f64,
    pub cylinders: Vec<Cylinder>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut cylinders: Vec<Cylinder> = DEFAULT_CYLINDERS.iter().map(|&z| Cylinder(z)).collect();
        cylinders.sort_by(|a, b| b.cmp(a));
        Self {
            cylinder_to_mm: 3.175,
            standard_roll_width_mm: 330.0,
            flag_margin_mm: 20.0,
            vertical_gap: GapBounds {
                target: 2.7,
                min: 2.5,
                max: 20.0,
            },
            horizontal_gap: GapBounds {
                target: 2.7,
                min: 2.3,
                max: 20.0,
            },
            max_vertical_repeats: 8,
            trim_allowance_mm: 0.75,
            cylinders,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(s)?;
        config.normalized()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Sorts the catalog descending, drops duplicates and validates.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.cylinders.sort_by(|a, b| b.cmp(a));
        self.cylinders.dedup();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cylinders.is_empty() {
            return Err(ConfigError::Invalid("cylinder catalog is empty".to_string()));
        }
        if self.cylinders.iter().any(|z| z.code() == 0) {
            return Err(ConfigError::Invalid(
                "cylinder codes must be non-zero".to_string(),
            ));
        }
        if !(self.cylinder_to_mm > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cylinder_to_mm must be positive, got {}",
                self.cylinder_to_mm
            )));
        }
        if !(self.standard_roll_width_mm > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "standard_roll_width_mm must be positive, got {}",
                self.standard_roll_width_mm
            )));
        }
        if !(self.flag_margin_mm >= 0.0) || !(self.trim_allowance_mm >= 0.0) {
            return Err(ConfigError::Invalid(
                "flag_margin_mm and trim_allowance_mm must be non-negative".to_string(),
            ));
        }
        if self.max_vertical_repeats == 0 {
            return Err(ConfigError::Invalid(
                "max_vertical_repeats must be at least 1".to_string(),
            ));
        }
        check_gap_bounds("vertical_gap", &self.vertical_gap)?;
        check_gap_bounds("horizontal_gap", &self.horizontal_gap)?;
        Ok(())
    }

    pub fn smallest_cylinder(&self) -> Option<Cylinder> {
        self.cylinders.iter().copied().min()
    }

    pub fn largest_cylinder(&self) -> Option<Cylinder> {
        self.cylinders.iter().copied().max()
    }
}

fn check_gap_bounds(name: &str, bounds: &GapBounds) -> Result<(), ConfigError> {
    if !(bounds.min >= 0.0) || !(bounds.target >= 0.0) {
        return Err(ConfigError::Invalid(format!(
            "{name}: gaps must be non-negative"
        )));
    }
    if bounds.min > bounds.max {
        return Err(ConfigError::Invalid(format!(
            "{name}: min {} exceeds max {}",
            bounds.min, bounds.max
        )));
    }
    Ok(())
}
