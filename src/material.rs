use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MaterialUsage {
    pub revolutions: f64,
    pub trim_mm: f64,
    pub linear_meters: f64,
    pub area_m2: f64,
}

/// Converts a layout and a production quantity into roll consumption.
#[derive(Debug, Clone, Copy)]
pub struct MaterialUsageCalculator {
    trim_allowance_mm: f64,
}

impl MaterialUsageCalculator {
    pub fn new(trim_allowance_mm: f64) -> Self {
        Self { trim_allowance_mm }
    }

    pub fn calculate(
        &self,
        quantity: u64,
        labels_per_revolution: u32,
        development_mm: f64,
        roll_width_mm: f64,
    ) -> MaterialUsage {
        if labels_per_revolution == 0 || development_mm <= 0.0 || roll_width_mm <= 0.0 {
            return MaterialUsage::default();
        }

        let revolutions = quantity as f64 / labels_per_revolution as f64;
        let trim_mm = revolutions * self.trim_allowance_mm;
        let linear_mm = revolutions * development_mm + trim_mm;
        let linear_meters = linear_mm / 1000.0;

        MaterialUsage {
            revolutions,
            trim_mm,
            linear_meters,
            area_m2: linear_meters * (roll_width_mm / 1000.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_and_area() {
        let calc = MaterialUsageCalculator::new(0.75);
        // 10_000 labels at 50 per revolution = 200 revolutions
        let usage = calc.calculate(10_000, 50, 317.5, 330.0);
        assert!((usage.revolutions - 200.0).abs() < 1e-9);
        assert!((usage.trim_mm - 150.0).abs() < 1e-9);
        // 200 x 317.5 + 150 = 63_650mm
        assert!((usage.linear_meters - 63.65).abs() < 1e-9);
        assert!((usage.area_m2 - 63.65 * 0.33).abs() < 1e-9);
    }

    #[test]
    fn test_partial_revolution() {
        let calc = MaterialUsageCalculator::new(0.75);
        let usage = calc.calculate(1, 4, 400.0, 100.0);
        assert!((usage.revolutions - 0.25).abs() < 1e-12);
        assert!((usage.linear_meters - (100.0 + 0.1875) / 1000.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_guards() {
        let calc = MaterialUsageCalculator::new(0.75);
        assert_eq!(calc.calculate(100, 0, 317.5, 330.0), MaterialUsage::default());
        assert_eq!(calc.calculate(100, 6, 0.0, 330.0), MaterialUsage::default());
        assert_eq!(calc.calculate(100, 6, 317.5, 0.0), MaterialUsage::default());
    }

    #[test]
    fn test_scales_linearly_with_quantity() {
        let calc = MaterialUsageCalculator::new(0.75);
        let one = calc.calculate(5_000, 27, 333.375, 330.0);
        let two = calc.calculate(10_000, 27, 333.375, 330.0);
        assert!((two.linear_meters - 2.0 * one.linear_meters).abs() < 1e-9);
        assert!((two.area_m2 - 2.0 * one.area_m2).abs() < 1e-9);
    }
}
