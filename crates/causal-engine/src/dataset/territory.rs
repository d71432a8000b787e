//! Customer retention in two territories with a staggered feature rollout.
//!
//! Territory A is forced to ship the feature at the end of year 2; territory
//! B ships two years later and serves as the control. Both territories share
//! an upward trend of five points a year.

use serde::Serialize;

pub const YEARS: [u32; 4] = [1, 2, 3, 4];

const TREATED_TREND: [f64; 4] = [65.0, 70.0, 75.0, 80.0];
const TREATED_FEATURE_EFFECT: [f64; 4] = [0.0, 0.0, 5.0, 5.0];
const CONTROL_TREND: [f64; 4] = [63.0, 68.0, 73.0, 78.0];

/// Last year before the feature reached territory A.
pub const BASELINE_YEAR: u32 = 2;
/// Year the effect is read at.
pub const FINAL_YEAR: u32 = 4;

/// Retention rates (percent) per year for both territories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerritorySeries {
    pub years: Vec<u32>,
    /// Territory A, which got the feature early.
    pub treated: Vec<f64>,
    /// Territory B.
    pub control: Vec<f64>,
}

impl TerritorySeries {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            years: YEARS.to_vec(),
            treated: TREATED_TREND
                .iter()
                .zip(TREATED_FEATURE_EFFECT)
                .map(|(trend, effect)| trend + effect)
                .collect(),
            control: CONTROL_TREND.to_vec(),
        }
    }

    fn index(&self, year: u32) -> Option<usize> {
        self.years.iter().position(|y| *y == year)
    }

    /// Change in territory A between two years.
    #[must_use]
    pub fn treated_change(&self, from: u32, to: u32) -> Option<f64> {
        Some(self.treated[self.index(to)?] - self.treated[self.index(from)?])
    }

    /// Change in territory B between two years.
    #[must_use]
    pub fn control_change(&self, from: u32, to: u32) -> Option<f64> {
        Some(self.control[self.index(to)?] - self.control[self.index(from)?])
    }

    /// Treated change minus control change between two years.
    #[must_use]
    pub fn difference_in_differences(&self, from: u32, to: u32) -> Option<f64> {
        let (from, to) = (self.index(from)?, self.index(to)?);
        Some(causal_stats::effect::difference_in_differences(
            self.treated[from],
            self.treated[to],
            self.control[from],
            self.control[to],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_values() {
        let series = TerritorySeries::generate();
        assert_eq!(series.treated, [65.0, 70.0, 80.0, 85.0]);
        assert_eq!(series.control, [63.0, 68.0, 73.0, 78.0]);
        assert_eq!(series, TerritorySeries::generate());
    }

    #[test]
    fn test_estimates_between_baseline_and_final_year() {
        let series = TerritorySeries::generate();
        assert_eq!(series.treated_change(BASELINE_YEAR, FINAL_YEAR), Some(15.0));
        assert_eq!(series.control_change(BASELINE_YEAR, FINAL_YEAR), Some(10.0));
        assert_eq!(
            series.difference_in_differences(BASELINE_YEAR, FINAL_YEAR),
            Some(5.0)
        );
        // parallel before the rollout
        assert_eq!(series.difference_in_differences(1, 2), Some(0.0));
        assert_eq!(series.treated_change(0, 4), None);
    }
}
