//! Least-squares trend lines and correlation.
//!
//! These helpers only feed chart overlays (the red "trend line" through a
//! scatter plot and the correlation badge next to it). They are never used
//! to estimate a treatment effect.

use serde::Serialize;

use crate::descriptive::mean;

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Smallest x used for the fit.
    pub x_min: f64,
    /// Largest x used for the fit.
    pub x_max: f64,
}

impl LinearFit {
    /// Fits a line through paired observations.
    ///
    /// # Returns
    ///
    /// `None` if the slices differ in length, contain fewer than two points,
    /// or all x values are identical.
    ///
    /// # Examples
    ///
    /// ```
    /// # use causal_stats::regression::LinearFit;
    /// let fit = LinearFit::new(&[1.0, 2.0, 3.0], &[3.0, 5.0, 7.0]).unwrap();
    /// assert!((fit.slope - 2.0).abs() < 1e-12);
    /// assert!((fit.intercept - 1.0).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn new(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return None;
        }
        let x_mean = mean(xs.iter().copied())?;
        let y_mean = mean(ys.iter().copied())?;
        let (sxy, sxx) = xs
            .iter()
            .zip(ys)
            .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
                let dx = x - x_mean;
                (sxy + dx * (y - y_mean), sxx + dx * dx)
            });
        if sxx == 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        let x_min = xs.iter().copied().min_by(f64::total_cmp)?;
        let x_max = xs.iter().copied().max_by(f64::total_cmp)?;
        Some(Self {
            slope,
            intercept: y_mean - slope * x_mean,
            x_min,
            x_max,
        })
    }

    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Returns `points` evenly spaced points on the line between the observed
    /// x extremes (both ends included).
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn trend_line(&self, points: usize) -> Vec<(f64, f64)> {
        match points {
            0 => vec![],
            1 => vec![(self.x_min, self.predict(self.x_min))],
            _ => {
                let step = (self.x_max - self.x_min) / (points - 1) as f64;
                (0..points)
                    .map(|i| {
                        let x = self.x_min + step * i as f64;
                        (x, self.predict(x))
                    })
                    .collect()
            }
        }
    }
}

/// Pearson correlation coefficient.
///
/// Returns `None` if the slices differ in length, have fewer than two points,
/// or either variable is constant.
///
/// ```
/// # use causal_stats::regression::correlation;
/// let r = correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
/// assert!((r - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let x_mean = mean(xs.iter().copied())?;
    let y_mean = mean(ys.iter().copied())?;
    let (sxy, sxx, syy) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (x, y)| {
            let dx = x - x_mean;
            let dy = y - y_mean;
            (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
        });
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_rejects_degenerate_input() {
        assert!(LinearFit::new(&[], &[]).is_none());
        assert!(LinearFit::new(&[1.0], &[1.0]).is_none());
        assert!(LinearFit::new(&[1.0, 2.0], &[1.0]).is_none());
        assert!(LinearFit::new(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_fit_noisy_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 2.0, 2.0, 3.0];
        let fit = LinearFit::new(&xs, &ys).unwrap();
        assert!((fit.slope - 0.6).abs() < 1e-12);
        assert!((fit.intercept - 1.1).abs() < 1e-12);
        assert_eq!(fit.x_min, 0.0);
        assert_eq!(fit.x_max, 3.0);
    }

    #[test]
    fn test_trend_line_spans_observed_range() {
        let fit = LinearFit::new(&[2.0, 4.0, 6.0], &[1.0, 2.0, 3.0]).unwrap();
        let line = fit.trend_line(5);
        assert_eq!(line.len(), 5);
        assert_eq!(line[0].0, 2.0);
        assert!((line[4].0 - 6.0).abs() < 1e-12);
        assert!((line[2].1 - 2.0).abs() < 1e-12);
        assert!(fit.trend_line(0).is_empty());
        assert_eq!(fit.trend_line(1).len(), 1);
    }

    #[test]
    fn test_correlation_sign() {
        let r = correlation(&[1.0, 2.0, 3.0, 4.0], &[8.0, 6.0, 4.0, 2.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert!(correlation(&[1.0, 2.0], &[5.0, 5.0]).is_none());
    }
}
