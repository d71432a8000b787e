//! Threshold-based coarsening of continuous attributes.
//!
//! Coarsened exact matching compares units only after their continuous
//! covariates have been mapped onto a handful of ordered categories. A
//! coarsening is defined by `k` strictly ascending thresholds and `k + 1`
//! labels; each threshold opens the next bucket, so a value equal to a
//! threshold belongs to the upper bucket:
//!
//! ```text
//! thresholds:      30          50
//! buckets:   Young | Middle-aged | Older
//!            (-∞,30) [30,50)      [50,∞)
//! ```
//!
//! # Examples
//!
//! ```
//! use causal_stats::coarsening::Coarsening;
//!
//! let age = Coarsening::new(vec![30.0, 50.0], vec!["Young", "Middle-aged", "Older"]).unwrap();
//! assert_eq!(*age.bucket(29.0), "Young");
//! assert_eq!(*age.bucket(30.0), "Middle-aged");
//! assert_eq!(*age.bucket(49.999), "Middle-aged");
//! assert_eq!(*age.bucket(50.0), "Older");
//! ```

/// Invalid coarsening definition.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum CoarseningError {
    #[display("expected {expected} labels for {thresholds} thresholds, got {actual}")]
    LabelCount {
        thresholds: usize,
        expected: usize,
        actual: usize,
    },
    #[display("thresholds must be finite and strictly ascending (index {index})")]
    UnorderedThresholds { index: usize },
}

/// A validated set of thresholds and the labels of the buckets they delimit.
#[derive(Debug, Clone, PartialEq)]
pub struct Coarsening<L> {
    thresholds: Vec<f64>,
    labels: Vec<L>,
}

impl<L> Coarsening<L> {
    /// Creates a coarsening after checking that thresholds are finite and
    /// strictly ascending and that there is exactly one more label than
    /// thresholds.
    pub fn new(thresholds: Vec<f64>, labels: Vec<L>) -> Result<Self, CoarseningError> {
        validate(&thresholds, labels.len())?;
        Ok(Self { thresholds, labels })
    }

    #[must_use]
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    #[must_use]
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Returns the label of the bucket containing `value`.
    ///
    /// Values below the first threshold (including `NaN`) fall into the
    /// lowest bucket.
    #[must_use]
    pub fn bucket(&self, value: f64) -> &L {
        &self.labels[bucket_index(&self.thresholds, value)]
    }
}

/// Returns the label for the half-open interval containing `value`.
///
/// Unlike [`Coarsening::bucket`], the thresholds and labels are validated on
/// every call.
pub fn bucketize<'a, L>(
    value: f64,
    thresholds: &[f64],
    labels: &'a [L],
) -> Result<&'a L, CoarseningError> {
    validate(thresholds, labels.len())?;
    Ok(&labels[bucket_index(thresholds, value)])
}

fn bucket_index(thresholds: &[f64], value: f64) -> usize {
    thresholds.partition_point(|threshold| *threshold <= value)
}

fn validate(thresholds: &[f64], label_count: usize) -> Result<(), CoarseningError> {
    if label_count != thresholds.len() + 1 {
        return Err(CoarseningError::LabelCount {
            thresholds: thresholds.len(),
            expected: thresholds.len() + 1,
            actual: label_count,
        });
    }
    if let Some(index) = thresholds.iter().position(|t| !t.is_finite()) {
        return Err(CoarseningError::UnorderedThresholds { index });
    }
    if let Some(index) = thresholds.windows(2).position(|w| w[0] >= w[1]) {
        return Err(CoarseningError::UnorderedThresholds { index: index + 1 });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGE_THRESHOLDS: [f64; 2] = [30.0, 50.0];
    const AGE_LABELS: [&str; 3] = ["Y", "M", "O"];

    #[test]
    fn test_boundaries_belong_to_upper_bucket() {
        assert_eq!(bucketize(30.0, &AGE_THRESHOLDS, &AGE_LABELS), Ok(&"M"));
        assert_eq!(bucketize(49.999, &AGE_THRESHOLDS, &AGE_LABELS), Ok(&"M"));
        assert_eq!(bucketize(50.0, &AGE_THRESHOLDS, &AGE_LABELS), Ok(&"O"));
        assert_eq!(bucketize(29.999, &AGE_THRESHOLDS, &AGE_LABELS), Ok(&"Y"));
    }

    #[test]
    fn test_extreme_values() {
        assert_eq!(bucketize(-1e9, &AGE_THRESHOLDS, &AGE_LABELS), Ok(&"Y"));
        assert_eq!(bucketize(1e9, &AGE_THRESHOLDS, &AGE_LABELS), Ok(&"O"));
        assert_eq!(bucketize(f64::NAN, &AGE_THRESHOLDS, &AGE_LABELS), Ok(&"Y"));
    }

    #[test]
    fn test_no_thresholds_is_single_bucket() {
        assert_eq!(bucketize(123.0, &[], &["all"]), Ok(&"all"));
    }

    #[test]
    fn test_label_count_mismatch() {
        assert_eq!(
            bucketize(1.0, &AGE_THRESHOLDS, &["a", "b"]),
            Err(CoarseningError::LabelCount {
                thresholds: 2,
                expected: 3,
                actual: 2,
            })
        );
    }

    #[test]
    fn test_unordered_thresholds() {
        assert_eq!(
            Coarsening::new(vec![50.0, 30.0], vec!["a", "b", "c"]),
            Err(CoarseningError::UnorderedThresholds { index: 1 })
        );
        assert_eq!(
            Coarsening::new(vec![30.0, 30.0], vec!["a", "b", "c"]),
            Err(CoarseningError::UnorderedThresholds { index: 1 })
        );
        assert_eq!(
            Coarsening::new(vec![f64::NAN], vec!["a", "b"]),
            Err(CoarseningError::UnorderedThresholds { index: 0 })
        );
    }

    #[test]
    fn test_income_coarsening() {
        let income =
            Coarsening::new(vec![40_000.0, 80_000.0], vec!["Low", "Medium", "High"]).unwrap();
        assert_eq!(*income.bucket(39_999.0), "Low");
        assert_eq!(*income.bucket(40_000.0), "Medium");
        assert_eq!(*income.bucket(80_000.0), "High");
        assert_eq!(income.thresholds(), &[40_000.0, 80_000.0]);
        assert_eq!(income.labels().len(), 3);
    }
}
