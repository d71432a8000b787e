//! Treatment effect estimators.
//!
//! All estimators follow the same sign convention: the effect is the mean of
//! the second (comparison) group minus the mean of the first group. The
//! lessons pass the treated units first, so a positive value means the
//! outcome is higher among untreated units (e.g. free users churn more than
//! premium users).
//!
//! # Stratified effects
//!
//! [`Strata`] groups units by a stratification key. Within each stratum `s`
//! holding both treated and control units the effect is
//!
//! ```text
//! τ_s = mean(Y | control, s) − mean(Y | treated, s)
//! ```
//!
//! and the overall estimate weights strata by their size:
//!
//! ```text
//! τ = Σ_s n_s · τ_s / Σ_s n_s
//! ```
//!
//! Strata without common support (one side empty) are pruned before
//! weighting, as coarsened exact matching does.

use std::collections::BTreeMap;

use serde::Serialize;

/// Which group of a comparison was empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum GroupSide {
    #[display("first")]
    First,
    #[display("second")]
    Second,
    #[display("pooled")]
    Pooled,
}

/// An effect was requested over an empty group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum EffectError {
    #[display("cannot compute an effect: the {side} group is empty")]
    EmptyGroup { side: GroupSide },
}

/// Returns `mean(field over group_b) - mean(field over group_a)`.
///
/// # Errors
///
/// [`EffectError::EmptyGroup`] naming the empty side if either group is
/// empty. The first group is checked first.
///
/// # Examples
///
/// ```
/// # use causal_stats::effect::{mean_difference, EffectError, GroupSide};
/// let premium = [false, true, false, false];
/// let free = [true, true, false, true];
/// let churn = |c: &bool| f64::from(u8::from(*c));
/// assert_eq!(mean_difference(&premium, &free, churn), Ok(0.5));
/// assert_eq!(
///     mean_difference(&[], &free, churn),
///     Err(EffectError::EmptyGroup { side: GroupSide::First })
/// );
/// ```
pub fn mean_difference<T, F>(group_a: &[T], group_b: &[T], field: F) -> Result<f64, EffectError>
where
    F: Fn(&T) -> f64,
{
    let mean_a = group_mean(group_a, &field).ok_or(EffectError::EmptyGroup {
        side: GroupSide::First,
    })?;
    let mean_b = group_mean(group_b, &field).ok_or(EffectError::EmptyGroup {
        side: GroupSide::Second,
    })?;
    Ok(mean_b - mean_a)
}

#[expect(clippy::cast_precision_loss)]
fn group_mean<T, F>(group: &[T], field: &F) -> Option<f64>
where
    F: Fn(&T) -> f64,
{
    if group.is_empty() {
        return None;
    }
    Some(group.iter().map(field).sum::<f64>() / group.len() as f64)
}

/// Effect estimated within one stratum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StratumEstimate {
    /// Number of units (treated and control) in the stratum.
    pub size: usize,
    /// Within-stratum mean difference.
    pub effect: f64,
}

/// Size-weighted average of per-stratum effects: `Σ n_s·τ_s / Σ n_s`.
///
/// # Errors
///
/// [`EffectError::EmptyGroup`] if the strata hold no units at all.
///
/// # Examples
///
/// ```
/// # use causal_stats::effect::{weighted_effect, StratumEstimate};
/// let strata = [
///     StratumEstimate { size: 2, effect: 0.5 },
///     StratumEstimate { size: 3, effect: -0.1 },
/// ];
/// let effect = weighted_effect(&strata).unwrap();
/// assert!((effect - 0.14).abs() < 1e-12);
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn weighted_effect(strata: &[StratumEstimate]) -> Result<f64, EffectError> {
    let total = strata.iter().map(|s| s.size).sum::<usize>();
    if total == 0 {
        return Err(EffectError::EmptyGroup {
            side: GroupSide::Pooled,
        });
    }
    let weighted = strata
        .iter()
        .map(|s| s.size as f64 * s.effect)
        .sum::<f64>();
    Ok(weighted / total as f64)
}

#[derive(Debug, Clone)]
struct Stratum<T> {
    treated: Vec<T>,
    control: Vec<T>,
}

impl<T> Default for Stratum<T> {
    fn default() -> Self {
        Self {
            treated: Vec::new(),
            control: Vec::new(),
        }
    }
}

/// Units grouped by stratification key, split into treated and control.
#[derive(Debug, Clone)]
pub struct Strata<K, T> {
    strata: BTreeMap<K, Stratum<T>>,
}

impl<K, T> Default for Strata<K, T> {
    fn default() -> Self {
        Self {
            strata: BTreeMap::new(),
        }
    }
}

impl<K, T> Strata<K, T>
where
    K: Ord + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_treated(&mut self, key: K, unit: T) {
        self.strata.entry(key).or_default().treated.push(unit);
    }

    pub fn insert_control(&mut self, key: K, unit: T) {
        self.strata.entry(key).or_default().control.push(unit);
    }

    /// Number of distinct keys, including strata without common support.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strata.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }

    /// Per-stratum estimates in key order, skipping strata where either
    /// side is empty.
    pub fn estimates<F>(&self, outcome: F) -> Vec<(K, StratumEstimate)>
    where
        F: Fn(&T) -> f64,
    {
        self.strata
            .iter()
            .filter_map(|(key, stratum)| {
                let effect = mean_difference(&stratum.treated, &stratum.control, &outcome).ok()?;
                let size = stratum.treated.len() + stratum.control.len();
                Some((key.clone(), StratumEstimate { size, effect }))
            })
            .collect()
    }

    /// Size-weighted effect over strata with common support.
    ///
    /// # Errors
    ///
    /// [`EffectError::EmptyGroup`] if no stratum has both treated and
    /// control units.
    pub fn stratified_effect<F>(&self, outcome: F) -> Result<f64, EffectError>
    where
        F: Fn(&T) -> f64,
    {
        let estimates = self
            .estimates(outcome)
            .into_iter()
            .map(|(_, estimate)| estimate)
            .collect::<Vec<_>>();
        weighted_effect(&estimates)
    }
}

/// Difference-in-differences: change in the treated group minus change in
/// the control group over the same period.
///
/// ```
/// # use causal_stats::effect::difference_in_differences;
/// assert_eq!(difference_in_differences(70.0, 85.0, 68.0, 78.0), 5.0);
/// ```
#[must_use]
pub fn difference_in_differences(
    treated_before: f64,
    treated_after: f64,
    control_before: f64,
    control_after: f64,
) -> f64 {
    (treated_after - treated_before) - (control_after - control_before)
}

/// Ratio of an outcome difference to a treatment difference (the Wald
/// estimator used with an instrument), `None` when the treatment did not
/// move.
///
/// ```
/// # use causal_stats::effect::wald_ratio;
/// assert_eq!(wald_ratio(85.0 - 70.0, 10.0 - 5.0), Some(3.0));
/// assert_eq!(wald_ratio(4.0, 0.0), None);
/// ```
#[must_use]
pub fn wald_ratio(outcome_diff: f64, treatment_diff: f64) -> Option<f64> {
    (treatment_diff != 0.0).then(|| outcome_diff / treatment_diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(v: &f64) -> f64 {
        *v
    }

    #[test]
    fn test_mean_difference_orientation() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 6.0];
        assert_eq!(mean_difference(&a, &b, identity), Ok(3.0));
        assert_eq!(mean_difference(&b, &a, identity), Ok(-3.0));
    }

    #[test]
    fn test_mean_difference_empty_groups() {
        let empty: [f64; 0] = [];
        assert_eq!(
            mean_difference(&empty, &[1.0], identity),
            Err(EffectError::EmptyGroup {
                side: GroupSide::First
            })
        );
        assert_eq!(
            mean_difference(&[1.0], &empty, identity),
            Err(EffectError::EmptyGroup {
                side: GroupSide::Second
            })
        );
        assert_eq!(
            mean_difference(&empty, &empty, identity),
            Err(EffectError::EmptyGroup {
                side: GroupSide::First
            })
        );
    }

    #[test]
    fn test_weighted_effect_two_strata() {
        let strata = [
            StratumEstimate {
                size: 2,
                effect: 0.5,
            },
            StratumEstimate {
                size: 3,
                effect: -0.1,
            },
        ];
        let effect = weighted_effect(&strata).unwrap();
        assert!((effect - 0.14).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_effect_empty() {
        assert!(weighted_effect(&[]).is_err());
        assert!(
            weighted_effect(&[StratumEstimate {
                size: 0,
                effect: 1.0
            }])
            .is_err()
        );
    }

    #[test]
    fn test_strata_match_weighted_effect() {
        let mut strata = Strata::new();
        // stratum "a": n = 2, τ = 0.5
        strata.insert_treated("a", 0.0);
        strata.insert_control("a", 0.5);
        // stratum "b": n = 3, τ = -0.1
        strata.insert_treated("b", 0.3);
        strata.insert_control("b", 0.2);
        strata.insert_control("b", 0.2);

        let estimates = strata.estimates(identity);
        assert_eq!(estimates.len(), 2);
        assert_eq!(estimates[0].0, "a");
        assert_eq!(estimates[0].1.size, 2);
        assert!((estimates[1].1.effect + 0.1).abs() < 1e-12);

        let effect = strata.stratified_effect(identity).unwrap();
        assert!((effect - 0.14).abs() < 1e-12);
    }

    #[test]
    fn test_strata_prune_missing_common_support() {
        let mut strata = Strata::new();
        strata.insert_treated(1, 1.0);
        strata.insert_control(1, 0.0);
        strata.insert_treated(2, 1.0);
        strata.insert_treated(2, 1.0);
        strata.insert_control(3, 0.0);

        assert_eq!(strata.len(), 3);
        let estimates = strata.estimates(identity);
        assert_eq!(estimates.len(), 1);
        assert_eq!(strata.stratified_effect(identity), Ok(-1.0));
    }

    #[test]
    fn test_strata_without_support_is_error() {
        let mut strata = Strata::new();
        strata.insert_treated("x", 1.0);
        assert!(!strata.is_empty());
        assert_eq!(
            strata.stratified_effect(identity),
            Err(EffectError::EmptyGroup {
                side: GroupSide::Pooled
            })
        );
    }

    #[test]
    fn test_difference_in_differences_removes_shared_trend() {
        // both groups rise by 10, treatment adds nothing
        assert_eq!(difference_in_differences(50.0, 60.0, 40.0, 50.0), 0.0);
        assert_eq!(difference_in_differences(70.0, 80.0, 68.0, 73.0), 5.0);
    }
}
