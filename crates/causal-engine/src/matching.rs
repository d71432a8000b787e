//! Coarsened exact matching mini-game.
//!
//! The player pairs premium users (treatment) with free users (control)
//! whose coarsened age and income buckets are identical. A saved match
//! removes both users from the candidate pool for the rest of the session,
//! so the saved matches always partition a subset of the pool into disjoint
//! pairs.
//!
//! The naive effect is always computed on the full observational pool while
//! the adjusted effect only uses saved matches; contrasting the two is the
//! point of the lesson.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use causal_stats::effect::{EffectError, GroupSide, Strata, mean_difference};

use crate::dataset::churn::{self, AgeBucket, Buckets, IncomeBucket, Tier, UserRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[display("treatment")]
    Treatment,
    #[display("control")]
    Control,
}

impl Role {
    #[must_use]
    pub const fn tier(self) -> Tier {
        match self {
            Self::Treatment => Tier::Premium,
            Self::Control => Tier::Free,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum SelectionIssue {
    #[display("is not in the active pool")]
    NotInPool,
    #[display("is already matched")]
    AlreadyMatched,
}

/// One coarsened dimension on which a candidate pair disagrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(tag = "dimension", rename_all = "snake_case")]
pub enum Mismatch {
    #[display("age ({treatment} vs {control})")]
    Age {
        treatment: AgeBucket,
        control: AgeBucket,
    },
    #[display("income ({treatment} vs {control})")]
    Income {
        treatment: IncomeBucket,
        control: IncomeBucket,
    },
}

/// Non-empty list of mismatched dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Mismatches(Vec<Mismatch>);

impl Mismatches {
    #[must_use]
    pub fn as_slice(&self) -> &[Mismatch] {
        &self.0
    }
}

impl fmt::Display for Mismatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mismatch) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "{mismatch}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum MatchError {
    #[display("{role} user {id} {issue}")]
    InvalidSelection {
        role: Role,
        id: String,
        issue: SelectionIssue,
    },
    #[display("select both a premium and a free user first")]
    IncompleteCandidate,
    #[display("not a perfect match: buckets differ on {mismatches}")]
    ImperfectMatchSave { mismatches: Mismatches },
}

impl MatchError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSelection { .. } => "invalid_selection",
            Self::IncompleteCandidate => "incomplete_candidate",
            Self::ImperfectMatchSave { .. } => "imperfect_match_save",
        }
    }
}

/// Result of comparing the currently selected pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateEvaluation {
    pub treatment_id: String,
    pub control_id: String,
    pub treatment_buckets: Buckets,
    pub control_buckets: Buckets,
    pub perfect_match: bool,
    pub mismatches: Vec<Mismatch>,
}

fn compare(treatment: &UserRecord, control: &UserRecord) -> CandidateEvaluation {
    let treatment_buckets = treatment.buckets();
    let control_buckets = control.buckets();
    let mut mismatches = Vec::new();
    if treatment_buckets.age != control_buckets.age {
        mismatches.push(Mismatch::Age {
            treatment: treatment_buckets.age,
            control: control_buckets.age,
        });
    }
    if treatment_buckets.income != control_buckets.income {
        mismatches.push(Mismatch::Income {
            treatment: treatment_buckets.income,
            control: control_buckets.income,
        });
    }
    CandidateEvaluation {
        treatment_id: treatment.id.clone(),
        control_id: control.id.clone(),
        treatment_buckets,
        control_buckets,
        perfect_match: mismatches.is_empty(),
        mismatches,
    }
}

/// A saved treatment/control pair sharing the same buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub treatment: UserRecord,
    pub control: UserRecord,
    pub buckets: Buckets,
}

#[derive(Debug, Clone)]
pub struct MatchingGame {
    observational: Vec<UserRecord>,
    subset: Vec<UserRecord>,
    use_subset: bool,
    selected_treatment: Option<String>,
    selected_control: Option<String>,
    matches: Vec<Match>,
}

impl Default for MatchingGame {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingGame {
    #[must_use]
    pub fn new() -> Self {
        Self {
            observational: churn::observational_pool(),
            subset: churn::matching_subset(),
            use_subset: false,
            selected_treatment: None,
            selected_control: None,
            matches: Vec::new(),
        }
    }

    #[must_use]
    pub fn uses_subset(&self) -> bool {
        self.use_subset
    }

    /// Switches to the small, guaranteed-matchable pool. Selections and
    /// matches made on the illustrative pool are discarded.
    pub fn switch_to_subset(&mut self) {
        if self.use_subset {
            return;
        }
        self.use_subset = true;
        self.selected_treatment = None;
        self.selected_control = None;
        self.matches.clear();
        debug!("matching game switched to the subset pool");
    }

    #[must_use]
    pub fn observational_pool(&self) -> &[UserRecord] {
        &self.observational
    }

    #[must_use]
    pub fn active_pool(&self) -> &[UserRecord] {
        if self.use_subset {
            &self.subset
        } else {
            &self.observational
        }
    }

    #[must_use]
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    #[must_use]
    pub fn selected_treatment(&self) -> Option<&str> {
        self.selected_treatment.as_deref()
    }

    #[must_use]
    pub fn selected_control(&self) -> Option<&str> {
        self.selected_control.as_deref()
    }

    #[must_use]
    pub fn is_matched(&self, id: &str) -> bool {
        self.matches
            .iter()
            .any(|m| m.treatment.id == id || m.control.id == id)
    }

    /// Unmatched users of the given role, in pool order.
    pub fn available(&self, role: Role) -> impl Iterator<Item = &UserRecord> + '_ {
        self.active_pool()
            .iter()
            .filter(move |u| u.tier == role.tier() && !self.is_matched(&u.id))
    }

    fn lookup(&self, role: Role, id: &str) -> Result<&UserRecord, MatchError> {
        let invalid = |issue| MatchError::InvalidSelection {
            role,
            id: id.to_owned(),
            issue,
        };
        let user = self
            .active_pool()
            .iter()
            .find(|u| u.id == id && u.tier == role.tier())
            .ok_or_else(|| invalid(SelectionIssue::NotInPool))?;
        if self.is_matched(id) {
            return Err(invalid(SelectionIssue::AlreadyMatched));
        }
        Ok(user)
    }

    /// Checks that `id` could be selected for `role` without changing
    /// anything.
    pub fn check_selection(&self, role: Role, id: &str) -> Result<(), MatchError> {
        self.lookup(role, id).map(|_| ())
    }

    /// Selects a premium user, replacing any previous treatment selection.
    pub fn select_treatment(&mut self, id: &str) -> Result<(), MatchError> {
        self.check_selection(Role::Treatment, id)?;
        self.selected_treatment = Some(id.to_owned());
        debug!(id, "selected treatment user");
        Ok(())
    }

    /// Selects a free user, replacing any previous control selection.
    pub fn select_control(&mut self, id: &str) -> Result<(), MatchError> {
        self.check_selection(Role::Control, id)?;
        self.selected_control = Some(id.to_owned());
        debug!(id, "selected control user");
        Ok(())
    }

    fn candidate(&self) -> Result<(&UserRecord, &UserRecord), MatchError> {
        let (Some(treatment), Some(control)) = (&self.selected_treatment, &self.selected_control)
        else {
            return Err(MatchError::IncompleteCandidate);
        };
        Ok((
            self.lookup(Role::Treatment, treatment)?,
            self.lookup(Role::Control, control)?,
        ))
    }

    /// Compares the buckets of the selected pair.
    pub fn evaluate_candidate(&self) -> Result<CandidateEvaluation, MatchError> {
        let (treatment, control) = self.candidate()?;
        Ok(compare(treatment, control))
    }

    /// Saves the selected pair if it is a perfect match and clears both
    /// selections. Nothing changes on error.
    pub fn confirm_match(&mut self) -> Result<&Match, MatchError> {
        let (treatment, control) = self.candidate()?;
        let evaluation = compare(treatment, control);
        if !evaluation.perfect_match {
            return Err(MatchError::ImperfectMatchSave {
                mismatches: Mismatches(evaluation.mismatches),
            });
        }
        let saved = Match {
            treatment: treatment.clone(),
            control: control.clone(),
            buckets: evaluation.treatment_buckets,
        };
        debug!(
            treatment = %saved.treatment.id,
            control = %saved.control.id,
            buckets = %saved.buckets,
            "saved match"
        );
        self.selected_treatment = None;
        self.selected_control = None;
        self.matches.push(saved);
        Ok(&self.matches[self.matches.len() - 1])
    }

    /// Every treatment user of the active pool is in a saved match.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.available(Role::Treatment).next().is_none()
    }

    /// Free churn rate minus premium churn rate over the whole
    /// observational pool, regardless of matching progress.
    pub fn naive_effect(&self) -> Result<f64, EffectError> {
        let (premium, free): (Vec<_>, Vec<_>) = self
            .observational
            .iter()
            .partition(|u| u.tier == Tier::Premium);
        mean_difference(&premium, &free, |u| u.churn_outcome())
    }

    /// Control churn rate minus treatment churn rate over saved matches.
    pub fn adjusted_effect(&self) -> Result<f64, EffectError> {
        if self.matches.is_empty() {
            return Err(EffectError::EmptyGroup {
                side: GroupSide::Pooled,
            });
        }
        let treated = self.matches.iter().map(|m| &m.treatment).collect::<Vec<_>>();
        let control = self.matches.iter().map(|m| &m.control).collect::<Vec<_>>();
        mean_difference(&treated, &control, |u| u.churn_outcome())
    }

    /// Saved matches grouped by their shared buckets, weighted by stratum
    /// size.
    pub fn stratified_effect(&self) -> Result<f64, EffectError> {
        let mut strata = Strata::new();
        for m in &self.matches {
            strata.insert_treated(m.buckets, m.treatment.churn_outcome());
            strata.insert_control(m.buckets, m.control.churn_outcome());
        }
        strata.stratified_effect(|outcome| *outcome)
    }

    #[must_use]
    pub fn view(&self) -> MatchingView {
        let pool = self
            .active_pool()
            .iter()
            .map(|user| PoolEntry {
                user: user.clone(),
                buckets: user.buckets(),
                matched: self.is_matched(&user.id),
            })
            .collect();
        MatchingView {
            uses_subset: self.use_subset,
            pool,
            selected_treatment: self.selected_treatment.clone(),
            selected_control: self.selected_control.clone(),
            evaluation: self.evaluate_candidate().ok(),
            matches: self.matches.clone(),
            complete: self.is_complete(),
            naive_effect: self.naive_effect().ok(),
            adjusted_effect: self.adjusted_effect().ok(),
            stratified_effect: self.stratified_effect().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolEntry {
    #[serde(flatten)]
    pub user: UserRecord,
    pub buckets: Buckets,
    pub matched: bool,
}

/// Read-only snapshot of the matching game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchingView {
    pub uses_subset: bool,
    pub pool: Vec<PoolEntry>,
    pub selected_treatment: Option<String>,
    pub selected_control: Option<String>,
    pub evaluation: Option<CandidateEvaluation>,
    pub matches: Vec<Match>,
    pub complete: bool,
    pub naive_effect: Option<f64>,
    pub adjusted_effect: Option<f64>,
    pub stratified_effect: Option<f64>,
}
