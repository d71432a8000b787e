//! Lesson state machines.
//!
//! Every lesson is a step counter that only moves forward (until reset),
//! gating which content sections are visible, plus lesson-specific
//! interaction state. Sections are unlocked from a static
//! `(unlock_step, section)` table, so disclosure is monotonic: a section
//! visible at step `n` stays visible at every later step.
//!
//! # Lifecycle
//!
//! ```text
//! create (step 1)
//!   ↓
//! advance() ─→ step + 1 ─→ on_step_entered()
//!   ↓                         (no-op at the terminal step,
//!   ↓                          AdvanceBlocked if gated)
//! reset() ─→ step 1, flags cleared, state and datasets regenerated
//! ```
//!
//! Lessons are stored as `Box<dyn Lesson>` by the [`Course`](crate::course::Course).
//! Implementors provide the per-lesson hooks; [`Lesson::apply`],
//! [`Lesson::advance`], [`Lesson::reset`] and [`Lesson::view`] are shared.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{action::Action, matching::MatchError};

pub mod coarsened_exact_matching;
pub mod confounders;
pub mod difference_in_differences;
pub mod randomized_experiments;
pub mod selection_bias;
pub mod what_is_causality;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum LessonId {
    #[display("what_is_causality")]
    WhatIsCausality,
    #[display("selection_bias")]
    SelectionBias,
    #[display("confounders")]
    Confounders,
    #[display("randomized_experiments")]
    RandomizedExperiments,
    #[display("difference_in_differences")]
    DifferenceInDifferences,
    #[display("coarsened_exact_matching")]
    CoarsenedExactMatching,
}

impl LessonId {
    /// All lessons in course order.
    pub const ALL: [Self; 6] = [
        Self::WhatIsCausality,
        Self::SelectionBias,
        Self::Confounders,
        Self::RandomizedExperiments,
        Self::DifferenceInDifferences,
        Self::CoarsenedExactMatching,
    ];

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::WhatIsCausality => "What is Causality?",
            Self::SelectionBias => "Selection Bias",
            Self::Confounders => "Confounders",
            Self::RandomizedExperiments => "Randomized Experiments",
            Self::DifferenceInDifferences => "Difference-in-Differences",
            Self::CoarsenedExactMatching => "Coarsened Exact Matching",
        }
    }

    /// One-based position in the course.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize + 1
    }

    /// Creates the initial state of this lesson.
    #[must_use]
    pub fn create(self) -> Box<dyn Lesson> {
        let lesson: Box<dyn Lesson> = match self {
            Self::WhatIsCausality => Box::new(what_is_causality::WhatIsCausality::new()),
            Self::SelectionBias => Box::new(selection_bias::SelectionBias::new()),
            Self::Confounders => Box::new(confounders::Confounders::new()),
            Self::RandomizedExperiments => {
                Box::new(randomized_experiments::RandomizedExperiments::new())
            }
            Self::DifferenceInDifferences => {
                Box::new(difference_in_differences::DifferenceInDifferences::new())
            }
            Self::CoarsenedExactMatching => {
                Box::new(coarsened_exact_matching::CoarsenedExactMatching::new())
            }
        };
        info!(lesson = %self, "created lesson");
        lesson
    }
}

/// Identifier of a content block, e.g. `"big_lesson"`.
pub type SectionId = &'static str;

/// Current position in a lesson; `step` is always in `1..=terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    step: u8,
    terminal: u8,
}

impl Progress {
    #[must_use]
    pub const fn new(terminal: u8) -> Self {
        Self { step: 1, terminal }
    }

    #[must_use]
    pub const fn step(self) -> u8 {
        self.step
    }

    #[must_use]
    pub const fn terminal(self) -> u8 {
        self.terminal
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.step >= self.terminal
    }

    /// Moves one step forward; returns `false` at the terminal step.
    pub fn advance(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.step += 1;
        true
    }

    /// Moves forward to `step` (clamped to the terminal step); never moves
    /// backwards.
    pub fn advance_to(&mut self, step: u8) {
        self.step = self.step.max(step.min(self.terminal));
    }

    pub fn reset(&mut self) {
        self.step = 1;
    }

    /// Fails with [`LessonError::Locked`] before `unlock_step`.
    pub fn require(self, feature: &'static str, unlock_step: u8) -> Result<(), LessonError> {
        if self.step < unlock_step {
            return Err(LessonError::Locked {
                feature,
                unlock_step,
            });
        }
        Ok(())
    }
}

/// Optional content a lesson can toggle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    #[display("show_math")]
    ShowMath,
    #[display("reveal_issue")]
    RevealIssue,
    #[display("show_naive")]
    ShowNaive,
    #[display("show_buckets")]
    ShowBuckets,
}

impl Flag {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ShowMath => "show_math",
            Self::RevealIssue => "reveal_issue",
            Self::ShowNaive => "show_naive",
            Self::ShowBuckets => "show_buckets",
        }
    }
}

/// Flags supported by a lesson, with the step each one unlocks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flags {
    supported: &'static [(Flag, u8)],
    enabled: BTreeSet<Flag>,
}

impl Flags {
    #[must_use]
    pub const fn new(supported: &'static [(Flag, u8)]) -> Self {
        Self {
            supported,
            enabled: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self, flag: Flag) -> bool {
        self.enabled.contains(&flag)
    }

    #[must_use]
    pub fn unlock_step(&self, flag: Flag) -> Option<u8> {
        self.supported
            .iter()
            .find_map(|(f, step)| (*f == flag).then_some(*step))
    }

    /// Sets a flag; idempotent.
    pub fn set(
        &mut self,
        lesson: LessonId,
        progress: Progress,
        flag: Flag,
        value: bool,
    ) -> Result<(), LessonError> {
        let unlock_step = self
            .unlock_step(flag)
            .ok_or(LessonError::UnsupportedFlag { lesson, flag })?;
        progress.require(flag.name(), unlock_step)?;
        if value {
            self.enabled.insert(flag);
        } else {
            self.enabled.remove(&flag);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.enabled.clear();
    }

    #[must_use]
    pub fn states(&self, progress: Progress) -> Vec<FlagState> {
        self.supported
            .iter()
            .map(|&(flag, unlock_step)| FlagState {
                flag,
                unlock_step,
                unlocked: progress.step() >= unlock_step,
                enabled: self.is_enabled(flag),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlagState {
    pub flag: Flag,
    pub unlock_step: u8,
    pub unlocked: bool,
    pub enabled: bool,
}

/// Sections unlocked at or before `step`, in table order.
#[must_use]
pub fn visible_sections(table: &[(u8, SectionId)], step: u8) -> Vec<SectionId> {
    table
        .iter()
        .filter(|(unlock_step, _)| *unlock_step <= step)
        .map(|(_, section)| *section)
        .collect()
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum LessonError {
    #[display("{reason}")]
    AdvanceBlocked { reason: &'static str },
    #[display("{feature} unlocks at step {unlock_step}")]
    Locked {
        feature: &'static str,
        unlock_step: u8,
    },
    #[display("{lesson} has no {flag} option")]
    UnsupportedFlag { lesson: LessonId, flag: Flag },
    #[display("{action} is not available in {lesson}")]
    UnsupportedAction {
        lesson: LessonId,
        action: &'static str,
    },
    #[display("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },
    #[display("{reason}")]
    InvalidState { reason: &'static str },
    #[display("{_0}")]
    #[from]
    Matching(MatchError),
}

impl LessonError {
    /// Stable machine-readable name of the error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AdvanceBlocked { .. } => "advance_blocked",
            Self::Locked { .. } => "locked",
            Self::UnsupportedFlag { .. } => "unsupported_flag",
            Self::UnsupportedAction { .. } => "unsupported_action",
            Self::OutOfRange { .. } => "out_of_range",
            Self::InvalidState { .. } => "invalid_state",
            Self::Matching(err) => err.kind(),
        }
    }
}

/// Read-only snapshot of a lesson after a state transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonView {
    pub id: LessonId,
    pub title: &'static str,
    pub step: u8,
    pub terminal_step: u8,
    pub sections: Vec<SectionId>,
    pub flags: Vec<FlagState>,
    pub can_advance: bool,
    /// Why advancing is blocked, if it is.
    pub advance_hint: Option<&'static str>,
    pub detail: LessonDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LessonDetail {
    WhatIsCausality(what_is_causality::Detail),
    SelectionBias(selection_bias::Detail),
    Confounders(confounders::Detail),
    RandomizedExperiments(randomized_experiments::Detail),
    DifferenceInDifferences(difference_in_differences::Detail),
    CoarsenedExactMatching(coarsened_exact_matching::Detail),
}

/// A lesson state machine.
pub trait Lesson: fmt::Debug {
    fn id(&self) -> LessonId;

    fn progress(&self) -> Progress;

    fn progress_mut(&mut self) -> &mut Progress;

    fn flags(&self) -> &Flags;

    fn flags_mut(&mut self) -> &mut Flags;

    /// `(unlock_step, section)` pairs in display order.
    fn section_table(&self) -> &'static [(u8, SectionId)];

    /// Reason the lesson cannot leave the current step, if any.
    fn advance_blocker(&self) -> Option<&'static str> {
        None
    }

    /// Called after the step counter moved forward.
    fn on_step_entered(&mut self, _step: u8) {}

    /// Reinitializes lesson-specific state and regenerates datasets.
    fn reset_state(&mut self);

    /// Handles a lesson-specific action. Must not mutate anything on error.
    fn handle(&mut self, action: &Action) -> Result<(), LessonError>;

    fn detail(&self) -> LessonDetail;

    fn visible_sections(&self, step: u8) -> Vec<SectionId> {
        visible_sections(self.section_table(), step)
    }

    fn can_advance(&self) -> bool {
        !self.progress().is_terminal() && self.advance_blocker().is_none()
    }

    /// Moves to the next step. A no-op at the terminal step.
    fn advance(&mut self) -> Result<(), LessonError> {
        if self.progress().is_terminal() {
            debug!(lesson = %self.id(), "already at the terminal step");
            return Ok(());
        }
        if let Some(reason) = self.advance_blocker() {
            return Err(LessonError::AdvanceBlocked { reason });
        }
        self.progress_mut().advance();
        let step = self.progress().step();
        self.on_step_entered(step);
        debug!(lesson = %self.id(), step, "advanced");
        Ok(())
    }

    /// Back to step 1 with default state.
    fn reset(&mut self) {
        self.progress_mut().reset();
        self.flags_mut().clear();
        self.reset_state();
        info!(lesson = %self.id(), "reset lesson");
    }

    fn set_flag(&mut self, flag: Flag, value: bool) -> Result<(), LessonError> {
        let (id, progress) = (self.id(), self.progress());
        self.flags_mut().set(id, progress, flag, value)?;
        debug!(lesson = %id, %flag, value, "set flag");
        Ok(())
    }

    /// Applies one action: the shared ones here, the rest via
    /// [`Lesson::handle`].
    fn apply(&mut self, action: &Action) -> Result<(), LessonError> {
        match action {
            Action::Advance => self.advance(),
            Action::Reset => {
                self.reset();
                Ok(())
            }
            Action::SetFlag { flag, value } => self.set_flag(*flag, *value),
            _ => self.handle(action),
        }
    }

    fn view(&self) -> LessonView {
        let progress = self.progress();
        let advance_hint = if progress.is_terminal() {
            None
        } else {
            self.advance_blocker()
        };
        LessonView {
            id: self.id(),
            title: self.id().title(),
            step: progress.step(),
            terminal_step: progress.terminal(),
            sections: self.visible_sections(progress.step()),
            flags: self.flags().states(progress),
            can_advance: self.can_advance(),
            advance_hint,
            detail: self.detail(),
        }
    }
}

/// Rejects an action the lesson does not know.
pub(crate) fn unsupported(lesson: LessonId, action: &Action) -> LessonError {
    LessonError::UnsupportedAction {
        lesson,
        action: action.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bounds() {
        let mut progress = Progress::new(3);
        assert_eq!(progress.step(), 1);
        assert!(progress.advance());
        assert!(progress.advance());
        assert!(!progress.advance());
        assert_eq!(progress.step(), 3);
        progress.reset();
        progress.advance_to(10);
        assert_eq!(progress.step(), 3);
        progress.advance_to(1);
        assert_eq!(progress.step(), 3);
    }

    #[test]
    fn test_flags_require_unlock_and_support() {
        const SUPPORTED: &[(Flag, u8)] = &[(Flag::ShowMath, 3)];
        let mut flags = Flags::new(SUPPORTED);
        let mut progress = Progress::new(3);
        let lesson = LessonId::Confounders;

        assert_eq!(
            flags.set(lesson, progress, Flag::ShowMath, true),
            Err(LessonError::Locked {
                feature: "show_math",
                unlock_step: 3,
            })
        );
        assert_eq!(
            flags.set(lesson, progress, Flag::ShowBuckets, true),
            Err(LessonError::UnsupportedFlag {
                lesson,
                flag: Flag::ShowBuckets,
            })
        );
        progress.advance_to(3);
        flags.set(lesson, progress, Flag::ShowMath, true).unwrap();
        flags.set(lesson, progress, Flag::ShowMath, true).unwrap();
        assert!(flags.is_enabled(Flag::ShowMath));
        flags.set(lesson, progress, Flag::ShowMath, false).unwrap();
        assert!(!flags.is_enabled(Flag::ShowMath));
    }

    #[test]
    fn test_visible_sections_are_monotonic_for_every_lesson() {
        for id in LessonId::ALL {
            let lesson = id.create();
            let terminal = lesson.progress().terminal();
            for step in 1..terminal {
                let now = lesson.visible_sections(step);
                let next = lesson.visible_sections(step + 1);
                assert!(
                    now.iter().all(|s| next.contains(s)),
                    "{id}: section disappeared after step {step}"
                );
            }
            assert!(!lesson.visible_sections(1).is_empty());
        }
    }

    #[test]
    fn test_lesson_ids() {
        assert_eq!(LessonId::WhatIsCausality.ordinal(), 1);
        assert_eq!(LessonId::CoarsenedExactMatching.ordinal(), 6);
        for id in LessonId::ALL {
            let lesson = id.create();
            assert_eq!(lesson.id(), id);
            assert_eq!(lesson.progress().step(), 1);
            assert_eq!(lesson.view().title, id.title());
        }
    }
}
