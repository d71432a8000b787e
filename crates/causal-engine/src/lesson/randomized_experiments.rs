//! Lesson 4: rolling out a feature.
//!
//! Feature users look 25 minutes a day more engaged than everyone else.
//! The player tries three rollout strategies and watches the estimated
//! average treatment effect move; only the randomized rollout is unbiased.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::Action;

use super::{
    Flag, Flags, Lesson, LessonDetail, LessonError, LessonId, Progress, SectionId, unsupported,
};

const TERMINAL_STEP: u8 = 3;
const GAME_STEP: u8 = 2;

const SECTIONS: &[(u8, SectionId)] = &[
    (1, "scenario"),
    (GAME_STEP, "instructions"),
    (GAME_STEP, "rollout_game"),
    (TERMINAL_STEP, "takeaways"),
];

const FLAGS: &[(Flag, u8)] = &[(Flag::ShowMath, TERMINAL_STEP)];

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
pub enum Rollout {
    #[display("initial observation")]
    Baseline,
    #[display("power-user rollout")]
    PowerUser,
    #[display("self-selection")]
    SelfSelection,
    #[display("randomized rollout")]
    Randomized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Unknown,
    High,
    Partial,
    Unbiased,
}

/// Average daily engagement (minutes) with and without the feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RolloutResult {
    pub rollout: Rollout,
    pub no_feature: f64,
    pub feature: f64,
    pub ate: f64,
    pub bias: Bias,
    pub explanation: &'static str,
}

impl Rollout {
    /// Strategies the player can choose; the baseline is only the
    /// starting observation.
    pub const CHOICES: [Self; 3] = [Self::PowerUser, Self::SelfSelection, Self::Randomized];

    #[must_use]
    pub fn result(self) -> RolloutResult {
        let (no_feature, feature, bias, explanation) = match self {
            Self::Baseline => (
                65.0,
                90.0,
                Bias::Unknown,
                "Feature users appear more engaged, but is this causal?",
            ),
            Self::PowerUser => (
                60.0,
                100.0,
                Bias::High,
                "Only the most engaged users opted in through the signup link, so the feature \
                 group was already highly engaged.",
            ),
            Self::SelfSelection => (
                65.0,
                90.0,
                Bias::Partial,
                "Users who choose the feature are more curious and motivated, and those traits \
                 raise engagement on their own.",
            ),
            Self::Randomized => (
                70.0,
                80.0,
                Bias::Unbiased,
                "Randomisation balances hidden traits, so the difference is the feature's effect.",
            ),
        };
        RolloutResult {
            rollout: self,
            no_feature,
            feature,
            ate: feature - no_feature,
            bias,
            explanation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomizedExperiments {
    progress: Progress,
    flags: Flags,
    current: Rollout,
    tried: BTreeSet<Rollout>,
}

impl Default for RandomizedExperiments {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomizedExperiments {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Progress::new(TERMINAL_STEP),
            flags: Flags::new(FLAGS),
            current: Rollout::Baseline,
            tried: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn all_tried(&self) -> bool {
        Rollout::CHOICES.iter().all(|r| self.tried.contains(r))
    }

    fn choose_rollout(&mut self, rollout: Rollout) -> Result<(), LessonError> {
        self.progress.require("the rollout game", GAME_STEP)?;
        if rollout == Rollout::Baseline {
            return Err(LessonError::InvalidState {
                reason: "pick one of the three rollout strategies",
            });
        }
        self.current = rollout;
        self.tried.insert(rollout);
        debug!(%rollout, tried = self.tried.len(), "chose rollout");
        if self.all_tried() && self.progress.step() < TERMINAL_STEP {
            self.progress.advance_to(TERMINAL_STEP);
            debug!("every rollout tried, showing takeaways");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detail {
    pub current: RolloutResult,
    pub tried: Vec<Rollout>,
    pub all_tried: bool,
    pub show_math: bool,
}

impl Lesson for RandomizedExperiments {
    fn id(&self) -> LessonId {
        LessonId::RandomizedExperiments
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    fn flags(&self) -> &Flags {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    fn section_table(&self) -> &'static [(u8, SectionId)] {
        SECTIONS
    }

    fn advance_blocker(&self) -> Option<&'static str> {
        (self.progress.step() == GAME_STEP && !self.all_tried())
            .then_some("try all three rollout strategies first")
    }

    fn reset_state(&mut self) {
        self.current = Rollout::Baseline;
        self.tried.clear();
    }

    fn handle(&mut self, action: &Action) -> Result<(), LessonError> {
        match action {
            Action::ChooseRollout { rollout } => self.choose_rollout(*rollout),
            _ => Err(unsupported(self.id(), action)),
        }
    }

    fn detail(&self) -> LessonDetail {
        LessonDetail::RandomizedExperiments(Detail {
            current: self.current.result(),
            tried: self.tried.iter().copied().collect(),
            all_tried: self.all_tried(),
            show_math: self.flags.is_enabled(Flag::ShowMath),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollout_effects() {
        assert_eq!(Rollout::Baseline.result().ate, 25.0);
        assert_eq!(Rollout::PowerUser.result().ate, 40.0);
        assert_eq!(Rollout::SelfSelection.result().ate, 25.0);
        assert_eq!(Rollout::Randomized.result().ate, 10.0);
    }

    #[test]
    fn test_trying_every_rollout_moves_to_takeaways() {
        let mut lesson = RandomizedExperiments::new();
        assert!(lesson.choose_rollout(Rollout::Randomized).is_err());
        lesson.advance().unwrap();
        assert!(matches!(
            lesson.advance(),
            Err(LessonError::AdvanceBlocked { .. })
        ));

        lesson.choose_rollout(Rollout::PowerUser).unwrap();
        lesson.choose_rollout(Rollout::PowerUser).unwrap();
        lesson.choose_rollout(Rollout::SelfSelection).unwrap();
        assert_eq!(lesson.progress().step(), GAME_STEP);
        lesson.choose_rollout(Rollout::Randomized).unwrap();
        assert_eq!(lesson.progress().step(), TERMINAL_STEP);
        assert!(lesson.visible_sections(TERMINAL_STEP).contains(&"takeaways"));
    }

    #[test]
    fn test_baseline_is_not_a_choice() {
        let mut lesson = RandomizedExperiments::new();
        lesson.advance().unwrap();
        assert!(matches!(
            lesson.choose_rollout(Rollout::Baseline),
            Err(LessonError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_math_and_reset() {
        let mut lesson = RandomizedExperiments::new();
        lesson.advance().unwrap();
        for rollout in Rollout::CHOICES {
            lesson.choose_rollout(rollout).unwrap();
        }
        lesson.set_flag(Flag::ShowMath, true).unwrap();
        let LessonDetail::RandomizedExperiments(detail) = lesson.detail() else {
            unreachable!();
        };
        assert!(detail.show_math);
        assert_eq!(detail.current.rollout, Rollout::Randomized);

        lesson.reset();
        assert_eq!(lesson.detail(), RandomizedExperiments::new().detail());
        assert!(!lesson.all_tried());
    }
}
