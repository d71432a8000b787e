//! Lesson 6: does premium reduce churn?
//!
//! Premium users churn less than free users, but premium users are also
//! older and richer. After the naive comparison and the coarsening of age
//! and income into buckets, the player matches every premium user with a
//! free user from the same buckets and compares churn within the matches.

use serde::Serialize;

use causal_stats::descriptive::mean;

use crate::{
    action::Action,
    dataset::churn::{Tier, UserRecord},
    matching::{MatchingGame, MatchingView},
};

use super::{
    Flag, Flags, Lesson, LessonDetail, LessonError, LessonId, Progress, SectionId, unsupported,
};

const TERMINAL_STEP: u8 = 11;
const USERS_STEP: u8 = 5;
const GAME_STEP: u8 = 9;

const SECTIONS: &[(u8, SectionId)] = &[
    (1, "intro"),
    (2, "scenario"),
    (3, "ab_test_problem"),
    (4, "alternative"),
    (USERS_STEP, "meet_users"),
    (6, "naive_analysis"),
    (7, "hidden_pattern"),
    (8, "coarsening"),
    (GAME_STEP, "matching_game"),
    (10, "final_results"),
    (TERMINAL_STEP, "takeaways"),
];

const FLAGS: &[(Flag, u8)] = &[
    (Flag::RevealIssue, 3),
    (Flag::ShowNaive, 6),
    (Flag::ShowBuckets, 8),
    (Flag::ShowMath, TERMINAL_STEP),
];

#[derive(Debug, Clone)]
pub struct CoarsenedExactMatching {
    progress: Progress,
    flags: Flags,
    game: MatchingGame,
}

impl Default for CoarsenedExactMatching {
    fn default() -> Self {
        Self::new()
    }
}

impl CoarsenedExactMatching {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Progress::new(TERMINAL_STEP),
            flags: Flags::new(FLAGS),
            game: MatchingGame::new(),
        }
    }

    #[must_use]
    pub fn game(&self) -> &MatchingGame {
        &self.game
    }

    fn naive_analysis(&self) -> NaiveAnalysis {
        let churn_rate = |tier| {
            mean(
                self.game
                    .observational_pool()
                    .iter()
                    .filter(|u| u.tier == tier)
                    .map(UserRecord::churn_outcome),
            )
        };
        NaiveAnalysis {
            premium_churn: churn_rate(Tier::Premium),
            free_churn: churn_rate(Tier::Free),
            effect: self.game.naive_effect().ok(),
        }
    }
}

/// Churn rates over the whole observational pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NaiveAnalysis {
    pub premium_churn: Option<f64>,
    pub free_churn: Option<f64>,
    /// Free churn minus premium churn.
    pub effect: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detail {
    pub show_issue: bool,
    /// The illustrative pool, from the "meet the users" step on.
    pub users: Vec<UserRecord>,
    pub naive: Option<NaiveAnalysis>,
    pub show_buckets: bool,
    pub matching: Option<MatchingView>,
    pub show_math: bool,
}

impl Lesson for CoarsenedExactMatching {
    fn id(&self) -> LessonId {
        LessonId::CoarsenedExactMatching
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
        (self.progress.step() == GAME_STEP && !self.game.is_complete())
            .then_some("match every premium user before seeing the results")
    }

    fn on_step_entered(&mut self, step: u8) {
        if step == GAME_STEP {
            self.game.switch_to_subset();
        }
    }

    fn reset_state(&mut self) {
        self.game = MatchingGame::new();
    }

    fn handle(&mut self, action: &Action) -> Result<(), LessonError> {
        match action {
            Action::SelectTreatment { id } => {
                self.progress.require("the matching game", GAME_STEP)?;
                self.game.select_treatment(id)?;
            }
            Action::SelectControl { id } => {
                self.progress.require("the matching game", GAME_STEP)?;
                self.game.select_control(id)?;
            }
            Action::ConfirmMatch => {
                self.progress.require("the matching game", GAME_STEP)?;
                self.game.confirm_match()?;
            }
            _ => return Err(unsupported(self.id(), action)),
        }
        Ok(())
    }

    fn detail(&self) -> LessonDetail {
        let step = self.progress.step();
        LessonDetail::CoarsenedExactMatching(Detail {
            show_issue: self.flags.is_enabled(Flag::RevealIssue),
            users: if step >= USERS_STEP {
                self.game.observational_pool().to_vec()
            } else {
                Vec::new()
            },
            naive: self
                .flags
                .is_enabled(Flag::ShowNaive)
                .then(|| self.naive_analysis()),
            show_buckets: self.flags.is_enabled(Flag::ShowBuckets),
            matching: (step >= GAME_STEP).then(|| self.game.view()),
            show_math: self.flags.is_enabled(Flag::ShowMath),
        })
    }
}
