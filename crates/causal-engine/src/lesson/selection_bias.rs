//! Lesson 2: the running experiment.
//!
//! The player recruits volunteers for a running program by placing a sign
//! somewhere in town. Every site attracts a skewed crowd, so every
//! experiment fails in its own way. After testing all three sites the
//! lesson explains selection bias.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::Action;

use super::{
    Flags, Lesson, LessonDetail, LessonError, LessonId, Progress, SectionId, unsupported,
};

const TERMINAL_STEP: u8 = 4;
const MAP_STEP: u8 = 3;

const SECTIONS: &[(u8, SectionId)] = &[
    (1, "intro"),
    (2, "challenge"),
    (MAP_STEP, "city_map"),
    (TERMINAL_STEP, "explanation"),
];

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
pub enum Site {
    #[display("McDonald's")]
    Mcdonalds,
    #[display("Gym")]
    Gym,
    #[display("Hospital")]
    Hospital,
}

impl Site {
    pub const ALL: [Self; 3] = [Self::Mcdonalds, Self::Gym, Self::Hospital];

    #[must_use]
    pub const fn outcome(self) -> SiteOutcome {
        match self {
            Self::Mcdonalds => SiteOutcome {
                signups: 25,
                treatment_weight_change: 2.0,
                control_weight_change: 0.0,
                explanation: "The McDonald's volunteers gained weight during the running program.",
            },
            Self::Gym => SiteOutcome {
                signups: 30,
                treatment_weight_change: 0.0,
                control_weight_change: 0.0,
                explanation: "Gym regulars were already fit: neither group lost any weight.",
            },
            Self::Hospital => SiteOutcome {
                signups: 15,
                treatment_weight_change: 3.0,
                control_weight_change: 0.0,
                explanation: "Many hospital volunteers got injured and could not keep running.",
            },
        }
    }
}

/// Fixed result of recruiting at a site. Weight changes are in pounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiteOutcome {
    pub signups: u32,
    pub treatment_weight_change: f64,
    pub control_weight_change: f64,
    pub explanation: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Select,
    Placed,
    Signup,
    Results,
}

#[derive(Debug, Clone)]
pub struct SelectionBias {
    progress: Progress,
    flags: Flags,
    phase: Phase,
    site: Option<Site>,
    tested: BTreeSet<Site>,
}

impl Default for SelectionBias {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionBias {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Progress::new(TERMINAL_STEP),
            flags: Flags::new(&[]),
            phase: Phase::Select,
            site: None,
            tested: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn all_sites_tested(&self) -> bool {
        self.tested.len() == Site::ALL.len()
    }

    fn expect_phase(&self, expected: Phase, reason: &'static str) -> Result<(), LessonError> {
        self.progress.require("the city map", MAP_STEP)?;
        if self.phase != expected {
            return Err(LessonError::InvalidState { reason });
        }
        Ok(())
    }

    fn place_sign(&mut self, site: Site) -> Result<(), LessonError> {
        self.progress.require("the city map", MAP_STEP)?;
        if !matches!(self.phase, Phase::Select | Phase::Placed) {
            return Err(LessonError::InvalidState {
                reason: "finish the current experiment before moving the sign",
            });
        }
        self.site = Some(site);
        self.phase = Phase::Placed;
        debug!(%site, "placed sign");
        Ok(())
    }

    fn wait_for_signups(&mut self) -> Result<(), LessonError> {
        self.expect_phase(Phase::Placed, "place a sign first")?;
        self.phase = Phase::Signup;
        Ok(())
    }

    fn run_experiment(&mut self) -> Result<(), LessonError> {
        self.expect_phase(Phase::Signup, "wait for sign-ups first")?;
        let Some(site) = self.site else {
            return Err(LessonError::InvalidState {
                reason: "place a sign first",
            });
        };
        self.phase = Phase::Results;
        self.tested.insert(site);
        debug!(%site, tested = self.tested.len(), "ran experiment");
        Ok(())
    }

    fn try_another_site(&mut self) -> Result<(), LessonError> {
        self.expect_phase(Phase::Results, "run the experiment first")?;
        if self.all_sites_tested() {
            return Err(LessonError::InvalidState {
                reason: "every site has already been tested",
            });
        }
        self.site = None;
        self.phase = Phase::Select;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detail {
    pub phase: Phase,
    pub site: Option<Site>,
    /// Shown from the sign-up phase on.
    pub outcome: Option<SiteOutcome>,
    pub show_results: bool,
    pub tested: Vec<Site>,
    pub all_sites_tested: bool,
}

impl Lesson for SelectionBias {
    fn id(&self) -> LessonId {
        LessonId::SelectionBias
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
        (self.progress.step() == MAP_STEP && !self.all_sites_tested())
            .then_some("test all three sign locations first")
    }

    fn reset_state(&mut self) {
        self.phase = Phase::Select;
        self.site = None;
        self.tested.clear();
    }

    fn handle(&mut self, action: &Action) -> Result<(), LessonError> {
        match action {
            Action::PlaceSign { site } => self.place_sign(*site),
            Action::WaitForSignups => self.wait_for_signups(),
            Action::RunExperiment => self.run_experiment(),
            Action::TryAnotherSite => self.try_another_site(),
            _ => Err(unsupported(self.id(), action)),
        }
    }

    fn detail(&self) -> LessonDetail {
        let outcome = match self.phase {
            Phase::Signup | Phase::Results => self.site.map(Site::outcome),
            Phase::Select | Phase::Placed => None,
        };
        LessonDetail::SelectionBias(Detail {
            phase: self.phase,
            site: self.site,
            outcome,
            show_results: self.phase == Phase::Results,
            tested: self.tested.iter().copied().collect(),
            all_sites_tested: self.all_sites_tested(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_map() -> SelectionBias {
        let mut lesson = SelectionBias::new();
        lesson.advance().unwrap();
        lesson.advance().unwrap();
        lesson
    }

    fn test_site(lesson: &mut SelectionBias, site: Site) {
        lesson.place_sign(site).unwrap();
        lesson.wait_for_signups().unwrap();
        lesson.run_experiment().unwrap();
    }

    #[test]
    fn test_map_is_locked_until_step_three() {
        let mut lesson = SelectionBias::new();
        assert_eq!(
            lesson.place_sign(Site::Gym),
            Err(LessonError::Locked {
                feature: "the city map",
                unlock_step: 3,
            })
        );
    }

    #[test]
    fn test_experiment_phases() {
        let mut lesson = at_map();
        assert!(lesson.run_experiment().is_err());
        lesson.place_sign(Site::Mcdonalds).unwrap();
        // moving the sign before sign-ups is allowed
        lesson.place_sign(Site::Hospital).unwrap();
        assert_eq!(lesson.phase(), Phase::Placed);
        assert!(lesson.run_experiment().is_err());
        lesson.wait_for_signups().unwrap();
        assert!(lesson.place_sign(Site::Gym).is_err());
        lesson.run_experiment().unwrap();

        let LessonDetail::SelectionBias(detail) = lesson.detail() else {
            unreachable!();
        };
        let outcome = detail.outcome.unwrap();
        assert_eq!(outcome.signups, 15);
        assert_eq!(outcome.treatment_weight_change, 3.0);
        assert_eq!(detail.tested, [Site::Hospital]);
    }

    #[test]
    fn test_all_sites_required_to_advance() {
        let mut lesson = at_map();
        test_site(&mut lesson, Site::Mcdonalds);
        lesson.try_another_site().unwrap();
        test_site(&mut lesson, Site::Gym);
        assert!(matches!(
            lesson.advance(),
            Err(LessonError::AdvanceBlocked { .. })
        ));
        lesson.try_another_site().unwrap();
        test_site(&mut lesson, Site::Hospital);
        assert!(lesson.try_another_site().is_err());
        lesson.advance().unwrap();
        assert_eq!(lesson.progress().step(), TERMINAL_STEP);
    }

    #[test]
    fn test_retesting_a_site_counts_once() {
        let mut lesson = at_map();
        test_site(&mut lesson, Site::Gym);
        lesson.try_another_site().unwrap();
        test_site(&mut lesson, Site::Gym);
        assert!(!lesson.all_sites_tested());
    }

    #[test]
    fn test_reset_clears_experiments() {
        let mut lesson = at_map();
        test_site(&mut lesson, Site::Gym);
        lesson.reset();
        assert_eq!(lesson.phase(), Phase::Select);
        assert_eq!(lesson.detail(), SelectionBias::new().detail());
    }
}
