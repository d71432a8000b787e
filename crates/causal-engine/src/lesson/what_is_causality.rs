//! Lesson 1: the rifle mystery.
//!
//! A marksman's morning shots are scattered while his afternoon shots are
//! tight. The player unlocks four theories one step at a time and turns
//! each theory's dial to see whether the morning target improves. Only
//! cutting the pints to zero under the hangover theory solves the mystery
//! and unlocks the final step.

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    action::Action,
    dataset::{
        DatasetError,
        rifle::{self, AFTERNOON_HANGOVER_FACTOR, Dial, Session, Shot, Theory},
    },
};

use super::{
    Flags, Lesson, LessonDetail, LessonError, LessonId, Progress, SectionId, unsupported,
};

const TERMINAL_STEP: u8 = 9;
const SOLVE_STEP: u8 = 8;
const TARGETS_STEP: u8 = 5;

const SECTIONS: &[(u8, SectionId)] = &[
    (1, "intro"),
    (2, "pattern"),
    (3, "questions"),
    (4, "theories"),
    (TARGETS_STEP, "targets"),
    (TERMINAL_STEP, "big_lesson"),
];

const fn unlock_step(theory: Theory) -> u8 {
    match theory {
        Theory::Warmup => 5,
        Theory::Food => 6,
        Theory::Fatigue => 7,
        Theory::Hangover => SOLVE_STEP,
    }
}

const fn theory_name(theory: Theory) -> &'static str {
    match theory {
        Theory::Warmup => "warm-up theory",
        Theory::Food => "breakfast theory",
        Theory::Fatigue => "fatigue theory",
        Theory::Hangover => "hangover theory",
    }
}

#[derive(Debug, Clone)]
pub struct WhatIsCausality {
    progress: Progress,
    flags: Flags,
    active: Option<(Theory, u8)>,
}

impl Default for WhatIsCausality {
    fn default() -> Self {
        Self::new()
    }
}

impl WhatIsCausality {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Progress::new(TERMINAL_STEP),
            flags: Flags::new(&[]),
            active: None,
        }
    }

    #[must_use]
    pub fn active_theory(&self) -> Option<Theory> {
        self.active.map(|(theory, _)| theory)
    }

    #[must_use]
    pub fn dial_value(&self) -> Option<u8> {
        self.active.map(|(_, value)| value)
    }

    #[must_use]
    pub fn mystery_solved(&self) -> bool {
        self.active == Some((Theory::Hangover, 0))
    }

    fn select_theory(&mut self, theory: Theory) -> Result<(), LessonError> {
        self.progress
            .require(theory_name(theory), unlock_step(theory))?;
        self.active = Some((theory, theory.dial().default));
        debug!(%theory, "selected theory");
        Ok(())
    }

    fn set_dial(&mut self, value: u8) -> Result<(), LessonError> {
        let Some((theory, current)) = &mut self.active else {
            return Err(LessonError::InvalidState {
                reason: "pick a theory before turning its dial",
            });
        };
        let dial = theory.dial();
        if !dial.contains(value) {
            return Err(LessonError::OutOfRange {
                name: dial.label,
                value,
                min: dial.min,
                max: dial.max,
            });
        }
        *current = value;
        debug!(theory = %*theory, value, "turned dial");
        Ok(())
    }

    /// Shots for the current theory and dial. Without an active theory the
    /// marksman is hungover as usual.
    pub fn targets(&self) -> Result<Targets, DatasetError> {
        let (theory, value) = self.active.unwrap_or((Theory::Hangover, 0));
        let severity = match self.active {
            Some((theory, value)) => theory.hangover_severity(value),
            None => rifle::DEFAULT_HANGOVER_SEVERITY,
        };
        let morning = rifle::generate(Session::Morning, severity, theory, value)?;
        let afternoon = rifle::generate(
            Session::Afternoon,
            severity * AFTERNOON_HANGOVER_FACTOR,
            theory,
            value,
        )?;
        Ok(Targets {
            hangover_severity: severity,
            morning_score: rifle::accuracy_score(&morning).unwrap_or_default(),
            afternoon_score: rifle::accuracy_score(&afternoon).unwrap_or_default(),
            morning,
            afternoon,
        })
    }

    fn verdict(&self) -> Option<Verdict> {
        let (theory, value) = self.active?;
        let verdict = match theory {
            Theory::Warmup if value < 9 => Verdict::rejected(
                "Started work at 6 AM instead of 9 AM: morning accuracy is still terrible.",
            ),
            Theory::Warmup => Verdict::pending("Starting at 9 AM: poor morning accuracy."),
            Theory::Food if value >= 4 => Verdict::rejected(
                "Heavy breakfast before work: the morning is still bad.",
            ),
            Theory::Food if value == 0 => {
                Verdict::rejected("Skipped breakfast entirely: the morning is still bad.")
            }
            Theory::Food => Verdict::pending("Normal breakfast: poor morning accuracy."),
            Theory::Fatigue => Verdict::rejected(
                "If fatigue were the problem, the morning would be better than the afternoon.",
            ),
            Theory::Hangover if value == 0 => Verdict {
                text: "Both sessions are accurate: the hangover explains the mystery!",
                outcome: VerdictOutcome::Confirmed,
            },
            Theory::Hangover => {
                Verdict::pending("Heavy drinking: poor morning accuracy from the hangover.")
            }
        };
        Some(verdict)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictOutcome {
    Pending,
    Rejected,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub text: &'static str,
    pub outcome: VerdictOutcome,
}

impl Verdict {
    const fn pending(text: &'static str) -> Self {
        Self {
            text,
            outcome: VerdictOutcome::Pending,
        }
    }

    const fn rejected(text: &'static str) -> Self {
        Self {
            text,
            outcome: VerdictOutcome::Rejected,
        }
    }
}

/// Morning and afternoon shots for the current theory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Targets {
    pub hangover_severity: f64,
    pub morning: Vec<Shot>,
    pub afternoon: Vec<Shot>,
    pub morning_score: f64,
    pub afternoon_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DialState {
    #[serde(flatten)]
    pub dial: Dial,
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detail {
    pub unlocked_theories: Vec<Theory>,
    pub active_theory: Option<Theory>,
    pub dial: Option<DialState>,
    pub verdict: Option<Verdict>,
    pub targets: Option<Targets>,
    pub mystery_solved: bool,
}

impl Lesson for WhatIsCausality {
    fn id(&self) -> LessonId {
        LessonId::WhatIsCausality
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
        (self.progress.step() == SOLVE_STEP && !self.mystery_solved()).then_some(
            "try the hangover theory and turn the pints down to zero to solve the mystery",
        )
    }

    fn reset_state(&mut self) {
        self.active = None;
    }

    fn handle(&mut self, action: &Action) -> Result<(), LessonError> {
        match action {
            Action::SelectTheory { theory } => self.select_theory(*theory),
            Action::SetDial { value } => self.set_dial(*value),
            _ => Err(unsupported(self.id(), action)),
        }
    }

    fn detail(&self) -> LessonDetail {
        let step = self.progress.step();
        let targets = if step >= TARGETS_STEP {
            self.targets()
                .inspect_err(|err| warn!(%err, "failed to generate rifle shots"))
                .ok()
        } else {
            None
        };
        LessonDetail::WhatIsCausality(Detail {
            unlocked_theories: Theory::ALL
                .into_iter()
                .filter(|theory| unlock_step(*theory) <= step)
                .collect(),
            active_theory: self.active_theory(),
            dial: self.active.map(|(theory, value)| DialState {
                dial: theory.dial(),
                value,
            }),
            verdict: self.verdict(),
            targets,
            mystery_solved: self.mystery_solved(),
        })
    }
}
