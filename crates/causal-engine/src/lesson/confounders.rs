//! Lesson 3: classroom hours and grades.
//!
//! Students who spend more hours in class get better grades, but
//! motivation, teacher quality and family support drive both. A school
//! rule that forces extra hours is an instrument: it moves hours without
//! touching the confounders, so the rule cohort carries the much smaller
//! true effect of an extra hour.

use serde::{Deserialize, Serialize};
use tracing::debug;

use causal_stats::{
    descriptive::DescriptiveStats,
    effect::wald_ratio,
    regression::{LinearFit, correlation},
};

use crate::{
    action::Action,
    dataset::classroom::{self, ClassroomParams, StudentRecord},
};

use super::{
    Flag, Flags, Lesson, LessonDetail, LessonError, LessonId, Progress, SectionId, unsupported,
};

const TERMINAL_STEP: u8 = 8;
const EXAMPLE_STEP: u8 = 2;
const QUIZ_STEP: u8 = 5;
const HINT_STEP: u8 = 6;
const COMPARISON_STEP: u8 = 7;

const SECTIONS: &[(u8, SectionId)] = &[
    (1, "core_question"),
    (EXAMPLE_STEP, "classroom_example"),
    (3, "full_story"),
    (4, "instrument"),
    (QUIZ_STEP, "pick_instrument"),
    (HINT_STEP, "before_after"),
    (HINT_STEP, "instrument_hint"),
    (COMPARISON_STEP, "visual_comparison"),
    (TERMINAL_STEP, "scatter_explanation"),
];

const FLAGS: &[(Flag, u8)] = &[(Flag::ShowMath, TERMINAL_STEP)];

/// Points on each trend line.
const TREND_POINTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    #[display("student motivation")]
    Motivation,
    #[display("a new school rule requiring extra class hours")]
    SchoolRule,
    #[display("teacher quality")]
    TeacherQuality,
}

impl Instrument {
    pub const ALL: [Self; 3] = [Self::Motivation, Self::SchoolRule, Self::TeacherQuality];

    #[must_use]
    pub const fn feedback(self) -> InstrumentFeedback {
        match self {
            Self::Motivation => InstrumentFeedback {
                correct: false,
                text: "Motivation is a confounder: it affects both classroom hours and grades.",
            },
            Self::SchoolRule => InstrumentFeedback {
                correct: true,
                text: "The rule changes classroom hours without directly changing grades.",
            },
            Self::TeacherQuality => InstrumentFeedback {
                correct: false,
                text: "Teacher quality is a confounder: it affects both classroom hours and grades.",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstrumentFeedback {
    pub correct: bool,
    pub text: &'static str,
}

#[derive(Debug, Clone)]
pub struct Confounders {
    progress: Progress,
    flags: Flags,
    observational: Vec<StudentRecord>,
    rule_cohort: Vec<StudentRecord>,
    instrument: Option<Instrument>,
}

impl Default for Confounders {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_cohorts() -> (Vec<StudentRecord>, Vec<StudentRecord>) {
    let observational = classroom::generate(
        &ClassroomParams::observational(),
        ClassroomParams::OBSERVATIONAL_SEED,
    )
    .expect("observational preset should be valid");
    let rule_cohort = classroom::generate(
        &ClassroomParams::rule_cohort(),
        ClassroomParams::RULE_COHORT_SEED,
    )
    .expect("rule cohort preset should be valid");
    (observational, rule_cohort)
}

impl Confounders {
    #[must_use]
    pub fn new() -> Self {
        let (observational, rule_cohort) = generate_cohorts();
        Self {
            progress: Progress::new(TERMINAL_STEP),
            flags: Flags::new(FLAGS),
            observational,
            rule_cohort,
            instrument: None,
        }
    }

    #[must_use]
    pub fn observational(&self) -> &[StudentRecord] {
        &self.observational
    }

    #[must_use]
    pub fn rule_cohort(&self) -> &[StudentRecord] {
        &self.rule_cohort
    }

    fn choose_instrument(&mut self, instrument: Instrument) -> Result<(), LessonError> {
        self.progress.require("the instrument quiz", QUIZ_STEP)?;
        self.instrument = Some(instrument);
        debug!(%instrument, correct = instrument.feedback().correct, "chose instrument");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSummary {
    /// `(classroom_hours, grade)` pairs.
    pub points: Vec<(f64, f64)>,
    pub hours: Option<DescriptiveStats>,
    pub grades: Option<DescriptiveStats>,
    pub correlation: Option<f64>,
    pub fit: Option<LinearFit>,
    pub trend_line: Vec<(f64, f64)>,
}

impl CohortSummary {
    fn new(records: &[StudentRecord], with_fit: bool) -> Self {
        let (hours, grades) = classroom::hours_and_grades(records);
        let fit = with_fit.then(|| LinearFit::new(&hours, &grades)).flatten();
        Self {
            hours: DescriptiveStats::new(hours.iter().copied()),
            grades: DescriptiveStats::new(grades.iter().copied()),
            correlation: correlation(&hours, &grades),
            trend_line: fit.map(|f| f.trend_line(TREND_POINTS)).unwrap_or_default(),
            fit,
            points: hours.into_iter().zip(grades).collect(),
        }
    }
}

/// A "grade difference over hours difference" calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkedRatio {
    pub high_grade: f64,
    pub low_grade: f64,
    pub high_hours: f64,
    pub low_hours: f64,
    pub points_per_hour: Option<f64>,
}

impl WorkedRatio {
    fn new(high_grade: f64, low_grade: f64, high_hours: f64, low_hours: f64) -> Self {
        Self {
            high_grade,
            low_grade,
            high_hours,
            low_hours,
            points_per_hour: wald_ratio(high_grade - low_grade, high_hours - low_hours),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MathCorner {
    /// High- versus low-attendance students.
    pub naive: WorkedRatio,
    /// Rule group versus no-rule group.
    pub instrument: WorkedRatio,
}

impl MathCorner {
    fn new() -> Self {
        Self {
            naive: WorkedRatio::new(85.0, 70.0, 10.0, 5.0),
            instrument: WorkedRatio::new(78.0, 74.0, 8.0, 6.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detail {
    pub instrument: Option<Instrument>,
    pub feedback: Option<InstrumentFeedback>,
    pub observational: Option<CohortSummary>,
    pub rule_cohort: Option<CohortSummary>,
    pub math: Option<MathCorner>,
}

impl Lesson for Confounders {
    fn id(&self) -> LessonId {
        LessonId::Confounders
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

    fn reset_state(&mut self) {
        (self.observational, self.rule_cohort) = generate_cohorts();
        self.instrument = None;
    }

    fn handle(&mut self, action: &Action) -> Result<(), LessonError> {
        match action {
            Action::ChooseInstrument { instrument } => self.choose_instrument(*instrument),
            _ => Err(unsupported(self.id(), action)),
        }
    }

    fn detail(&self) -> LessonDetail {
        let step = self.progress.step();
        let compare = step >= COMPARISON_STEP;
        LessonDetail::Confounders(Detail {
            instrument: self.instrument,
            feedback: self.instrument.map(Instrument::feedback),
            observational: (step >= EXAMPLE_STEP)
                .then(|| CohortSummary::new(&self.observational, compare)),
            rule_cohort: compare.then(|| CohortSummary::new(&self.rule_cohort, true)),
            math: self
                .flags
                .is_enabled(Flag::ShowMath)
                .then(MathCorner::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(lesson: &Confounders) -> Detail {
        let LessonDetail::Confounders(detail) = lesson.detail() else {
            unreachable!();
        };
        detail
    }

    #[test]
    fn test_quiz_unlocks_at_step_five() {
        let mut lesson = Confounders::new();
        assert!(matches!(
            lesson.choose_instrument(Instrument::SchoolRule),
            Err(LessonError::Locked { unlock_step: 5, .. })
        ));
        lesson.progress.advance_to(QUIZ_STEP);
        lesson.choose_instrument(Instrument::Motivation).unwrap();
        assert!(!detail(&lesson).feedback.unwrap().correct);
        lesson.choose_instrument(Instrument::SchoolRule).unwrap();
        assert!(detail(&lesson).feedback.unwrap().correct);
    }

    #[test]
    fn test_only_school_rule_is_an_instrument() {
        let correct = Instrument::ALL
            .into_iter()
            .filter(|i| i.feedback().correct)
            .collect::<Vec<_>>();
        assert_eq!(correct, [Instrument::SchoolRule]);
    }

    #[test]
    fn test_metrics_follow_steps() {
        let mut lesson = Confounders::new();
        assert!(detail(&lesson).observational.is_none());

        lesson.advance().unwrap();
        let observational = detail(&lesson).observational.unwrap();
        assert_eq!(observational.points.len(), 500);
        assert!(observational.correlation.unwrap() > 0.0);
        assert!(observational.fit.is_none());

        lesson.progress.advance_to(COMPARISON_STEP);
        let detail = detail(&lesson);
        assert!(detail.observational.unwrap().fit.is_some());
        let rule = detail.rule_cohort.unwrap();
        assert!(rule.fit.is_some());
        assert_eq!(rule.trend_line.len(), TREND_POINTS);
        let rule_hours = rule.hours.unwrap();
        assert_eq!(rule_hours.count, 500);
        assert!(rule_hours.mean > 40.0);
        assert!(rule_hours.max <= 45.0);
        let observational_hours = observational.hours.unwrap();
        assert!(rule_hours.mean > observational_hours.mean);
        assert!(rule.grades.unwrap().std_dev > 0.0);
    }

    #[test]
    fn test_math_corner() {
        let mut lesson = Confounders::new();
        assert!(lesson.set_flag(Flag::ShowMath, true).is_err());
        lesson.progress.advance_to(TERMINAL_STEP);
        lesson.set_flag(Flag::ShowMath, true).unwrap();
        let math = detail(&lesson).math.unwrap();
        assert_eq!(math.naive.points_per_hour, Some(3.0));
        assert_eq!(math.instrument.points_per_hour, Some(2.0));
    }

    #[test]
    fn test_reset_regenerates_identical_data() {
        let mut lesson = Confounders::new();
        let first = lesson.observational().to_vec();
        lesson.progress.advance_to(TERMINAL_STEP);
        lesson.set_flag(Flag::ShowMath, true).unwrap();
        lesson.reset();
        assert_eq!(lesson.observational(), first);
        assert_eq!(lesson.progress().step(), 1);
        assert!(!lesson.flags().is_enabled(Flag::ShowMath));
    }
}
