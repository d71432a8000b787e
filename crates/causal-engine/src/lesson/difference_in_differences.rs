//! Lesson 5: a staggered territory rollout.
//!
//! Territory A ships a feature two years before territory B. Retention in
//! A jumps after the rollout, but both territories were already trending
//! upward. The chart is revealed in four stages, ending with the
//! difference-in-differences estimate that removes the shared trend.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    action::Action,
    dataset::territory::{BASELINE_YEAR, FINAL_YEAR, TerritorySeries},
};

use super::{
    Flag, Flags, Lesson, LessonDetail, LessonError, LessonId, Progress, SectionId, unsupported,
};

const TERMINAL_STEP: u8 = 6;
const INTERACTIVE_STEP: u8 = 5;

const SECTIONS: &[(u8, SectionId)] = &[
    (1, "recap"),
    (2, "motivation"),
    (3, "scenario"),
    (4, "instructions"),
    (INTERACTIVE_STEP, "interactive"),
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
pub enum ChartStage {
    /// Years 1-2 only: both territories move in parallel.
    #[display("parallel trends")]
    Parallel,
    /// Territory A through year 4, B still stops at year 2.
    #[display("the spike")]
    Spike,
    /// Both territories through year 4.
    #[display("reveal the trend")]
    RevealTrend,
    /// Both territories with the difference-in-differences annotation.
    #[display("full difference-in-differences")]
    FullDid,
}

impl ChartStage {
    pub const ALL: [Self; 4] = [Self::Parallel, Self::Spike, Self::RevealTrend, Self::FullDid];

    /// Last year shown for `(territory A, territory B)`.
    const fn last_years(self) -> (u32, u32) {
        match self {
            Self::Parallel => (BASELINE_YEAR, BASELINE_YEAR),
            Self::Spike => (FINAL_YEAR, BASELINE_YEAR),
            Self::RevealTrend | Self::FullDid => (FINAL_YEAR, FINAL_YEAR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: &'static str,
    /// `(year, retention)` points.
    pub points: Vec<(u32, f64)>,
}

fn series(label: &'static str, years: &[u32], values: &[f64], last_year: u32) -> Series {
    Series {
        label,
        points: years
            .iter()
            .copied()
            .zip(values.iter().copied())
            .filter(|(year, _)| *year <= last_year)
            .collect(),
    }
}

#[derive(Debug, Clone)]
pub struct DifferenceInDifferences {
    progress: Progress,
    flags: Flags,
    data: TerritorySeries,
    stage: ChartStage,
}

impl Default for DifferenceInDifferences {
    fn default() -> Self {
        Self::new()
    }
}

impl DifferenceInDifferences {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Progress::new(TERMINAL_STEP),
            flags: Flags::new(FLAGS),
            data: TerritorySeries::generate(),
            stage: ChartStage::Parallel,
        }
    }

    #[must_use]
    pub fn stage(&self) -> ChartStage {
        self.stage
    }

    fn show_stage(&mut self, stage: ChartStage) -> Result<(), LessonError> {
        self.progress.require("the interactive chart", INTERACTIVE_STEP)?;
        self.stage = stage;
        debug!(%stage, "showing chart stage");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detail {
    /// `None` until the interactive chart is unlocked.
    pub stage: Option<ChartStage>,
    pub series: Vec<Series>,
    /// Territory A change from year 2 to 4, shown from the spike on.
    pub naive_effect: Option<f64>,
    /// Territory B change over the same years.
    pub control_change: Option<f64>,
    pub difference_in_differences: Option<f64>,
    pub show_math: bool,
}

impl Lesson for DifferenceInDifferences {
    fn id(&self) -> LessonId {
        LessonId::DifferenceInDifferences
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
        self.data = TerritorySeries::generate();
        self.stage = ChartStage::Parallel;
    }

    fn handle(&mut self, action: &Action) -> Result<(), LessonError> {
        match action {
            Action::ShowStage { stage } => self.show_stage(*stage),
            _ => Err(unsupported(self.id(), action)),
        }
    }

    fn detail(&self) -> LessonDetail {
        let show_math = self.flags.is_enabled(Flag::ShowMath);
        if self.progress.step() < INTERACTIVE_STEP {
            return LessonDetail::DifferenceInDifferences(Detail {
                stage: None,
                series: Vec::new(),
                naive_effect: None,
                control_change: None,
                difference_in_differences: None,
                show_math,
            });
        }

        let stage = self.stage;
        let (treated_last, control_last) = stage.last_years();
        let data = &self.data;
        LessonDetail::DifferenceInDifferences(Detail {
            stage: Some(stage),
            series: vec![
                series("Territory A", &data.years, &data.treated, treated_last),
                series("Territory B", &data.years, &data.control, control_last),
            ],
            naive_effect: (stage >= ChartStage::Spike)
                .then(|| data.treated_change(BASELINE_YEAR, FINAL_YEAR))
                .flatten(),
            control_change: (stage >= ChartStage::RevealTrend)
                .then(|| data.control_change(BASELINE_YEAR, FINAL_YEAR))
                .flatten(),
            difference_in_differences: (stage == ChartStage::FullDid)
                .then(|| data.difference_in_differences(BASELINE_YEAR, FINAL_YEAR))
                .flatten(),
            show_math,
        })
    }
}
