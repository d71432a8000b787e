//! User actions.
//!
//! Actions are encoded as adjacently tagged JSON objects:
//!
//! ```json
//! {"action": "enter", "payload": {"lesson": "coarsened_exact_matching"}}
//! {"action": "advance"}
//! {"action": "select_treatment", "payload": {"id": "P1"}}
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    dataset::rifle::Theory,
    lesson::{
        Flag, LessonId, confounders::Instrument, difference_in_differences::ChartStage,
        randomized_experiments::Rollout, selection_bias::Site,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum Action {
    /// Opens a lesson, creating it on the first visit.
    Enter { lesson: LessonId },
    /// Returns to the lesson list; lesson progress is kept.
    Home,
    Advance,
    Reset,
    SetFlag { flag: Flag, value: bool },
    SelectTheory { theory: Theory },
    SetDial { value: u8 },
    PlaceSign { site: Site },
    WaitForSignups,
    RunExperiment,
    TryAnotherSite,
    ChooseInstrument { instrument: Instrument },
    ChooseRollout { rollout: Rollout },
    ShowStage { stage: ChartStage },
    SelectTreatment { id: String },
    SelectControl { id: String },
    ConfirmMatch,
}

impl Action {
    /// The `action` tag of this action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Enter { .. } => "enter",
            Self::Home => "home",
            Self::Advance => "advance",
            Self::Reset => "reset",
            Self::SetFlag { .. } => "set_flag",
            Self::SelectTheory { .. } => "select_theory",
            Self::SetDial { .. } => "set_dial",
            Self::PlaceSign { .. } => "place_sign",
            Self::WaitForSignups => "wait_for_signups",
            Self::RunExperiment => "run_experiment",
            Self::TryAnotherSite => "try_another_site",
            Self::ChooseInstrument { .. } => "choose_instrument",
            Self::ChooseRollout { .. } => "choose_rollout",
            Self::ShowStage { .. } => "show_stage",
            Self::SelectTreatment { .. } => "select_treatment",
            Self::SelectControl { .. } => "select_control",
            Self::ConfirmMatch => "confirm_match",
        }
    }
}
