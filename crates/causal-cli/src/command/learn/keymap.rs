//! Key bindings of the lesson screen.
//!
//! Keys are translated into [`Command`]s against the current lesson view,
//! so the same key can mean different actions in different lessons.

use causal_engine::{
    action::Action,
    dataset::rifle::Theory,
    lesson::{
        Flag, LessonDetail, LessonView, confounders::Instrument,
        difference_in_differences::ChartStage, randomized_experiments::Rollout,
        selection_bias::{Phase, Site},
    },
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::ui::widgets::{KeyBinding, KeyBindingDisplay};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Back to the lesson list.
    Back,
    Dispatch(Action),
    CursorUp,
    CursorDown,
    /// Selects the user under the cursor as treatment or control,
    /// depending on their tier.
    PickUser,
}

pub fn command_for_key(view: &LessonView, key: &KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(Command::Back),
        KeyCode::Char('n') | KeyCode::Right => return Some(Command::Dispatch(Action::Advance)),
        KeyCode::Char('r') => return Some(Command::Dispatch(Action::Reset)),
        KeyCode::Char('m') => return toggle(view, Flag::ShowMath),
        _ => {}
    }

    let action = match &view.detail {
        LessonDetail::WhatIsCausality(detail) => match key.code {
            KeyCode::Char('+' | '=') => detail
                .dial
                .filter(|dial| dial.value < dial.dial.max)
                .map(|dial| Action::SetDial {
                    value: dial.value + 1,
                }),
            KeyCode::Char('-') => detail
                .dial
                .filter(|dial| dial.value > dial.dial.min)
                .map(|dial| Action::SetDial {
                    value: dial.value - 1,
                }),
            code => pick(&Theory::ALL, code).map(|theory| Action::SelectTheory { theory }),
        },
        LessonDetail::SelectionBias(detail) => match key.code {
            KeyCode::Enter => match detail.phase {
                Phase::Select => None,
                Phase::Placed => Some(Action::WaitForSignups),
                Phase::Signup => Some(Action::RunExperiment),
                Phase::Results => Some(Action::TryAnotherSite),
            },
            code => pick(&Site::ALL, code).map(|site| Action::PlaceSign { site }),
        },
        LessonDetail::Confounders(_) => pick(&Instrument::ALL, key.code)
            .map(|instrument| Action::ChooseInstrument { instrument }),
        LessonDetail::RandomizedExperiments(_) => pick(&Rollout::CHOICES, key.code)
            .map(|rollout| Action::ChooseRollout { rollout }),
        LessonDetail::DifferenceInDifferences(_) => {
            pick(&ChartStage::ALL, key.code).map(|stage| Action::ShowStage { stage })
        }
        LessonDetail::CoarsenedExactMatching(_) => match key.code {
            KeyCode::Char('i') => return toggle(view, Flag::RevealIssue),
            KeyCode::Char('v') => return toggle(view, Flag::ShowNaive),
            KeyCode::Char('b') => return toggle(view, Flag::ShowBuckets),
            KeyCode::Up => return Some(Command::CursorUp),
            KeyCode::Down => return Some(Command::CursorDown),
            KeyCode::Tab | KeyCode::Char(' ') => return Some(Command::PickUser),
            KeyCode::Enter => Some(Action::ConfirmMatch),
            _ => None,
        },
    };
    action.map(Command::Dispatch)
}

/// Flips a flag the lesson supports; locked flags are left to the lesson to
/// reject.
fn toggle(view: &LessonView, flag: Flag) -> Option<Command> {
    let state = view.flags.iter().find(|state| state.flag == flag)?;
    Some(Command::Dispatch(Action::SetFlag {
        flag,
        value: !state.enabled,
    }))
}

/// The option numbered by a digit key, counting from 1.
fn pick<T: Copy>(options: &[T], code: KeyCode) -> Option<T> {
    let KeyCode::Char(c) = code else {
        return None;
    };
    let index = usize::try_from(c.to_digit(10)?).ok()?.checked_sub(1)?;
    options.get(index).copied()
}

fn supports(view: &LessonView, flag: Flag) -> bool {
    view.flags.iter().any(|state| state.flag == flag && state.unlocked)
}

const NEXT: KeyBinding = (&["n", "→"], "next");
const MATH: KeyBinding = (&["m"], "math");
const RESET: KeyBinding = (&["r"], "reset");
const BACK: KeyBinding = (&["q", "Esc"], "back");

const RIFLE_KEYS: &[KeyBinding] = &[(&["1-4"], "theory"), (&["+", "-"], "dial")];
const CITY_MAP_KEYS: &[KeyBinding] = &[(&["1-3"], "sign"), (&["Enter"], "continue")];
const INSTRUMENT_KEYS: &[KeyBinding] = &[(&["1-3"], "instrument")];
const ROLLOUT_KEYS: &[KeyBinding] = &[(&["1-3"], "rollout")];
const STAGE_KEYS: &[KeyBinding] = &[(&["1-4"], "chart stage")];
const CHURN_KEYS: &[KeyBinding] = &[(&["i"], "issue"), (&["v"], "naive"), (&["b"], "buckets")];
const MATCHING_KEYS: &[KeyBinding] = &[
    (&["↑", "↓"], "select"),
    (&["Tab"], "pick user"),
    (&["Enter"], "save match"),
    (&["b"], "buckets"),
];

/// Help line for the lesson screen.
pub fn key_bindings(view: &LessonView) -> KeyBindingDisplay {
    let lesson_keys = match &view.detail {
        LessonDetail::WhatIsCausality(_) => RIFLE_KEYS,
        LessonDetail::SelectionBias(_) => CITY_MAP_KEYS,
        LessonDetail::Confounders(_) => INSTRUMENT_KEYS,
        LessonDetail::RandomizedExperiments(_) => ROLLOUT_KEYS,
        LessonDetail::DifferenceInDifferences(_) => STAGE_KEYS,
        LessonDetail::CoarsenedExactMatching(detail) if detail.matching.is_some() => MATCHING_KEYS,
        LessonDetail::CoarsenedExactMatching(_) => CHURN_KEYS,
    };
    KeyBindingDisplay::new([NEXT])
        .extend(lesson_keys.iter().copied())
        .with_if(supports(view, Flag::ShowMath), MATH)
        .extend([RESET, BACK])
}

#[cfg(test)]
mod tests {
    use causal_engine::{course::Course, lesson::LessonId};
    use crossterm::event::KeyModifiers;

    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn view_at(lesson: LessonId, steps: u8) -> LessonView {
        let mut course = Course::new();
        course.enter(lesson);
        for _ in 1..steps {
            course.dispatch(&Action::Advance).unwrap();
        }
        course.lesson(lesson).unwrap().view()
    }

    #[test]
    fn test_global_keys() {
        let view = view_at(LessonId::Confounders, 1);
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Esc)),
            Some(Command::Back)
        );
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Right)),
            Some(Command::Dispatch(Action::Advance))
        );
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Char('m'))),
            Some(Command::Dispatch(Action::SetFlag {
                flag: Flag::ShowMath,
                value: true
            }))
        );
    }

    #[test]
    fn test_key_release_is_ignored() {
        let view = view_at(LessonId::Confounders, 1);
        let release =
            KeyEvent::new_with_kind(KeyCode::Char('q'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(command_for_key(&view, &release), None);
    }

    #[test]
    fn test_digits_pick_lesson_options() {
        let view = view_at(LessonId::RandomizedExperiments, 2);
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Char('3'))),
            Some(Command::Dispatch(Action::ChooseRollout {
                rollout: Rollout::Randomized
            }))
        );
        assert_eq!(command_for_key(&view, &press(KeyCode::Char('4'))), None);
        assert_eq!(command_for_key(&view, &press(KeyCode::Char('0'))), None);

        let view = view_at(LessonId::DifferenceInDifferences, 1);
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Char('4'))),
            Some(Command::Dispatch(Action::ShowStage {
                stage: ChartStage::FullDid
            }))
        );
    }

    fn current(course: &Course, lesson: LessonId) -> LessonView {
        course.lesson(lesson).unwrap().view()
    }

    #[test]
    fn test_enter_follows_the_experiment_phase() {
        let lesson = LessonId::SelectionBias;
        let mut course = Course::new();
        course.enter(lesson);
        course.dispatch(&Action::Advance).unwrap();
        course.dispatch(&Action::Advance).unwrap();
        let enter = press(KeyCode::Enter);
        assert_eq!(command_for_key(&current(&course, lesson), &enter), None);

        assert_eq!(
            command_for_key(&current(&course, lesson), &press(KeyCode::Char('2'))),
            Some(Command::Dispatch(Action::PlaceSign { site: Site::Gym }))
        );
        course.dispatch(&Action::PlaceSign { site: Site::Gym }).unwrap();
        assert_eq!(
            command_for_key(&current(&course, lesson), &enter),
            Some(Command::Dispatch(Action::WaitForSignups))
        );
    }

    #[test]
    fn test_dial_stays_in_range() {
        let view = view_at(LessonId::WhatIsCausality, 8);
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Char('4'))),
            Some(Command::Dispatch(Action::SelectTheory {
                theory: Theory::Hangover
            }))
        );

        let lesson = LessonId::WhatIsCausality;
        let mut course = Course::new();
        course.enter(lesson);
        for _ in 1..8 {
            course.dispatch(&Action::Advance).unwrap();
        }
        course
            .dispatch(&Action::SelectTheory {
                theory: Theory::Hangover,
            })
            .unwrap();
        course.dispatch(&Action::SetDial { value: 8 }).unwrap();
        let view = current(&course, lesson);
        assert_eq!(command_for_key(&view, &press(KeyCode::Char('+'))), None);
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Char('-'))),
            Some(Command::Dispatch(Action::SetDial { value: 7 }))
        );
        assert_eq!(command_for_key(&view, &press(KeyCode::Char('m'))), None);
    }

    #[test]
    fn test_matching_keys() {
        let view = view_at(LessonId::CoarsenedExactMatching, 1);
        assert!(key_bindings(&view).line_text().contains("naive"));
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Char('b'))),
            Some(Command::Dispatch(Action::SetFlag {
                flag: Flag::ShowBuckets,
                value: true
            }))
        );
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Tab)),
            Some(Command::PickUser)
        );
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Down)),
            Some(Command::CursorDown)
        );
        assert_eq!(
            command_for_key(&view, &press(KeyCode::Enter)),
            Some(Command::Dispatch(Action::ConfirmMatch))
        );
    }
}
