//! The course: lesson list, active lesson and action dispatch.
//!
//! The course owns one state per visited lesson. Leaving a lesson keeps its
//! state, so coming back resumes at the same step.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    action::Action,
    lesson::{Lesson, LessonError, LessonId, LessonView},
};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum CourseError {
    #[display("{action} needs an open lesson")]
    NoActiveLesson { action: &'static str },
    #[display("{_0}")]
    #[from]
    Lesson(LessonError),
}

impl CourseError {
    /// Stable machine-readable name of the error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoActiveLesson { .. } => "no_active_lesson",
            Self::Lesson(err) => err.kind(),
        }
    }
}

/// One row of the lesson list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonSummary {
    pub id: LessonId,
    pub ordinal: usize,
    pub title: &'static str,
    /// `None` if the lesson was never opened.
    pub step: Option<u8>,
    pub terminal_step: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum CourseView {
    Home { lessons: Vec<LessonSummary> },
    Lesson(LessonView),
}

#[derive(Debug, Default)]
pub struct Course {
    lessons: BTreeMap<LessonId, Box<dyn Lesson>>,
    active: Option<LessonId>,
}

impl Course {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The open lesson; `None` on the home screen.
    #[must_use]
    pub fn active(&self) -> Option<LessonId> {
        self.active
    }

    /// State of a lesson that has been opened at least once.
    #[must_use]
    pub fn lesson(&self, id: LessonId) -> Option<&dyn Lesson> {
        self.lessons.get(&id).map(AsRef::as_ref)
    }

    /// Opens a lesson, creating it on the first visit.
    pub fn enter(&mut self, id: LessonId) -> &mut dyn Lesson {
        self.active = Some(id);
        info!(lesson = %id, "entered lesson");
        self.lessons.entry(id).or_insert_with(|| id.create()).as_mut()
    }

    /// Back to the lesson list. Lesson progress is kept.
    pub fn leave(&mut self) {
        if let Some(id) = self.active.take() {
            info!(lesson = %id, "left lesson");
        }
    }

    fn active_lesson_mut(&mut self) -> Option<&mut Box<dyn Lesson>> {
        let id = self.active?;
        self.lessons.get_mut(&id)
    }

    /// Applies an action and returns the resulting view.
    ///
    /// On error nothing has changed.
    pub fn dispatch(&mut self, action: &Action) -> Result<CourseView, CourseError> {
        let result = match action {
            Action::Enter { lesson } => {
                self.enter(*lesson);
                Ok(())
            }
            Action::Home => {
                self.leave();
                Ok(())
            }
            _ => match self.active_lesson_mut() {
                Some(lesson) => lesson.apply(action).map_err(CourseError::from),
                None => Err(CourseError::NoActiveLesson {
                    action: action.name(),
                }),
            },
        };
        match result {
            Ok(()) => Ok(self.view()),
            Err(err) => {
                debug!(action = action.name(), kind = err.kind(), %err, "rejected action");
                Err(err)
            }
        }
    }

    /// Dispatches an action and wraps the outcome for the wire.
    pub fn respond(&mut self, action: &Action) -> Response {
        match self.dispatch(action) {
            Ok(view) => Response {
                ok: true,
                error: None,
                view,
            },
            Err(err) => Response {
                ok: false,
                error: Some(ErrorReport::from(&err)),
                view: self.view(),
            },
        }
    }

    #[must_use]
    pub fn view(&self) -> CourseView {
        match self.active.and_then(|id| self.lessons.get(&id)) {
            Some(lesson) => CourseView::Lesson(lesson.view()),
            None => CourseView::Home {
                lessons: self.summaries(),
            },
        }
    }

    /// Every lesson in course order, with its progress if opened.
    #[must_use]
    pub fn summaries(&self) -> Vec<LessonSummary> {
        LessonId::ALL
            .into_iter()
            .map(|id| {
                let progress = self.lessons.get(&id).map(|l| l.progress());
                LessonSummary {
                    id,
                    ordinal: id.ordinal(),
                    title: id.title(),
                    step: progress.map(|p| p.step()),
                    terminal_step: progress.map(|p| p.terminal()),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}

impl From<&CourseError> for ErrorReport {
    fn from(err: &CourseError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Reply to one dispatched action. `view` is always the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub ok: bool,
    pub error: Option<ErrorReport>,
    pub view: CourseView,
}

#[cfg(test)]
mod tests {
    use crate::lesson::Flag;

    use super::*;

    fn lesson_view(view: CourseView) -> LessonView {
        let CourseView::Lesson(view) = view else {
            panic!("expected a lesson view");
        };
        view
    }

    #[test]
    fn test_lesson_actions_need_an_open_lesson() {
        let mut course = Course::new();
        assert_eq!(
            course.dispatch(&Action::Advance),
            Err(CourseError::NoActiveLesson { action: "advance" })
        );
        let CourseView::Home { lessons } = course.view() else {
            panic!("expected the home view");
        };
        assert_eq!(lessons.len(), 6);
        assert!(lessons.iter().all(|l| l.step.is_none()));
    }

    #[test]
    fn test_progress_survives_leaving() {
        let mut course = Course::new();
        course
            .dispatch(&Action::Enter {
                lesson: LessonId::Confounders,
            })
            .unwrap();
        course.dispatch(&Action::Advance).unwrap();
        course.dispatch(&Action::Advance).unwrap();
        course.dispatch(&Action::Home).unwrap();
        assert_eq!(course.active(), None);

        let CourseView::Home { lessons } = course.view() else {
            panic!("expected the home view");
        };
        assert_eq!(lessons[2].step, Some(3));

        let view = lesson_view(
            course
                .dispatch(&Action::Enter {
                    lesson: LessonId::Confounders,
                })
                .unwrap(),
        );
        assert_eq!(view.step, 3);
    }

    #[test]
    fn test_rejected_action_leaves_state_unchanged() {
        let mut course = Course::new();
        course.enter(LessonId::CoarsenedExactMatching);
        let before = course.view();
        let err = course
            .dispatch(&Action::SetFlag {
                flag: Flag::ShowBuckets,
                value: true,
            })
            .unwrap_err();
        assert_eq!(err.kind(), "locked");
        assert_eq!(course.view(), before);

        let err = course
            .dispatch(&Action::ChooseRollout {
                rollout: crate::lesson::randomized_experiments::Rollout::Randomized,
            })
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported_action");
        assert_eq!(course.view(), before);
    }

    #[test]
    fn test_response_json() {
        let mut course = Course::new();
        let response = course.respond(&Action::ConfirmMatch);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["kind"], "no_active_lesson");
        assert_eq!(json["view"]["screen"], "home");

        let response = course.respond(&Action::Enter {
            lesson: LessonId::DifferenceInDifferences,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], true);
        assert!(json["error"].is_null());
        assert_eq!(json["view"]["screen"], "lesson");
        assert_eq!(json["view"]["id"], "difference_in_differences");
        assert_eq!(json["view"]["detail"]["kind"], "difference_in_differences");
        assert_eq!(json["view"]["sections"][0], "recap");
    }

    #[test]
    fn test_full_matching_session() {
        let mut course = Course::new();
        course.enter(LessonId::CoarsenedExactMatching);
        for _ in 1..9 {
            course.dispatch(&Action::Advance).unwrap();
        }
        let select = |id: &str| {
            if id.starts_with('P') {
                Action::SelectTreatment { id: id.to_owned() }
            } else {
                Action::SelectControl { id: id.to_owned() }
            }
        };
        course.dispatch(&select("P1")).unwrap();
        course.dispatch(&select("F3")).unwrap();
        let err = course.dispatch(&Action::ConfirmMatch).unwrap_err();
        assert_eq!(err.kind(), "imperfect_match_save");

        for (treatment, control) in [
            ("P1", "F1"),
            ("P2", "F3"),
            ("P3", "F6"),
            ("P4", "F4"),
            ("P5", "F8"),
        ] {
            course.dispatch(&select(treatment)).unwrap();
            course.dispatch(&select(control)).unwrap();
            course.dispatch(&Action::ConfirmMatch).unwrap();
        }
        let view = lesson_view(course.dispatch(&Action::Advance).unwrap());
        assert_eq!(view.step, 10);
        assert!(view.sections.contains(&"final_results"));
    }
}
