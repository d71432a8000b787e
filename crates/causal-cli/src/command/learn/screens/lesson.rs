use causal_engine::{
    action::Action,
    course::Course,
    dataset::churn::Tier,
    lesson::{LessonDetail, LessonId, LessonView},
};
use crossterm::event::Event;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Spacing},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, Paragraph, Wrap},
};
use tracing::debug;

use crate::{
    command::learn::keymap::{self, Command},
    tui::{Screen, ScreenTransition},
    ui::{
        captions,
        widgets::{LessonDetailDisplay, style},
    },
};

/// One open lesson: its sections, interactive detail and status line.
#[derive(Debug)]
pub struct LessonScreen {
    lesson: LessonId,
    /// Row of the matching pool under the cursor.
    cursor: usize,
    /// Message of the last rejected action.
    error: Option<String>,
}

impl LessonScreen {
    #[must_use]
    pub fn new(lesson: LessonId) -> Self {
        Self {
            lesson,
            cursor: 0,
            error: None,
        }
    }

    fn current_view(&self, course: &Course) -> Option<LessonView> {
        course.lesson(self.lesson).map(|lesson| lesson.view())
    }

    fn dispatch(&mut self, course: &mut Course, action: &Action) {
        match course.dispatch(action) {
            Ok(_) => {
                self.error = None;
                if *action == Action::Reset {
                    self.cursor = 0;
                }
            }
            Err(err) => {
                debug!(%err, "showing rejected action");
                self.error = Some(err.to_string());
            }
        }
    }

    fn pool_len(view: &LessonView) -> usize {
        match &view.detail {
            LessonDetail::CoarsenedExactMatching(detail) => {
                detail.matching.as_ref().map_or(0, |m| m.pool.len())
            }
            _ => 0,
        }
    }

    /// Action selecting the user under the cursor for the matching role of
    /// their tier.
    fn pick_user(&self, view: &LessonView) -> Option<Action> {
        let LessonDetail::CoarsenedExactMatching(detail) = &view.detail else {
            return None;
        };
        let entry = detail.matching.as_ref()?.pool.get(self.cursor)?;
        let id = entry.user.id.clone();
        Some(match entry.user.tier {
            Tier::Premium => Action::SelectTreatment { id },
            Tier::Free => Action::SelectControl { id },
        })
    }

    fn status_line(&self, view: &LessonView) -> Line<'static> {
        if let Some(error) = &self.error {
            return Line::styled(error.clone(), style::WRONG);
        }
        if let Some(hint) = view.advance_hint {
            return Line::styled(hint, style::PENDING);
        }
        if view.step >= view.terminal_step {
            return Line::styled("Lesson complete. Press q to go back.", style::CORRECT);
        }
        Line::styled("Press n to continue.", style::HINT)
    }
}

impl Screen for LessonScreen {
    fn on_active(&mut self, course: &mut Course) {
        course.enter(self.lesson);
    }

    fn on_close(&mut self, course: &mut Course) {
        course.leave();
    }

    fn handle_event(&mut self, course: &mut Course, event: &Event) -> ScreenTransition {
        let Some(key) = event.as_key_event() else {
            return ScreenTransition::Stay;
        };
        let Some(view) = self.current_view(course) else {
            return ScreenTransition::Pop;
        };
        let Some(command) = keymap::command_for_key(&view, &key) else {
            return ScreenTransition::Stay;
        };

        match command {
            Command::Back => return ScreenTransition::Pop,
            Command::Dispatch(action) => self.dispatch(course, &action),
            Command::CursorUp => {
                let len = Self::pool_len(&view);
                if len > 0 {
                    self.cursor = self.cursor.checked_sub(1).unwrap_or(len - 1);
                }
            }
            Command::CursorDown => {
                let len = Self::pool_len(&view);
                if len > 0 {
                    self.cursor = (self.cursor + 1) % len;
                }
            }
            Command::PickUser => {
                if let Some(action) = self.pick_user(&view) {
                    self.dispatch(course, &action);
                }
            }
        }
        ScreenTransition::Stay
    }

    fn draw(&self, course: &Course, frame: &mut Frame) {
        let Some(view) = self.current_view(course) else {
            return;
        };

        let [header_area, main_area, status_area, help_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());
        let [sections_area, detail_area] =
            Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)])
                .spacing(Spacing::Overlap(1))
                .areas(main_area);

        let header = Line::from(vec![
            Span::styled(
                format!("Lesson {}: {}", view.id.ordinal(), view.title),
                style::HEADING,
            ),
            Span::styled(
                format!("  step {}/{}", view.step, view.terminal_step),
                style::HINT,
            ),
        ])
        .centered();

        // Newest section first, so the latest content is always on screen.
        let mut lines = vec![];
        for section in view.sections.iter().rev().copied() {
            let caption = captions::for_section(view.id, section);
            lines.push(Line::styled(caption.heading, style::HEADING));
            if !caption.text.is_empty() {
                lines.push(Line::from(caption.text));
            }
            lines.push(Line::default());
        }
        let sections = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::bordered()
                .merge_borders(MergeStrategy::Exact)
                .title("Lesson"),
        );

        frame.render_widget(header, header_area);
        frame.render_widget(sections, sections_area);
        frame.render_widget(
            LessonDetailDisplay::new(&view).cursor(self.cursor),
            detail_area,
        );
        frame.render_widget(self.status_line(&view), status_area);
        frame.render_widget(keymap::key_bindings(&view), help_area);
    }
}

#[cfg(test)]
mod tests {
    use causal_engine::matching::MatchError;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn open(lesson: LessonId) -> (Course, LessonScreen) {
        let mut course = Course::new();
        let mut screen = LessonScreen::new(lesson);
        screen.on_active(&mut course);
        (course, screen)
    }

    #[test]
    fn test_advance_and_back() {
        let (mut course, mut screen) = open(LessonId::Confounders);
        assert_eq!(course.active(), Some(LessonId::Confounders));

        screen.handle_event(&mut course, &key(KeyCode::Char('n')));
        let view = screen.current_view(&course).unwrap();
        assert_eq!(view.step, 2);

        let transition = screen.handle_event(&mut course, &key(KeyCode::Char('q')));
        assert!(matches!(transition, ScreenTransition::Pop));
        screen.on_close(&mut course);
        assert_eq!(course.active(), None);
        assert_eq!(course.lesson(LessonId::Confounders).unwrap().view().step, 2);
    }

    #[test]
    fn test_rejected_action_is_shown_until_next_success() {
        let (mut course, mut screen) = open(LessonId::RandomizedExperiments);
        screen.handle_event(&mut course, &key(KeyCode::Char('1')));
        let error = screen.error.clone().unwrap();
        assert!(error.contains("unlocks at step 2"), "{error}");

        screen.handle_event(&mut course, &key(KeyCode::Char('n')));
        assert_eq!(screen.error, None);
    }

    #[test]
    fn test_cursor_picks_users_by_tier() {
        let (mut course, mut screen) = open(LessonId::CoarsenedExactMatching);
        for _ in 1..9 {
            screen.handle_event(&mut course, &key(KeyCode::Char('n')));
        }
        let view = screen.current_view(&course).unwrap();
        assert_eq!(view.step, 9);
        let len = LessonScreen::pool_len(&view);
        assert!(len > 0);

        screen.handle_event(&mut course, &key(KeyCode::Up));
        assert_eq!(screen.cursor, len - 1);
        screen.handle_event(&mut course, &key(KeyCode::Down));
        assert_eq!(screen.cursor, 0);

        let view = screen.current_view(&course).unwrap();
        let action = screen.pick_user(&view).unwrap();
        assert!(matches!(action, Action::SelectTreatment { .. }));

        screen.handle_event(&mut course, &key(KeyCode::Tab));
        assert_eq!(screen.error, None);
        let LessonDetail::CoarsenedExactMatching(detail) =
            screen.current_view(&course).unwrap().detail
        else {
            unreachable!();
        };
        assert!(detail.matching.unwrap().selected_treatment.is_some());

        screen.handle_event(&mut course, &key(KeyCode::Enter));
        assert_eq!(
            screen.error,
            Some(MatchError::IncompleteCandidate.to_string())
        );
    }
}
