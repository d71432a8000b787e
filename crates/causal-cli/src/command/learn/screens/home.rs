use causal_engine::{
    course::{Course, LessonSummary},
    lesson::LessonId,
};
use crossterm::event::{Event, KeyCode, KeyEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Layout},
    style::{Color, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Text},
    widgets::{Block, List, ListItem, ListState},
};

use crate::{
    command::learn::screens::LessonScreen,
    tui::{Screen, ScreenTransition},
    ui::widgets::{KeyBinding, KeyBindingDisplay, style},
};

const HOME_KEYS: [KeyBinding; 3] = [
    (&["↑", "↓"], "select"),
    (&["Enter", "1-6"], "open"),
    (&["q", "Esc"], "quit"),
];

/// The lesson list.
#[derive(Debug, Default)]
pub struct HomeScreen {
    selected: usize,
}

impl HomeScreen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self) -> ScreenTransition {
        ScreenTransition::Push(Box::new(LessonScreen::new(LessonId::ALL[self.selected])))
    }
}

fn progress_label(summary: &LessonSummary) -> String {
    match (summary.step, summary.terminal_step) {
        (Some(step), Some(terminal)) if step >= terminal => "completed".to_owned(),
        (Some(step), Some(terminal)) => format!("step {step}/{terminal}"),
        _ => "not started".to_owned(),
    }
}

impl Screen for HomeScreen {
    fn on_active(&mut self, _course: &mut Course) {}

    fn on_close(&mut self, _course: &mut Course) {}

    fn handle_event(&mut self, _course: &mut Course, event: &Event) -> ScreenTransition {
        let Some(event) = event.as_key_event() else {
            return ScreenTransition::Stay;
        };
        if event.kind != KeyEventKind::Press {
            return ScreenTransition::Stay;
        }
        let count = LessonId::ALL.len();
        match event.code {
            KeyCode::Char('q') | KeyCode::Esc => return ScreenTransition::Exit,
            KeyCode::Up => {
                self.selected = self.selected.checked_sub(1).unwrap_or(count - 1);
            }
            KeyCode::Down => self.selected = (self.selected + 1) % count,
            KeyCode::Enter => return self.open(),
            KeyCode::Char(c) => {
                if let Some(index) = c
                    .to_digit(10)
                    .and_then(|d| usize::try_from(d).ok())
                    .and_then(|d| d.checked_sub(1))
                    .filter(|index| *index < count)
                {
                    self.selected = index;
                    return self.open();
                }
            }
            _ => {}
        }
        ScreenTransition::Stay
    }

    fn draw(&self, course: &Course, frame: &mut Frame) {
        let [title_area, list_area, help_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let title = Text::from(vec![
            Line::styled("Casual Causality", style::HEADING),
            Line::styled("A short course on telling causes from coincidences", style::HINT),
        ])
        .centered();

        let items = course
            .summaries()
            .iter()
            .map(|summary| {
                ListItem::new(format!(
                    "{}. {:<28} {}",
                    summary.ordinal,
                    summary.title,
                    progress_label(summary)
                ))
            })
            .collect::<Vec<_>>();
        let list = List::new(items)
            .block(
                Block::bordered()
                    .merge_borders(MergeStrategy::Exact)
                    .title("Lessons"),
            )
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol(">> ");
        let mut state = ListState::default().with_selected(Some(self.selected));

        frame.render_widget(title, title_area);
        frame.render_stateful_widget(list, list_area, &mut state);
        frame.render_widget(KeyBindingDisplay::new(HOME_KEYS), help_area);
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyEvent, KeyModifiers};

    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_selection_wraps_around() {
        let mut course = Course::new();
        let mut screen = HomeScreen::new();
        screen.handle_event(&mut course, &key(KeyCode::Up));
        assert_eq!(screen.selected, LessonId::ALL.len() - 1);
        screen.handle_event(&mut course, &key(KeyCode::Down));
        assert_eq!(screen.selected, 0);
    }

    #[test]
    fn test_digit_opens_lesson() {
        let mut course = Course::new();
        let mut screen = HomeScreen::new();
        let transition = screen.handle_event(&mut course, &key(KeyCode::Char('6')));
        assert!(matches!(transition, ScreenTransition::Push(_)));
        assert_eq!(screen.selected, 5);
        let transition = screen.handle_event(&mut course, &key(KeyCode::Char('7')));
        assert!(matches!(transition, ScreenTransition::Stay));
    }

    #[test]
    fn test_progress_label() {
        let mut summary = LessonSummary {
            id: LessonId::Confounders,
            ordinal: 3,
            title: LessonId::Confounders.title(),
            step: None,
            terminal_step: None,
        };
        assert_eq!(progress_label(&summary), "not started");
        summary.step = Some(2);
        summary.terminal_step = Some(7);
        assert_eq!(progress_label(&summary), "step 2/7");
        summary.step = Some(7);
        assert_eq!(progress_label(&summary), "completed");
    }
}
