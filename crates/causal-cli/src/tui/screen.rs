use std::fmt;

use causal_engine::course::Course;
use crossterm::event::Event;
use ratatui::Frame;

/// Individual screen in the application.
///
/// Screens read and change the shared [`Course`]; they hold only
/// presentation state such as cursors and the last status message.
///
/// # Lifecycle
///
/// ```text
/// Create
///   ↓
/// on_active() ←──────────┐
///   ↓                     │ Child screen pops
/// (Foreground) ──────────┘
///   ↓
/// on_close()  ← Only on Pop/Exit
///   ↓
/// Drop
/// ```
///
/// [`on_active`](Self::on_active) runs again when a child screen pops, so a
/// screen that mirrors course navigation (e.g. entering a lesson) does it
/// there.
pub trait Screen: fmt::Debug {
    /// Called when this screen becomes the foreground screen.
    fn on_active(&mut self, course: &mut Course);

    /// Called when this screen is removed from the stack.
    fn on_close(&mut self, course: &mut Course);

    /// Handles terminal events and returns transition.
    fn handle_event(&mut self, course: &mut Course, event: &Event) -> ScreenTransition;

    /// Renders the screen.
    fn draw(&self, course: &Course, frame: &mut Frame);
}

/// Screen transition result from event handling.
#[derive(Debug)]
pub enum ScreenTransition {
    /// Stay in the current screen.
    Stay,

    /// Push a new screen on top of the current one.
    Push(Box<dyn Screen>),

    /// Pop the current screen and return to the previous one.
    ///
    /// Current screen's `on_close` is called, then previous screen's
    /// `on_active` is called.
    Pop,

    /// Close every screen and exit the application.
    Exit,
}

#[derive(Debug)]
pub struct ScreenStack {
    screens: Vec<Box<dyn Screen>>,
}

impl ScreenStack {
    /// Creates a new screen stack with an initial screen.
    #[must_use]
    pub fn new(initial: Box<dyn Screen>) -> Self {
        Self {
            screens: vec![initial],
        }
    }

    pub fn init(&mut self, course: &mut Course) {
        if let Some(screen) = self.screens.last_mut() {
            screen.on_active(course);
        }
    }

    pub fn should_exit(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn handle_event(&mut self, course: &mut Course, event: &Event) {
        if let Some(current) = self.screens.last_mut() {
            let transition = current.handle_event(course, event);
            self.apply_transition(course, transition);
        }
    }

    pub fn draw(&self, course: &Course, frame: &mut Frame) {
        if let Some(current) = self.screens.last() {
            current.draw(course, frame);
        }
    }

    fn apply_transition(&mut self, course: &mut Course, transition: ScreenTransition) {
        match transition {
            ScreenTransition::Stay => {}

            ScreenTransition::Push(mut new_screen) => {
                new_screen.on_active(course);
                self.screens.push(new_screen);
            }

            ScreenTransition::Pop => {
                if let Some(mut old_screen) = self.screens.pop() {
                    old_screen.on_close(course);
                }
                if let Some(prev_screen) = self.screens.last_mut() {
                    prev_screen.on_active(course);
                }
            }

            ScreenTransition::Exit => {
                while let Some(mut screen) = self.screens.pop() {
                    screen.on_close(course);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use causal_engine::lesson::LessonId;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::*;

    /// Tracks lifecycle calls for testing
    #[derive(Debug, Clone, Default)]
    struct LifecycleLog {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl LifecycleLog {
        fn log(&self, msg: impl Into<String>) {
            self.calls.borrow_mut().push(msg.into());
        }

        fn take(&self) -> Vec<String> {
            self.calls.take()
        }
    }

    /// Test screen that logs lifecycle calls and optionally opens a lesson
    #[derive(Debug)]
    struct TestScreen {
        name: &'static str,
        log: LifecycleLog,
        lesson: Option<LessonId>,
        transition: Option<ScreenTransition>,
    }

    impl TestScreen {
        fn new(name: &'static str, log: &LifecycleLog) -> Self {
            Self {
                name,
                log: log.clone(),
                lesson: None,
                transition: None,
            }
        }

        fn with_lesson(mut self, lesson: LessonId) -> Self {
            self.lesson = Some(lesson);
            self
        }

        fn with_transition(mut self, transition: ScreenTransition) -> Self {
            self.transition = Some(transition);
            self
        }
    }

    impl Screen for TestScreen {
        fn on_active(&mut self, course: &mut Course) {
            self.log.log(format!("{}: on_active", self.name));
            if let Some(lesson) = self.lesson {
                course.enter(lesson);
            }
        }

        fn on_close(&mut self, course: &mut Course) {
            self.log.log(format!("{}: on_close", self.name));
            if self.lesson.is_some() {
                course.leave();
            }
        }

        fn handle_event(&mut self, _course: &mut Course, _event: &Event) -> ScreenTransition {
            self.log.log(format!("{}: handle_event", self.name));
            self.transition.take().unwrap_or(ScreenTransition::Stay)
        }

        fn draw(&self, _course: &Course, _frame: &mut Frame) {}
    }

    fn key_event() -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE))
    }

    #[test]
    fn test_push_and_pop_follow_course_navigation() {
        let log = LifecycleLog::default();
        let lesson = TestScreen::new("lesson", &log)
            .with_lesson(LessonId::Confounders)
            .with_transition(ScreenTransition::Pop);
        let home = TestScreen::new("home", &log)
            .with_transition(ScreenTransition::Push(Box::new(lesson)));
        let mut course = Course::new();
        let mut stack = ScreenStack::new(Box::new(home));

        stack.init(&mut course);
        assert_eq!(log.take(), ["home: on_active"]);

        stack.handle_event(&mut course, &key_event());
        assert_eq!(log.take(), ["home: handle_event", "lesson: on_active"]);
        assert_eq!(course.active(), Some(LessonId::Confounders));

        stack.handle_event(&mut course, &key_event());
        assert_eq!(
            log.take(),
            ["lesson: handle_event", "lesson: on_close", "home: on_active"]
        );
        assert_eq!(course.active(), None);
        assert!(!stack.should_exit());
    }

    #[test]
    fn test_exit_closes_every_screen() {
        let log = LifecycleLog::default();
        let mut course = Course::new();
        let mut stack = ScreenStack::new(Box::new(TestScreen::new("A", &log)));
        stack.init(&mut course);
        let top = TestScreen::new("B", &log).with_transition(ScreenTransition::Exit);
        stack.apply_transition(&mut course, ScreenTransition::Push(Box::new(top)));
        log.take();

        stack.handle_event(&mut course, &key_event());
        assert_eq!(
            log.take(),
            ["B: handle_event", "B: on_close", "A: on_close"]
        );
        assert!(stack.should_exit());
    }

    #[test]
    fn test_popping_the_last_screen_exits() {
        let log = LifecycleLog::default();
        let screen = TestScreen::new("A", &log).with_transition(ScreenTransition::Pop);
        let mut course = Course::new();
        let mut stack = ScreenStack::new(Box::new(screen));

        stack.init(&mut course);
        assert!(!stack.should_exit());
        stack.handle_event(&mut course, &key_event());
        assert!(stack.should_exit());
    }

    #[test]
    fn test_stay_transition_does_nothing() {
        let log = LifecycleLog::default();
        let mut course = Course::new();
        let mut stack = ScreenStack::new(Box::new(TestScreen::new("A", &log)));
        stack.init(&mut course);
        log.take();

        stack.apply_transition(&mut course, ScreenTransition::Stay);
        assert!(log.take().is_empty());
    }
}
