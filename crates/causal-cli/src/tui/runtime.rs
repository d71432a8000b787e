use causal_engine::course::Course;
use crossterm::event;

use crate::tui::ScreenStack;

/// Runs the screen stack until it is empty.
///
/// The course only changes in response to terminal events, so the loop
/// redraws once per event and blocks in between.
pub fn run(mut stack: ScreenStack, course: &mut Course) -> anyhow::Result<()> {
    stack.init(course);

    ratatui::run(|terminal| {
        while !stack.should_exit() {
            terminal.draw(|frame| stack.draw(course, frame))?;
            let event = event::read()?;
            stack.handle_event(course, &event);
        }
        Ok(())
    })
}
