use ratatui::{
    prelude::{Buffer, Rect},
    symbols::merge::MergeStrategy,
    text::Line,
    widgets::{Block, Paragraph, Widget, Wrap},
};

pub use self::{chart::*, key_binding_display::*, lesson_detail::*};

mod chart;
mod key_binding_display;
mod lesson_detail;

pub mod style {
    use ratatui::style::{Color, Modifier, Style};

    pub const HINT: Style = Style::new().fg(Color::DarkGray);
    pub const SELECTED: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    pub const CORRECT: Style = Style::new().fg(Color::Green);
    pub const WRONG: Style = Style::new().fg(Color::Red);
    pub const PENDING: Style = Style::new().fg(Color::Yellow);
    pub const DONE: Style = Style::new().fg(Color::DarkGray);
    pub const HEADING: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    pub const TREATED: Color = Color::LightCyan;
    pub const CONTROL: Color = Color::LightMagenta;
    pub const TREND: Color = Color::Yellow;
}

/// Rows needed to show `lines` inside a bordered block.
fn pane_height(lines: &[Line<'_>]) -> u16 {
    u16::try_from(lines.len())
        .unwrap_or(u16::MAX)
        .saturating_add(2)
}

/// Renders wrapped text in a bordered pane.
fn render_text_pane(title: &str, lines: Vec<Line<'_>>, area: Rect, buf: &mut Buffer) {
    let block = Block::bordered()
        .merge_borders(MergeStrategy::Exact)
        .title(title.to_owned());
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(block)
        .render(area, buf);
}
