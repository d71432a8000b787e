use ratatui::{
    prelude::{Buffer, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Keys and what they do, e.g. `(&["n", "→"], "next")`.
pub type KeyBinding = (&'static [&'static str], &'static str);

/// One-line help bar listing the keys available on the current screen.
#[derive(Debug, Default)]
pub struct KeyBindingDisplay {
    bindings: Vec<KeyBinding>,
}

impl KeyBindingDisplay {
    pub fn new(bindings: impl IntoIterator<Item = KeyBinding>) -> Self {
        Self {
            bindings: bindings.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn extend(mut self, bindings: impl IntoIterator<Item = KeyBinding>) -> Self {
        self.bindings.extend(bindings);
        self
    }

    /// Appends a binding only when `enabled`.
    #[must_use]
    pub fn with_if(mut self, enabled: bool, binding: KeyBinding) -> Self {
        if enabled {
            self.bindings.push(binding);
        }
        self
    }

    fn line(&self) -> Line<'static> {
        let mut spans = vec![];
        for (i, (keys, desc)) in self.bindings.iter().copied().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", ITEM_SEPARATOR_STYLE));
            }
            for (i, key) in keys.iter().copied().enumerate() {
                if i > 0 {
                    spans.push(Span::styled("/", KEY_SEPARATOR_STYLE));
                }
                spans.push(Span::styled(key, KEY_STYLE));
            }
            spans.push(Span::from(" "));
            spans.push(Span::styled(desc, DESCRIPTION_STYLE));
        }
        Line::from(spans).centered()
    }

    #[cfg(test)]
    pub fn line_text(&self) -> String {
        self.line()
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect()
    }
}

const KEY_STYLE: Style = Style::new().fg(Color::Cyan);
const KEY_SEPARATOR_STYLE: Style = Style::new().fg(Color::DarkGray);
const DESCRIPTION_STYLE: Style = Style::new().fg(Color::White);
const ITEM_SEPARATOR_STYLE: Style = Style::new().fg(Color::DarkGray);

impl Widget for KeyBindingDisplay {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        self.line().render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_joins_keys_and_items() {
        let bindings: [KeyBinding; 2] = [(&["n", "→"], "next"), (&["q"], "back")];
        let display = KeyBindingDisplay::new(bindings).with_if(false, (&["m"], "math"));
        assert_eq!(display.line_text(), "n/→ next | q back");
    }
}
