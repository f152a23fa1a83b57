//! TextBlock Widget
//!
//! A borderless text region that keeps its newest lines in view.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::StatefulWidget;
use textwrap::wrap;

/// State for a text block
#[derive(Default)]
pub struct TextBlockState {
    /// First visible wrapped line
    pub scroll_offset: usize,
    /// Total wrapped lines at the last render
    pub total_lines: usize,
}

/// A borderless text block showing the tail of its content
pub struct TextBlock<'a> {
    lines: &'a [String],
    style: Style,
}

impl<'a> TextBlock<'a> {
    pub fn new(lines: &'a [String]) -> Self {
        Self {
            lines,
            style: Style::default(),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

impl StatefulWidget for TextBlock<'_> {
    type State = TextBlockState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let wrapped: Vec<String> = self
            .lines
            .iter()
            .flat_map(|line| {
                if line.is_empty() {
                    vec![String::new()]
                } else {
                    wrap(line, area.width as usize)
                        .into_iter()
                        .map(|cow| cow.to_string())
                        .collect()
                }
            })
            .collect();

        state.total_lines = wrapped.len();
        state.scroll_offset = state.total_lines.saturating_sub(area.height as usize);

        for (i, line) in wrapped
            .iter()
            .skip(state.scroll_offset)
            .take(area.height as usize)
            .enumerate()
        {
            let y = area.y + i as u16;
            buf.set_stringn(area.x, y, line, area.width as usize, self.style);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn test_newest_lines_stay_visible() {
        let lines: Vec<String> = (1..=5).map(|i| format!("line {i}")).collect();
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 2));
        let mut state = TextBlockState::default();

        TextBlock::new(&lines).render(buf.area, &mut buf, &mut state);

        assert_eq!(state.total_lines, 5);
        assert_eq!(state.scroll_offset, 3);
        assert_eq!(row(&buf, 0), "line 4");
        assert_eq!(row(&buf, 1), "line 5");
    }

    #[test]
    fn test_long_lines_wrap() {
        let lines = vec!["alpha beta gamma".to_string()];
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 3));
        let mut state = TextBlockState::default();

        TextBlock::new(&lines).render(buf.area, &mut buf, &mut state);

        assert_eq!(state.total_lines, 2);
        assert_eq!(row(&buf, 0), "alpha beta");
        assert_eq!(row(&buf, 1), "gamma");
    }
}
