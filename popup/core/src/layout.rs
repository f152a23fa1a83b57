//! Text Layout Helper
//!
//! Greedy word wrapping against a pixel width, using whatever text metrics
//! the host surface provides. Pure: no shared state, deterministic for a
//! given measurer, font and width.

use unicode_width::UnicodeWidthStr;

/// Font family and size used for measuring and drawing
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    /// Font family name (e.g. "Arial Bold")
    pub family: String,
    /// Em size in points
    pub size: f32,
}

impl FontSpec {
    /// Create a font spec
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
        }
    }
}

/// Measured extent of a piece of text
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextSize {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

/// Text metrics supplied by the host
pub trait TextMeasurer {
    /// Measure a single run of text rendered in `font`
    fn measure(&self, text: &str, font: &FontSpec) -> TextSize;
}

/// Fixed-advance measurer: every display column is `cell_width` pixels wide
/// and every line `cell_height` pixels tall, regardless of font
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonospaceMeasurer {
    /// Pixel width of one display column
    pub cell_width: f64,
    /// Pixel height of one line
    pub cell_height: f64,
}

impl MonospaceMeasurer {
    /// Terminal-style metrics: 8×16 pixel cells
    #[must_use]
    pub fn terminal() -> Self {
        Self {
            cell_width: 8.0,
            cell_height: 16.0,
        }
    }
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self::terminal()
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, _font: &FontSpec) -> TextSize {
        TextSize {
            width: text.width() as f64 * self.cell_width,
            height: self.cell_height,
        }
    }
}

/// Result of wrapping a block of text
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WrappedText {
    /// Wrapped lines, words separated by single spaces
    pub lines: Vec<String>,
    /// Height of the last word measured; used as the line pitch of the block
    pub line_height: f64,
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Newline,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for (i, segment) in text.split('\n').enumerate() {
        if i > 0 {
            tokens.push(Token::Newline);
        }
        tokens.extend(segment.split_whitespace().map(Token::Word));
    }
    tokens
}

/// Wrap `text` into lines no wider than `max_width` pixels
///
/// Words are accumulated greedily; the running width is the sum of the word
/// widths (separating spaces are not measured). When adding a word would push
/// the width past `max_width`, the current line is closed and the word starts
/// the next one. A word wider than `max_width` on its own still gets a line.
/// `\n` forces a break regardless of width.
#[must_use]
pub fn wrap_text(
    text: &str,
    max_width: f64,
    measurer: &dyn TextMeasurer,
    font: &FontSpec,
) -> WrappedText {
    let mut wrapped = WrappedText::default();
    let mut line = String::new();
    let mut width = 0.0;

    for token in tokenize(text) {
        match token {
            Token::Newline => {
                wrapped.lines.push(std::mem::take(&mut line));
                width = 0.0;
            }
            Token::Word(word) => {
                let size = measurer.measure(word, font);
                wrapped.line_height = size.height;
                width += size.width;

                if width > max_width && !line.is_empty() {
                    wrapped.lines.push(std::mem::take(&mut line));
                    width = size.width;
                }
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(word);
            }
        }
    }

    if !line.is_empty() {
        wrapped.lines.push(line);
    }
    wrapped
}

/// Width, font and metrics used to lay out prompt text
#[derive(Clone)]
pub struct TextLayout {
    measurer: std::rc::Rc<dyn TextMeasurer>,
    width: f64,
    font: FontSpec,
}

impl TextLayout {
    /// Create a layout
    pub fn new(measurer: std::rc::Rc<dyn TextMeasurer>, width: f64, font: FontSpec) -> Self {
        Self {
            measurer,
            width,
            font,
        }
    }

    /// Wrap `text` with this layout
    #[must_use]
    pub fn wrap(&self, text: &str) -> WrappedText {
        wrap_text(text, self.width, self.measurer.as_ref(), &self.font)
    }

    /// Measure a single run in the layout font
    #[must_use]
    pub fn measure(&self, text: &str) -> TextSize {
        self.measurer.measure(text, &self.font)
    }

    /// Wrap width in pixels
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Body font
    #[must_use]
    pub fn font(&self) -> &FontSpec {
        &self.font
    }
}

impl std::fmt::Debug for TextLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLayout")
            .field("width", &self.width)
            .field("font", &self.font)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn font() -> FontSpec {
        FontSpec::new("Arial Bold", 15.0)
    }

    /// One pixel per character, 10px lines
    fn unit() -> MonospaceMeasurer {
        MonospaceMeasurer {
            cell_width: 1.0,
            cell_height: 10.0,
        }
    }

    #[test]
    fn test_wraps_greedily_on_word_widths() {
        // word widths: 3 + 3 + 3 = 9 > 8, so "ccc" starts a new line
        let wrapped = wrap_text("aaa bbb ccc dd", 8.0, &unit(), &font());
        assert_eq!(wrapped.lines, vec!["aaa bbb", "ccc dd"]);
        assert_eq!(wrapped.line_height, 10.0);
    }

    #[test]
    fn test_width_exactly_at_limit_stays_on_line() {
        let wrapped = wrap_text("aaaa bbbb", 8.0, &unit(), &font());
        assert_eq!(wrapped.lines, vec!["aaaa bbbb"]);
    }

    #[test]
    fn test_newline_forces_break() {
        let wrapped = wrap_text("one\ntwo three\n\nfour", 100.0, &unit(), &font());
        assert_eq!(wrapped.lines, vec!["one", "two three", "", "four"]);
    }

    #[test]
    fn test_overlong_word_gets_its_own_line() {
        let wrapped = wrap_text("abcdefghijkl xy", 5.0, &unit(), &font());
        assert_eq!(wrapped.lines, vec!["abcdefghijkl", "xy"]);
    }

    #[test]
    fn test_empty_text() {
        let wrapped = wrap_text("   ", 50.0, &unit(), &font());
        assert!(wrapped.lines.is_empty());
        assert_eq!(wrapped.line_height, 0.0);
    }

    #[test]
    fn test_line_height_is_last_measured_word() {
        struct Growing;
        impl TextMeasurer for Growing {
            fn measure(&self, text: &str, _font: &FontSpec) -> TextSize {
                TextSize {
                    width: 1.0,
                    height: text.len() as f64,
                }
            }
        }
        let wrapped = wrap_text("a bb cccc", 100.0, &Growing, &font());
        assert_eq!(wrapped.line_height, 4.0);
    }

    #[test]
    fn test_content_round_trip() {
        let text = "Errors were detected in your installation of the following \
                    modifications, so they will not load: alpha, beta, gamma";
        let wrapped = wrap_text(text, 120.0, &MonospaceMeasurer::terminal(), &font());
        assert!(wrapped.lines.len() > 1);

        let rejoined = wrapped.lines.join(" ");
        let original: Vec<&str> = text.split_whitespace().collect();
        let round_trip: Vec<&str> = rejoined.split_whitespace().collect();
        assert_eq!(round_trip, original);
    }

    #[test]
    fn test_wide_characters_measure_two_columns() {
        let m = MonospaceMeasurer::terminal();
        assert_eq!(m.measure("ab", &font()).width, 16.0);
        assert_eq!(m.measure("日本", &font()).width, 32.0);
    }
}
