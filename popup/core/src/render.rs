//! Prompt panel rendering
//!
//! A pure read of prompt state onto a [`Canvas`]. The panel sits at a quarter
//! of the host width and a seventh of the host height:
//!
//! ```text
//!  (w/4 - 5, h/7 - 5) ┌──────────────────── border 760×210, 90 alpha ─┐
//!                     │ Title                                          │
//!                     │ ┌──────────────── body 750×200, black ───────┐ │
//!                     │ │ line 0              (body.y + 35)          │ │
//!                     │ │ line 1              (+ line height + 2)    │ │
//!                     │ └────────────────────────────────────────────┘ │
//!                     └────────────────────────────────────────────────┘
//! ```

use crate::config::PopupConfig;
use crate::host::{Canvas, Color, HostError, Point, Rect, Resolution};
use crate::prompt::Prompt;

/// Alpha of the translucent border
pub const BORDER_ALPHA: u8 = 90;

/// Panel rectangles for a given resolution
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelLayout {
    /// Translucent border behind the body
    pub border: Rect,
    /// Opaque body
    pub body: Rect,
}

impl PanelLayout {
    /// Compute the panel position for `resolution`
    #[must_use]
    pub fn for_resolution(resolution: Resolution, config: &PopupConfig) -> Self {
        let body = Rect::new(
            resolution.width as f32 / 4.0,
            resolution.height as f32 / 7.0,
            config.panel.width,
            config.panel.height,
        );
        Self {
            border: body.inflate(config.panel.border),
            body,
        }
    }
}

/// Draw `prompt` if it is active. Inactive prompts draw nothing.
///
/// # Errors
///
/// Propagates the first [`HostError`] returned by the canvas.
pub fn render_prompt(
    prompt: &Prompt,
    canvas: &mut dyn Canvas,
    resolution: Resolution,
    config: &PopupConfig,
) -> Result<(), HostError> {
    if !prompt.is_active() {
        return Ok(());
    }

    let panel = PanelLayout::for_resolution(resolution, config);
    canvas.draw_rect(panel.border, Color::BLACK.with_alpha(BORDER_ALPHA))?;
    canvas.draw_rect(panel.body, Color::BLACK)?;

    let (title_dx, title_dy) = config.panel.title_offset;
    canvas.draw_text(
        prompt.title(),
        &config.title_font,
        Point::new(panel.border.x + title_dx, panel.border.y + title_dy),
        Color::WHITE,
        panel.border,
    )?;

    let pitch = prompt.line_height() as f32 + config.panel.line_spacing;
    let mut y = panel.body.y + config.panel.body_offset;
    for line in prompt.display_lines() {
        canvas.draw_text(
            &line,
            &config.body_font,
            Point::new(panel.body.x, y),
            Color::WHITE,
            panel.border,
        )?;
        y += pitch;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FontSpec, MonospaceMeasurer, TextLayout};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recording {
        rects: Vec<(Rect, Color)>,
        texts: Vec<(String, Point)>,
        fail_text: bool,
    }

    impl Canvas for Recording {
        fn draw_rect(&mut self, rect: Rect, color: Color) -> Result<(), HostError> {
            self.rects.push((rect, color));
            Ok(())
        }

        fn draw_text(
            &mut self,
            text: &str,
            _font: &FontSpec,
            position: Point,
            _color: Color,
            _clip: Rect,
        ) -> Result<(), HostError> {
            if self.fail_text {
                return Err(HostError::Render("font missing".into()));
            }
            self.texts.push((text.to_string(), position));
            Ok(())
        }
    }

    fn prompt() -> Prompt {
        let layout = TextLayout::new(
            Rc::new(MonospaceMeasurer::terminal()),
            720.0,
            FontSpec::new("Arial Bold", 15.0),
        );
        Prompt::question("Quiz", "Pick one", ["A", "B"])
            .build(&layout)
            .unwrap()
    }

    #[test]
    fn test_inactive_prompt_draws_nothing() {
        let mut canvas = Recording::default();
        render_prompt(&prompt(), &mut canvas, Resolution::new(1920, 1080), &PopupConfig::default())
            .unwrap();
        assert!(canvas.rects.is_empty());
        assert!(canvas.texts.is_empty());
    }

    #[test]
    fn test_panel_geometry() {
        let prompt = prompt();
        prompt.set_active(true);
        let mut canvas = Recording::default();
        render_prompt(&prompt, &mut canvas, Resolution::new(1920, 1050), &PopupConfig::default())
            .unwrap();

        assert_eq!(
            canvas.rects,
            vec![
                (Rect::new(475.0, 145.0, 760.0, 210.0), Color::argb(90, 0, 0, 0)),
                (Rect::new(480.0, 150.0, 750.0, 200.0), Color::BLACK),
            ]
        );
        assert_eq!(
            canvas.texts,
            vec![
                ("Quiz".to_string(), Point::new(480.0, 150.0)),
                ("Pick one".to_string(), Point::new(480.0, 185.0)),
                ("[1] A".to_string(), Point::new(480.0, 203.0)),
                ("[2] B".to_string(), Point::new(480.0, 221.0)),
            ]
        );
    }

    #[test]
    fn test_canvas_error_propagates() {
        let prompt = prompt();
        prompt.set_active(true);
        let mut canvas = Recording {
            fail_text: true,
            ..Recording::default()
        };
        let result = render_prompt(&prompt, &mut canvas, Resolution::new(800, 600), &PopupConfig::default());
        assert_eq!(result, Err(HostError::Render("font missing".into())));
    }
}
