//! Theme and Colors
//!
//! Palette for the scene behind the prompts, plus the mapping from the
//! queue's ARGB colors onto terminal colors.

use popup_core::Color as PanelColor;
use ratatui::style::Color;

// ============================================================================
// Scene Palette
// ============================================================================

/// Night sky behind everything
pub const SCENE_BG: Color = Color::Rgb(18, 24, 48);

/// Far stars
pub const STAR_DIM: Color = Color::Rgb(90, 100, 140);

/// Near stars
pub const STAR_BRIGHT: Color = Color::Rgb(220, 225, 255);

/// Rolling hills along the bottom of the scene
pub const HILLS: Color = Color::Rgb(40, 90, 60);

// ============================================================================
// UI Colors
// ============================================================================

/// Status line text
pub const STATUS_TEXT: Color = Color::Rgb(170, 170, 190);

/// Status flag when the scene is paused
pub const PAUSED_AMBER: Color = Color::Rgb(255, 190, 80);

/// Notice log text
pub const NOTICE_TEXT: Color = Color::Rgb(150, 200, 255);

// ============================================================================
// Panel colors
// ============================================================================

/// RGB components of a terminal color, falling back to the scene backdrop
fn rgb_of(color: Color) -> (u8, u8, u8) {
    match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::White => (255, 255, 255),
        _ => rgb_of(SCENE_BG),
    }
}

/// Composite `color` over `under` using its alpha
pub fn blend(color: PanelColor, under: Color) -> Color {
    let (ur, ug, ub) = rgb_of(under);
    let alpha = u16::from(color.a);
    let mix = |top: u8, bottom: u8| -> u8 {
        let value = (u16::from(top) * alpha + u16::from(bottom) * (255 - alpha)) / 255;
        u8::try_from(value).unwrap_or(u8::MAX)
    };
    Color::Rgb(mix(color.r, ur), mix(color.g, ug), mix(color.b, ub))
}

/// Opaque terminal color for text
pub fn solid(color: PanelColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}
