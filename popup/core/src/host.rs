//! Host Collaborators
//!
//! The contracts the prompt queue consumes from its host: a render surface
//! with a per-frame hook, keyboard state, a pause switch and a notification
//! channel. Everything is single-threaded; implementations use interior
//! mutability behind `&self`.
//!
//! ```text
//!   PromptQueue / DisplayDriver
//!        │         │        │          │
//!        ▼         ▼        ▼          ▼
//!  RenderSurface InputSource HostPause Notifier
//!        │         │        │          │
//!   ─────┴─────────┴────────┴──────────┴─────  host (game, terminal, headless)
//! ```

use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

use crate::layout::FontSpec;

// ============================================================================
// Geometry
// ============================================================================

/// Axis-aligned rectangle in host pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    /// Create a rectangle
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow the rectangle by `amount` on every side
    #[must_use]
    pub fn inflate(&self, amount: f32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }
}

/// Point in host pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
}

impl Point {
    /// Create a point
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Host render resolution
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Create a resolution
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// ARGB color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Alpha (0 = transparent)
    pub a: u8,
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Color {
    /// Opaque black
    pub const BLACK: Self = Self::argb(255, 0, 0, 0);
    /// Opaque white
    pub const WHITE: Self = Self::argb(255, 255, 255, 255);

    /// Build a color from components
    #[must_use]
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    /// Same color with a different alpha
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A collaborator failed while a prompt was being presented
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HostError {
    /// Drawing failed inside the frame hook
    #[error("render collaborator failed: {0}")]
    Render(String),
    /// Keyboard polling failed
    #[error("input collaborator failed: {0}")]
    Input(String),
}

// ============================================================================
// Render collaborator
// ============================================================================

/// Drawing primitives available inside a frame hook
pub trait Canvas {
    /// Fill a rectangle
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Render`] if the host cannot draw.
    fn draw_rect(&mut self, rect: Rect, color: Color) -> Result<(), HostError>;

    /// Draw a single line of text at `position`, clipped to `clip`
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Render`] if the host cannot draw.
    fn draw_text(
        &mut self,
        text: &str,
        font: &FontSpec,
        position: Point,
        color: Color,
        clip: Rect,
    ) -> Result<(), HostError>;
}

/// Identifier of a registered frame hook
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHookId(pub u64);

/// Callback invoked by the host once per rendered frame, with the
/// resolution of that frame
pub type FrameHook = Rc<dyn Fn(&mut dyn Canvas, Resolution)>;

/// Render collaborator: frame-hook subscription plus resolution
pub trait RenderSurface {
    /// Current render resolution
    fn resolution(&self) -> Resolution;

    /// Subscribe `hook` to every rendered frame
    fn on_frame(&self, hook: FrameHook) -> FrameHookId;

    /// Remove a hook. Unknown ids are ignored.
    fn off_frame(&self, id: FrameHookId);
}

// ============================================================================
// Input collaborator
// ============================================================================

/// Keys the display driver polls
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Closes an acknowledgement prompt (Enter)
    Confirm,
    /// Number row key 1-9
    Digit(u8),
}

impl Key {
    /// Answer key for a zero-based presented position (position 0 → `1`)
    #[must_use]
    pub fn answer(position: usize) -> Self {
        Self::Digit(u8::try_from(position + 1).unwrap_or(u8::MAX))
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirm => write!(f, "Enter"),
            Self::Digit(n) => write!(f, "{n}"),
        }
    }
}

/// Input collaborator
pub trait InputSource {
    /// Whether `key` is held down this frame
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Input`] if the keyboard cannot be read.
    fn is_key_down(&self, key: Key) -> Result<bool, HostError>;
}

// ============================================================================
// Pause and notification collaborators
// ============================================================================

/// Host pause switch
pub trait HostPause {
    /// Pause or resume the host
    fn set_paused(&self, paused: bool);

    /// Whether the host is currently paused
    fn is_paused(&self) -> bool;
}

/// Fire-and-forget user notification
pub trait Notifier {
    /// Show `text` to the user
    fn notify(&self, text: &str);
}

/// "Activity in progress" flag
///
/// At most one prompt holds the gate at a time. Every queue built from the
/// same [`Host`] shares its gate; clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct ActivityGate(Rc<Cell<bool>>);

impl ActivityGate {
    /// Create a clear gate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether some prompt currently holds the gate
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn claim(&self) {
        self.0.set(true);
    }

    pub(crate) fn release(&self) {
        self.0.set(false);
    }
}

/// The full set of collaborators a queue talks to
#[derive(Clone)]
pub struct Host {
    /// Render collaborator
    pub render: Rc<dyn RenderSurface>,
    /// Input collaborator
    pub input: Rc<dyn InputSource>,
    /// Pause collaborator
    pub pause: Rc<dyn HostPause>,
    /// Notification collaborator
    pub notifier: Rc<dyn Notifier>,
    /// Host-wide activity gate
    pub gate: ActivityGate,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inflate() {
        let rect = Rect::new(480.0, 154.0, 750.0, 200.0).inflate(5.0);
        assert_eq!(rect, Rect::new(475.0, 149.0, 760.0, 210.0));
    }

    #[test]
    fn test_gate_shared_between_clones() {
        let gate = ActivityGate::new();
        let other = gate.clone();
        gate.claim();
        assert!(other.is_busy());
        other.release();
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_answer_keys() {
        assert_eq!(Key::answer(0), Key::Digit(1));
        assert_eq!(Key::answer(5), Key::Digit(6));
        assert_eq!(Key::answer(1).to_string(), "2");
        assert_eq!(Key::Confirm.to_string(), "Enter");
    }
}
