//! Layer - A single compositable layer

use ratatui::buffer::{Buffer, Cell};
use ratatui::layout::Rect;
use ratatui::style::Color;

use super::LayerId;

/// A single layer in the compositor
pub struct Layer {
    /// Unique identifier
    pub id: LayerId,
    /// Z-order (higher = in front)
    pub z_index: i32,
    /// Screen position and size
    pub bounds: Rect,
    /// Whether the layer is visible
    pub visible: bool,
    /// The layer's render buffer, in layer-local coordinates
    pub buffer: Buffer,
}

impl Layer {
    /// Create a new layer
    pub fn new(id: LayerId, bounds: Rect, z_index: i32) -> Self {
        Self {
            id,
            z_index,
            bounds,
            visible: true,
            buffer: Buffer::empty(Rect::new(0, 0, bounds.width, bounds.height)),
        }
    }

    /// A blank cell with no background lets lower layers show through
    pub fn is_hole(cell: &Cell) -> bool {
        cell.symbol() == " " && cell.bg == Color::Reset
    }
}
