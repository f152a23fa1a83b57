//! Terminal Host
//!
//! Implements the queue's host collaborators on top of a terminal. The
//! terminal pretends to be a pixel surface of fixed-size cells, so prompt
//! geometry configured in pixels maps onto columns and rows.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use chrono::{DateTime, Local};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect as CellRect;
use ratatui::style::Style;

use popup_core::{
    ActivityGate, Canvas, Color, FontSpec, FrameHook, FrameHookId, Host, HostError, HostPause, InputSource,
    Key, MonospaceMeasurer, Notifier, Point, Rect, RenderSurface, Resolution,
};

use crate::theme;

/// Notices kept for the log
const MAX_NOTICES: usize = 200;

/// A notification shown in the notice log
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    /// When it arrived
    pub at: DateTime<Local>,
    /// Text
    pub text: String,
}

/// Canvas writing into a ratatui buffer
struct BufferCanvas<'a> {
    buf: &'a mut Buffer,
    cell: MonospaceMeasurer,
}

impl BufferCanvas<'_> {
    /// Cell span covering `[start, start + len)` pixels on one axis
    fn span(start: f32, len: f32, cell: f64, limit: u16) -> (u16, u16) {
        let to_cells = |px: f64| px.max(0.0).min(f64::from(limit));
        let first = to_cells((f64::from(start) / cell).floor());
        let last = to_cells((f64::from(start + len) / cell).ceil());
        (first as u16, last as u16)
    }

    fn cells(&self, rect: Rect) -> CellRect {
        let area = self.buf.area;
        let (x0, x1) = Self::span(rect.x, rect.width, self.cell.cell_width, area.width);
        let (y0, y1) = Self::span(rect.y, rect.height, self.cell.cell_height, area.height);
        CellRect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

impl Canvas for BufferCanvas<'_> {
    fn draw_rect(&mut self, rect: Rect, color: Color) -> Result<(), HostError> {
        let cells = self.cells(rect);
        for y in cells.top()..cells.bottom() {
            for x in cells.left()..cells.right() {
                let cell = &mut self.buf[(x, y)];
                let shaded = theme::blend(color, cell.bg);
                cell.set_symbol(" ").set_bg(shaded);
            }
        }
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        _font: &FontSpec,
        position: Point,
        color: Color,
        clip: Rect,
    ) -> Result<(), HostError> {
        let clip = self.cells(clip);
        let col = (f64::from(position.x) / self.cell.cell_width).round();
        let row = (f64::from(position.y) / self.cell.cell_height).round();
        if row < f64::from(clip.top()) || row >= f64::from(clip.bottom()) {
            return Ok(());
        }

        let skipped = (f64::from(clip.left()) - col).max(0.0) as usize;
        let x = col.max(f64::from(clip.left())) as u16;
        if x >= clip.right() {
            return Ok(());
        }
        let visible: String = text.chars().skip(skipped).collect();
        let width = usize::from(clip.right() - x);
        self.buf.set_stringn(
            x,
            row as u16,
            visible,
            width,
            Style::default().fg(theme::solid(color)),
        );
        Ok(())
    }
}

/// Host collaborators backed by a terminal
pub struct TerminalHost {
    size: Cell<(u16, u16)>,
    cell: MonospaceMeasurer,
    hooks: RefCell<Vec<(FrameHookId, FrameHook)>>,
    next_hook: Cell<u64>,
    pressed: RefCell<HashSet<Key>>,
    paused: Cell<bool>,
    notices: RefCell<VecDeque<Notice>>,
    gate: ActivityGate,
}

impl TerminalHost {
    /// Host for a terminal of `cols` × `rows` cells
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            size: Cell::new((cols, rows)),
            cell: MonospaceMeasurer::terminal(),
            hooks: RefCell::new(Vec::new()),
            next_hook: Cell::new(0),
            pressed: RefCell::new(HashSet::new()),
            paused: Cell::new(false),
            notices: RefCell::new(VecDeque::new()),
            gate: ActivityGate::new(),
        }
    }

    /// Bundle this host as the queue's collaborators
    pub fn bundle(host: &Rc<Self>) -> Host {
        Host {
            render: host.clone(),
            input: host.clone(),
            pause: host.clone(),
            notifier: host.clone(),
            gate: host.gate.clone(),
        }
    }

    /// Cell metrics used for pixel conversion
    pub fn metrics(&self) -> MonospaceMeasurer {
        self.cell
    }

    /// Track a terminal resize
    pub fn resize(&self, cols: u16, rows: u16) {
        self.size.set((cols, rows));
    }

    /// Record a key press; it reads as down until the end of the frame
    pub fn press(&self, key: Key) {
        self.pressed.borrow_mut().insert(key);
    }

    /// Forget this frame's key presses
    pub fn end_frame(&self) {
        self.pressed.borrow_mut().clear();
    }

    /// Run every frame hook into `buf`
    pub fn render_into(&self, buf: &mut Buffer) {
        let hooks: Vec<FrameHook> = self.hooks.borrow().iter().map(|(_, h)| h.clone()).collect();
        let resolution = self.resolution();
        let mut canvas = BufferCanvas {
            buf,
            cell: self.cell,
        };
        for hook in hooks {
            hook(&mut canvas, resolution);
        }
    }

    /// Registered frame hooks
    pub fn hook_count(&self) -> usize {
        self.hooks.borrow().len()
    }

    /// Notices, oldest first
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().iter().cloned().collect()
    }
}

impl RenderSurface for TerminalHost {
    fn resolution(&self) -> Resolution {
        let (cols, rows) = self.size.get();
        Resolution::new(
            u32::from(cols) * self.cell.cell_width as u32,
            u32::from(rows) * self.cell.cell_height as u32,
        )
    }

    fn on_frame(&self, hook: FrameHook) -> FrameHookId {
        let id = FrameHookId(self.next_hook.get());
        self.next_hook.set(id.0 + 1);
        self.hooks.borrow_mut().push((id, hook));
        id
    }

    fn off_frame(&self, id: FrameHookId) {
        self.hooks.borrow_mut().retain(|(hook_id, _)| *hook_id != id);
    }
}

impl InputSource for TerminalHost {
    fn is_key_down(&self, key: Key) -> Result<bool, HostError> {
        Ok(self.pressed.borrow().contains(&key))
    }
}

impl HostPause for TerminalHost {
    fn set_paused(&self, paused: bool) {
        if self.paused.replace(paused) != paused {
            tracing::debug!(paused, "Scene pause changed");
        }
    }

    fn is_paused(&self) -> bool {
        self.paused.get()
    }
}

impl Notifier for TerminalHost {
    fn notify(&self, text: &str) {
        tracing::info!(notice = %text, "Notice");
        let mut notices = self.notices.borrow_mut();
        if notices.len() == MAX_NOTICES {
            notices.pop_front();
        }
        notices.push_back(Notice {
            at: Local::now(),
            text: text.to_string(),
        });
    }
}
