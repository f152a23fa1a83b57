//! Headless host
//!
//! An in-memory implementation of every host collaborator, plus a runtime
//! that steps the scheduler and the render hooks one frame at a time. Used by
//! the integration tests and by anything that needs to run prompts without a
//! screen.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use crate::config::PopupConfig;
use crate::host::{
    ActivityGate, Canvas, Color, FrameHook, FrameHookId, Host, HostError, HostPause, InputSource, Key,
    Notifier, Point, Rect, RenderSurface, Resolution,
};
use crate::layout::{FontSpec, MonospaceMeasurer};
use crate::queue::PromptQueue;
use crate::scheduler::FrameScheduler;

/// One recorded draw call
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// `draw_rect`
    Rect {
        /// Filled rectangle
        rect: Rect,
        /// Fill color
        color: Color,
    },
    /// `draw_text`
    Text {
        /// Text drawn
        text: String,
        /// Font family
        font: String,
        /// Top-left position
        position: Point,
    },
}

struct RecordingCanvas<'a> {
    commands: &'a mut Vec<DrawCommand>,
    failure: Option<String>,
}

impl Canvas for RecordingCanvas<'_> {
    fn draw_rect(&mut self, rect: Rect, color: Color) -> Result<(), HostError> {
        if let Some(ref reason) = self.failure {
            return Err(HostError::Render(reason.clone()));
        }
        self.commands.push(DrawCommand::Rect { rect, color });
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        font: &FontSpec,
        position: Point,
        _color: Color,
        _clip: Rect,
    ) -> Result<(), HostError> {
        if let Some(ref reason) = self.failure {
            return Err(HostError::Render(reason.clone()));
        }
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            font: font.family.clone(),
            position,
        });
        Ok(())
    }
}

/// In-memory host
#[derive(Default)]
pub struct HeadlessHost {
    resolution: Cell<Resolution>,
    hooks: RefCell<Vec<(FrameHookId, FrameHook)>>,
    next_hook: Cell<u64>,
    held: RefCell<HashSet<Key>>,
    tapped: RefCell<HashSet<Key>>,
    paused: Cell<bool>,
    pause_changes: RefCell<Vec<bool>>,
    notices: RefCell<Vec<String>>,
    last_frame: RefCell<Vec<DrawCommand>>,
    render_failure: RefCell<Option<String>>,
    input_failure: RefCell<Option<String>>,
    gate: ActivityGate,
}

impl HeadlessHost {
    /// Host with the given resolution
    #[must_use]
    pub fn new(resolution: Resolution) -> Self {
        let host = Self::default();
        host.resolution.set(resolution);
        host
    }

    /// Hold `key` down until [`HeadlessHost::release`]
    pub fn hold(&self, key: Key) {
        self.held.borrow_mut().insert(key);
    }

    /// Release a held key
    pub fn release(&self, key: Key) {
        self.held.borrow_mut().remove(&key);
    }

    /// Press `key` for the next frame only
    pub fn tap(&self, key: Key) {
        self.tapped.borrow_mut().insert(key);
    }

    /// Activity gate shared by every queue on this host
    #[must_use]
    pub fn gate(&self) -> &ActivityGate {
        &self.gate
    }

    /// Make every draw call fail with `reason`
    pub fn fail_rendering(&self, reason: impl Into<String>) {
        *self.render_failure.borrow_mut() = Some(reason.into());
    }

    /// Make every key poll fail with `reason`
    pub fn fail_input(&self, reason: impl Into<String>) {
        *self.input_failure.borrow_mut() = Some(reason.into());
    }

    /// Clear injected failures
    pub fn recover(&self) {
        *self.render_failure.borrow_mut() = None;
        *self.input_failure.borrow_mut() = None;
    }

    /// Run every frame hook once, recording the draw calls
    pub fn render_frame(&self) {
        let hooks: Vec<FrameHook> = self.hooks.borrow().iter().map(|(_, h)| Rc::clone(h)).collect();
        let mut commands = Vec::new();
        {
            let mut canvas = RecordingCanvas {
                commands: &mut commands,
                failure: self.render_failure.borrow().clone(),
            };
            for hook in hooks {
                hook(&mut canvas, self.resolution.get());
            }
        }
        *self.last_frame.borrow_mut() = commands;
        self.tapped.borrow_mut().clear();
    }

    /// Draw calls of the last rendered frame
    #[must_use]
    pub fn last_frame(&self) -> Vec<DrawCommand> {
        self.last_frame.borrow().clone()
    }

    /// Text drawn in the last rendered frame
    #[must_use]
    pub fn last_frame_text(&self) -> Vec<String> {
        self.last_frame
            .borrow()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                DrawCommand::Rect { .. } => None,
            })
            .collect()
    }

    /// Registered frame hooks
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.borrow().len()
    }

    /// Notifications sent so far
    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        self.notices.borrow().clone()
    }

    /// Every change of the pause flag, in order
    #[must_use]
    pub fn pause_changes(&self) -> Vec<bool> {
        self.pause_changes.borrow().clone()
    }
}

impl RenderSurface for HeadlessHost {
    fn resolution(&self) -> Resolution {
        self.resolution.get()
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

impl InputSource for HeadlessHost {
    fn is_key_down(&self, key: Key) -> Result<bool, HostError> {
        if let Some(ref reason) = *self.input_failure.borrow() {
            return Err(HostError::Input(reason.clone()));
        }
        Ok(self.held.borrow().contains(&key) || self.tapped.borrow().contains(&key))
    }
}

impl HostPause for HeadlessHost {
    fn set_paused(&self, paused: bool) {
        if self.paused.replace(paused) != paused {
            self.pause_changes.borrow_mut().push(paused);
        }
    }

    fn is_paused(&self) -> bool {
        self.paused.get()
    }
}

impl Notifier for HeadlessHost {
    fn notify(&self, text: &str) {
        self.notices.borrow_mut().push(text.to_string());
    }
}

/// Scheduler, headless host and queue stepped together
pub struct HeadlessRuntime {
    /// Frame scheduler
    pub scheduler: Rc<FrameScheduler>,
    /// Host collaborators
    pub host: Rc<HeadlessHost>,
    /// Queue under test
    pub queue: PromptQueue,
    frame: Duration,
}

impl HeadlessRuntime {
    /// Length of one simulated frame
    pub const FRAME: Duration = Duration::from_millis(16);

    /// 1920×1080 runtime with terminal metrics
    #[must_use]
    pub fn new(config: PopupConfig) -> Self {
        let host = HeadlessHost::new(Resolution::new(1920, 1080));
        let gate = host.gate().clone();
        Self::build(config, host, gate)
    }

    /// Runtime whose queue honours `gate` instead of the host's
    #[must_use]
    pub fn with_gate(config: PopupConfig, gate: ActivityGate) -> Self {
        Self::build(config, HeadlessHost::new(Resolution::new(1920, 1080)), gate)
    }

    fn build(config: PopupConfig, host: HeadlessHost, gate: ActivityGate) -> Self {
        let scheduler = Rc::new(FrameScheduler::new());
        let host = Rc::new(host);
        let bundle = Self::bundle(&host);
        let queue = PromptQueue::with_gate(
            scheduler.clone(),
            bundle,
            Rc::new(MonospaceMeasurer::terminal()),
            config,
            gate,
        );
        Self {
            scheduler,
            host,
            queue,
            frame: Self::FRAME,
        }
    }

    fn bundle(host: &Rc<HeadlessHost>) -> Host {
        Host {
            render: host.clone(),
            input: host.clone(),
            pause: host.clone(),
            notifier: host.clone(),
            gate: host.gate().clone(),
        }
    }

    /// Another queue on the same scheduler and host, honouring the host's gate
    #[must_use]
    pub fn sibling_queue(&self) -> PromptQueue {
        PromptQueue::new(
            self.scheduler.clone(),
            Self::bundle(&self.host),
            Rc::new(MonospaceMeasurer::terminal()),
            self.queue.config().clone(),
        )
    }

    /// Another queue on the same scheduler and host, honouring `gate`
    #[must_use]
    pub fn extra_queue(&self, gate: ActivityGate) -> PromptQueue {
        PromptQueue::with_gate(
            self.scheduler.clone(),
            Self::bundle(&self.host),
            Rc::new(MonospaceMeasurer::terminal()),
            self.queue.config().clone(),
            gate,
        )
    }

    /// Advance one frame: tick the scheduler, then render
    pub fn step(&self) {
        self.scheduler.tick(self.frame);
        self.host.render_frame();
    }

    /// Advance `frames` frames
    pub fn step_n(&self, frames: usize) {
        for _ in 0..frames {
            self.step();
        }
    }

    /// Step until `done` holds, up to `max_frames`. Returns whether it held.
    pub fn run_until(&self, max_frames: usize, mut done: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..max_frames {
            if done(self) {
                return true;
            }
            self.step();
        }
        done(self)
    }
}
