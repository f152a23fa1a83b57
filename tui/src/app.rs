//! Main Application
//!
//! The App struct owns the frame loop that hosts the prompt queue:
//! - Event loop (keyboard, resize) feeding key presses to the host
//! - One scheduler tick per frame, which runs every prompt driver
//! - Layered rendering of the scene, notices, status line and prompts
//!
//! # Frame order
//!
//! 1. Key presses since the last frame are recorded on the host
//! 2. `FrameScheduler::tick` runs the drivers, which poll those keys
//! 3. The scene advances unless the host is paused
//! 4. Layers are drawn and composited; the prompt overlay runs the frame hooks
//! 5. The frame's key presses are forgotten

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::StatefulWidget;
use ratatui::Terminal;
use tokio::time::Instant;

use popup_core::{
    frame_interval, FrameScheduler, HostPause, Notifier, PanelLayout, PopupConfig, PromptQueue,
    RenderSurface, Scheduler,
};

use crate::compositor::{Compositor, LayerId};
use crate::input::{command_for, Command};
use crate::scenarios::{self, Scenario};
use crate::scene::Scene;
use crate::schedule::TerminalActions;
use crate::surface::TerminalHost;
use crate::theme::{NOTICE_TEXT, PAUSED_AMBER, STATUS_TEXT};
use crate::widgets::text_block::{TextBlock, TextBlockState};

/// Notice log height (lines)
const NOTICE_HEIGHT: u16 = 6;

/// Notice log width (columns)
const NOTICE_WIDTH: u16 = 64;

/// Startup options
#[derive(Clone, Debug)]
pub struct AppOptions {
    /// Target frames per second
    pub fps: u32,
    /// Prompts queued at startup
    pub scenario: Scenario,
    /// Where update-check choices are persisted (`None` keeps them in memory)
    pub schedule_path: Option<PathBuf>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            scenario: Scenario::Welcome,
            schedule_path: None,
        }
    }
}

/// Layer IDs for UI regions
struct AppLayers {
    scene: LayerId,
    notices: LayerId,
    status: LayerId,
    prompts: LayerId,
}

/// Main application state
pub struct App {
    /// Is the app still running?
    running: bool,

    // === Prompt hosting ===
    scheduler: Rc<FrameScheduler>,
    host: Rc<TerminalHost>,
    queue: PromptQueue,
    actions: Rc<TerminalActions>,
    frame_duration: Duration,

    // === UI Components ===
    compositor: Compositor,
    layers: AppLayers,
    scene: Scene,
    notice_state: TextBlockState,

    /// Messages queued with `m`, for numbering
    messages_sent: usize,
}

/// Bounds of each layer for a terminal area
fn layer_bounds(area: Rect) -> (Rect, Rect, Rect) {
    let status = Rect::new(0, area.height.saturating_sub(1), area.width, area.height.min(1));
    let notice_height = NOTICE_HEIGHT.min(area.height.saturating_sub(1));
    let notices = Rect::new(
        1,
        area.height.saturating_sub(1 + notice_height),
        NOTICE_WIDTH.min(area.width.saturating_sub(2)),
        notice_height,
    );
    (area, notices, status)
}

impl App {
    /// Create an app for a terminal of `size` (columns, rows)
    pub fn new(size: (u16, u16), config: PopupConfig, options: &AppOptions) -> anyhow::Result<Self> {
        let area = Rect::new(0, 0, size.0, size.1);
        let mut compositor = Compositor::new(area);

        let (full, notice_bounds, status_bounds) = layer_bounds(area);
        let layers = AppLayers {
            scene: compositor.create_layer(full, 0),
            notices: compositor.create_layer(notice_bounds, 10),
            status: compositor.create_layer(status_bounds, 20),
            prompts: compositor.create_layer(full, 50),
        };

        let scheduler = Rc::new(FrameScheduler::new());
        let host = Rc::new(TerminalHost::new(size.0, size.1));
        let queue = PromptQueue::new(
            scheduler.clone(),
            TerminalHost::bundle(&host),
            Rc::new(host.metrics()),
            config,
        );
        let actions = Rc::new(TerminalActions::new(
            options.schedule_path.clone(),
            host.clone(),
        ));

        scenarios::launch(options.scenario, &queue, &actions)?;

        Ok(Self {
            running: true,
            scheduler,
            host,
            queue,
            actions,
            frame_duration: frame_interval(options.fps),
            compositor,
            layers,
            scene: Scene::new(size.0, size.1),
            notice_state: TextBlockState::default(),
            messages_sent: 0,
        })
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut last_frame = Instant::now();
        let mut next_frame = last_frame + self.frame_duration;

        // Render initial frame immediately so user sees UI
        self.draw(terminal)?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events first; presses are held until the next frame
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key);
                    }
                    Some(Ok(Event::Resize(w, h))) => self.handle_resize(w, h),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => self.running = false,
                },

                // Frame tick
                () = tokio::time::sleep_until(next_frame) => {
                    let now = Instant::now();
                    self.frame(now.duration_since(last_frame));
                    last_frame = now;

                    next_frame += self.frame_duration;
                    if next_frame < now {
                        tracing::debug!("Frame deadline missed, resynchronizing");
                        next_frame = now + self.frame_duration;
                    }

                    self.draw(terminal)?;
                }
            }
        }

        tracing::info!(frames = self.scheduler.frame(), "Leaving frame loop");
        Ok(())
    }

    /// Advance one frame: run the prompt drivers, then the scene
    pub fn frame(&mut self, dt: Duration) {
        self.scheduler.tick(dt);
        self.scene.update(dt, self.host.is_paused());
    }

    /// Draw the composited frame and end the frame's input
    pub fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        self.render_layers();

        let output = self.compositor.composite();
        terminal.draw(|frame| {
            let area = frame.area();
            let buf = frame.buffer_mut();
            for y in 0..area.height.min(output.area.height) {
                for x in 0..area.width.min(output.area.width) {
                    buf[(x, y)] = output[(x, y)].clone();
                }
            }
        })?;

        self.host.end_frame();
        Ok(())
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        if let Some(command) = command_for(key) {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: Command) {
        let queued = match command {
            Command::Prompt(key) => {
                self.host.press(key);
                Ok(())
            }
            Command::Message => {
                self.messages_sent += 1;
                scenarios::message(&self.queue, self.messages_sent)
            }
            Command::Quiz => scenarios::quiz(&self.queue),
            Command::Urgent => scenarios::urgent(&self.queue),
            Command::Updates => scenarios::updates(&self.queue, &self.actions),
            Command::Errors => scenarios::errors(&self.queue, &self.actions),
            Command::Cancel => {
                if let Some(prompt) = self.queue.active_prompt() {
                    tracing::info!(prompt = %prompt.id(), "Cancelling active prompt");
                    self.queue.cancel(&prompt);
                }
                Ok(())
            }
            Command::TogglePause => {
                let paused = !self.host.is_paused();
                self.host.set_paused(paused);
                self.host
                    .notify(if paused { "Scene paused" } else { "Scene resumed" });
                Ok(())
            }
            Command::Quit => {
                self.running = false;
                Ok(())
            }
        };

        if let Err(e) = queued {
            tracing::warn!(error = %e, ?command, "Failed to queue prompt");
            self.host.notify(&format!("Could not queue prompt: {e}"));
        }
    }

    /// Handle terminal resize
    pub fn handle_resize(&mut self, width: u16, height: u16) {
        let area = Rect::new(0, 0, width, height);
        self.compositor.resize(area);

        let (full, notices, status) = layer_bounds(area);
        self.compositor.place_layer(self.layers.scene, full);
        self.compositor.place_layer(self.layers.notices, notices);
        self.compositor.place_layer(self.layers.status, status);
        self.compositor.place_layer(self.layers.prompts, full);

        self.scene.resize(width, height);
        self.host.resize(width, height);
    }

    /// Whether the loop should keep running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The queue this app hosts
    pub fn queue(&self) -> &PromptQueue {
        &self.queue
    }

    /// The terminal host
    pub fn host(&self) -> &Rc<TerminalHost> {
        &self.host
    }

    fn render_layers(&mut self) {
        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.scene) {
            self.scene.render(buf);
        }

        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.prompts) {
            buf.reset();
            self.host.render_into(buf);
        }

        let lines: Vec<String> = self
            .host
            .notices()
            .iter()
            .map(|n| format!("[{}] {}", n.at.format("%H:%M:%S"), n.text))
            .collect();
        self.compositor
            .set_visible(self.layers.notices, !lines.is_empty());
        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.notices) {
            buf.reset();
            let area = buf.area;
            TextBlock::new(&lines)
                .style(Style::default().fg(NOTICE_TEXT))
                .render(area, buf, &mut self.notice_state);
        }

        let status = self.status_line();
        let paused = self.host.is_paused();
        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.status) {
            buf.reset();
            let area = buf.area;
            let style = if paused {
                Style::default().fg(PAUSED_AMBER)
            } else {
                Style::default().fg(STATUS_TEXT)
            };
            buf.set_stringn(area.x, area.y, &status, area.width as usize, style);
        }
    }

    fn status_line(&self) -> String {
        let snapshot = self.queue.snapshot();
        let active = snapshot
            .active
            .map_or_else(|| "none".to_string(), |a| format!("{} ({})", a.title, a.phase));
        let scene = if self.host.is_paused() { "PAUSED" } else { "running" };

        let resolution = self.host.resolution();
        let panel = PanelLayout::for_resolution(resolution, self.queue.config()).border;
        let fit = if panel.x + panel.width > resolution.width as f32 {
            " | widen the terminal to fit prompts"
        } else {
            ""
        };

        format!(
            " scene {scene} | active: {active} | pending: {} | Esc to quit{fit}",
            snapshot.pending.len() + snapshot.forced.len()
        )
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("running", &self.running)
            .field("queue", &self.queue)
            .field("frame_duration", &self.frame_duration)
            .finish_non_exhaustive()
    }
}
