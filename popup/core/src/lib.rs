//! Popup Core - Headless Modal Prompt Queue
//!
//! Prompts ("popups") are modal notifications and questions shown one at a
//! time over a host render surface. This crate owns the queue, the per-prompt
//! display drivers and the chained-dialog pattern; the host supplies drawing,
//! keyboard state, a pause switch and a notification channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Callers                               │
//! │    show_message()     enqueue()     Wizard / walkthroughs     │
//! └──────────────┬──────────────┬───────────────┬─────────────────┘
//!                ▼              ▼               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       PromptQueue                             │
//! │  pending FIFO · forced FIFO · active slot · teardown list     │
//! │        │ one display driver task per submission               │
//! │        ▼                                                       │
//! │  Queued → Waiting(delay) → Presenting → Done ──▶ on_resolved  │
//! └──────────┬────────────────────────────────┬──────────────────┘
//!            │ spawn / next_frame / sleep     │ on_frame · is_key_down
//!            ▼                                ▼ set_paused · notify
//! ┌─────────────────────┐          ┌──────────────────────────────┐
//! │   FrameScheduler     │◀─tick──│   Host (terminal, headless)   │
//! └─────────────────────┘          └──────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use popup_core::{HeadlessRuntime, Key, PopupConfig, Prompt};
//!
//! let runtime = HeadlessRuntime::new(PopupConfig::default());
//! let prompt = runtime
//!     .queue
//!     .enqueue(Prompt::question("Quiz", "Pick one", ["Red", "Blue"]))?;
//!
//! runtime.step_n(2);
//! runtime.host.tap(Key::Digit(2));
//! runtime.step();
//! assert_eq!(prompt.selected_answer_index(), Some(1));
//! ```
//!
//! # Module Overview
//!
//! - [`scheduler`]: Cooperative, frame-ticked executor
//! - [`layout`]: Greedy pixel-width word wrapping
//! - [`prompt`]: Prompt model and builder
//! - [`queue`]: Queue manager and display drivers
//! - [`render`]: Panel drawing
//! - [`host`]: Collaborator contracts
//! - [`wizard`]: Chained dialogs
//! - [`walkthrough`]: Dependency-error and update walkthroughs
//! - [`config`]: Configuration loading
//! - [`headless`]: In-memory host for tests and embedding
//!
//! # No UI Dependencies
//!
//! Nothing here depends on a terminal library or an async runtime. Any loop
//! that can call [`FrameScheduler::tick`] once per frame can host prompts.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod headless;
pub mod host;
pub mod layout;
pub mod prompt;
pub mod queue;
pub mod render;
pub mod scheduler;
pub mod walkthrough;
pub mod wizard;

pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigSource,
    PanelGeometry, PopupConfig, PopupToml,
};
pub use headless::{DrawCommand, HeadlessHost, HeadlessRuntime};
pub use host::{
    ActivityGate, Canvas, Color, FrameHook, FrameHookId, Host, HostError, HostPause, InputSource, Key,
    Notifier, Point, Rect, RenderSurface, Resolution,
};
pub use layout::{wrap_text, FontSpec, MonospaceMeasurer, TextLayout, TextMeasurer, TextSize, WrappedText};
pub use prompt::{
    Answer, Completion, OnResolved, Prompt, PromptBuilder, PromptError, PromptId, PromptMode,
    PromptPhase, MAX_ANSWERS, NO_ANSWER,
};
pub use queue::{ActiveView, PromptQueue, QueueError, QueueSnapshot};
pub use render::{render_prompt, PanelLayout};
pub use scheduler::{frame_interval, FrameScheduler, Scheduler, SchedulerError, TaskHandle, TaskId};
pub use walkthrough::{
    DependencyIssue, Deferral, ErrorWalkthrough, PendingUpdate, UpdateWalkthrough,
    WalkthroughActions, TROUBLESHOOTING_VIDEO_URL,
};
pub use wizard::{StepAction, Wizard};
