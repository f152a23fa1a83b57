//! Prompt Queue Manager and Display Driver
//!
//! The queue owns every pending prompt and the single active slot. Each
//! submission spawns one cooperative *display driver* for that lifetime:
//!
//! ```text
//!   Queued ──admitted──▶ Waiting(delay) ──▶ Presenting ──key/cancel/failure──▶ Done
//!     │                     │                   │
//!     │ head of queue?      │ gate claimed      │ frame hook registered
//!     │ slot free?          │ host paused       │ input polled every frame
//!     │ gate clear?         │ footer added      │ idle notice every 25s
//! ```
//!
//! Drivers yield to the host at exactly two places: the activation delay and
//! every iteration of the presenting loop. Admission and teardown are plain
//! state transitions on the queue state, so at most one prompt can ever hold
//! the active slot.
//!
//! Finished driver handles are parked in a teardown list and aborted by a
//! sweeper task on the next frame, which keeps a driver from aborting itself
//! while it is still running its completion callback.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use futures::FutureExt;
use thiserror::Error;

use crate::config::PopupConfig;
use crate::host::{ActivityGate, Canvas, FrameHookId, Host, HostError, Key, Resolution};
use crate::layout::{TextLayout, TextMeasurer};
use crate::prompt::{
    Answer, Completion, Prompt, PromptBuilder, PromptError, PromptId, PromptMode, PromptPhase,
    MAX_ANSWERS,
};
use crate::render::render_prompt;
use crate::scheduler::{Scheduler, SchedulerError, TaskHandle};

// ============================================================================
// Errors
// ============================================================================

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    /// The prompt already has a live lifetime in some queue
    #[error("prompt `{title}` ({id}) is already pending or active")]
    AlreadySubmitted {
        /// Prompt title
        title: String,
        /// Prompt id
        id: PromptId,
    },

    /// The display driver could not be started
    #[error(transparent)]
    Spawn(#[from] SchedulerError),

    /// A convenience constructor produced an invalid prompt
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

// ============================================================================
// State
// ============================================================================

/// One submission of a prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct LifetimeId(u64);

impl std::fmt::Display for LifetimeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Entry {
    prompt: Prompt,
    lifetime: LifetimeId,
}

struct ActiveSlot {
    prompt: Prompt,
    lifetime: LifetimeId,
    hook: Option<FrameHookId>,
    /// Pause value to restore on exit, when this prompt pauses the host
    restore_pause: Option<bool>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Entry>,
    forced: VecDeque<Entry>,
    active: Option<ActiveSlot>,
    drivers: HashMap<LifetimeId, TaskHandle>,
    teardown: Vec<TaskHandle>,
    sweeper: Option<TaskHandle>,
    next_lifetime: u64,
}

impl QueueState {
    fn is_queued(&self, lifetime: LifetimeId) -> bool {
        self.pending.iter().any(|e| e.lifetime == lifetime)
            || self.forced.iter().any(|e| e.lifetime == lifetime)
    }

    fn is_head(&self, lifetime: LifetimeId, forced: bool) -> bool {
        if forced {
            self.forced.front().is_some_and(|e| e.lifetime == lifetime)
        } else {
            self.forced.is_empty() && self.pending.front().is_some_and(|e| e.lifetime == lifetime)
        }
    }

    fn remove_queued(&mut self, lifetime: LifetimeId) -> Option<Entry> {
        if let Some(pos) = self.pending.iter().position(|e| e.lifetime == lifetime) {
            return self.pending.remove(pos);
        }
        if let Some(pos) = self.forced.iter().position(|e| e.lifetime == lifetime) {
            return self.forced.remove(pos);
        }
        None
    }

    fn lifetime_of(&self, prompt: &Prompt) -> Option<LifetimeId> {
        self.pending
            .iter()
            .chain(self.forced.iter())
            .find(|e| e.prompt.same(prompt))
            .map(|e| e.lifetime)
    }

    fn is_current(&self, lifetime: LifetimeId) -> bool {
        self.active.as_ref().is_some_and(|a| a.lifetime == lifetime)
    }

    fn retire_driver(&mut self, lifetime: LifetimeId) {
        if let Some(handle) = self.drivers.remove(&lifetime) {
            self.teardown.push(handle);
        }
    }
}

/// Read-only view of the queue
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Titles of ordinary queued prompts, head first
    pub pending: Vec<String>,
    /// Titles of forced prompts, head first
    pub forced: Vec<String>,
    /// The prompt holding the active slot
    pub active: Option<ActiveView>,
    /// Whether the activity gate is held
    pub gate_busy: bool,
    /// Driver handles awaiting the sweeper
    pub teardown: usize,
}

/// Active slot summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveView {
    /// Prompt id
    pub id: PromptId,
    /// Prompt title
    pub title: String,
    /// Waiting or Presenting
    pub phase: PromptPhase,
}

enum Admission {
    Admitted,
    Wait,
    Gone,
}

// ============================================================================
// Queue
// ============================================================================

struct QueueShared {
    state: RefCell<QueueState>,
    scheduler: Rc<dyn Scheduler>,
    host: Host,
    config: PopupConfig,
    layout: TextLayout,
    gate: ActivityGate,
}

/// The prompt queue
///
/// A cheap handle; clones share the same queue. Construct one per host and
/// pass it to whoever needs to show prompts.
#[derive(Clone)]
pub struct PromptQueue {
    shared: Rc<QueueShared>,
}

impl PromptQueue {
    /// Create an empty queue honouring the host's activity gate
    pub fn new(
        scheduler: Rc<dyn Scheduler>,
        host: Host,
        measurer: Rc<dyn TextMeasurer>,
        config: PopupConfig,
    ) -> Self {
        let gate = host.gate.clone();
        Self::with_gate(scheduler, host, measurer, config, gate)
    }

    /// Create an empty queue honouring `gate` instead of the host's
    pub fn with_gate(
        scheduler: Rc<dyn Scheduler>,
        host: Host,
        measurer: Rc<dyn TextMeasurer>,
        config: PopupConfig,
        gate: ActivityGate,
    ) -> Self {
        let layout = TextLayout::new(measurer, config.wrap_width, config.body_font.clone());
        Self {
            shared: Rc::new(QueueShared {
                state: RefCell::new(QueueState::default()),
                scheduler,
                host,
                config,
                layout,
                gate,
            }),
        }
    }

    /// Layout used to wrap prompt text for this queue
    #[must_use]
    pub fn layout(&self) -> &TextLayout {
        &self.shared.layout
    }

    /// Effective configuration
    #[must_use]
    pub fn config(&self) -> &PopupConfig {
        &self.shared.config
    }

    /// The activity gate this queue honours
    #[must_use]
    pub fn gate(&self) -> &ActivityGate {
        &self.shared.gate
    }

    /// Submit a prompt, starting a new lifetime for it
    ///
    /// Ordinary prompts join the tail of the queue. Forced prompts join the
    /// forced queue, which is drained first.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AlreadySubmitted`] if the prompt is already
    /// pending or active in any queue, and [`QueueError::Spawn`] if its driver cannot be
    /// started.
    pub fn submit(&self, prompt: &Prompt) -> Result<(), QueueError> {
        let lifetime = {
            let mut state = self.shared.state.borrow_mut();
            if prompt.is_live() {
                return Err(QueueError::AlreadySubmitted {
                    title: prompt.title().to_string(),
                    id: prompt.id(),
                });
            }
            state.next_lifetime += 1;
            LifetimeId(state.next_lifetime)
        };

        self.ensure_sweeper()?;

        let driver = drive(self.clone(), prompt.clone(), lifetime).boxed_local();
        let handle = self
            .shared
            .scheduler
            .spawn(&format!("prompt-driver:{}", prompt.id()), driver)?;

        prompt.reset_for_submit();
        prompt.set_live(true);
        let mut state = self.shared.state.borrow_mut();
        let entry = Entry {
            prompt: prompt.clone(),
            lifetime,
        };
        if prompt.forces_display() {
            state.forced.push_back(entry);
        } else {
            state.pending.push_back(entry);
        }
        state.drivers.insert(lifetime, handle);

        tracing::info!(
            prompt = %prompt.title(),
            id = %prompt.id(),
            %lifetime,
            forced = prompt.forces_display(),
            "Adding prompt to queue"
        );
        Ok(())
    }

    /// Build `builder` with this queue's layout and submit it
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Prompt`] for a malformed prompt, otherwise as
    /// [`PromptQueue::submit`].
    pub fn enqueue(&self, builder: PromptBuilder) -> Result<Prompt, QueueError> {
        let prompt = builder.build(&self.shared.layout)?;
        self.submit(&prompt)?;
        Ok(prompt)
    }

    /// Submit an acknowledgement prompt with `text`
    ///
    /// # Errors
    ///
    /// As [`PromptQueue::enqueue`].
    pub fn show_message(
        &self,
        title: impl Into<String>,
        text: impl Into<String>,
        pause_host: bool,
    ) -> Result<Prompt, QueueError> {
        self.enqueue(Prompt::message(title, text).pause_host(pause_host))
    }

    /// Cancel a prompt
    ///
    /// A pending prompt is dropped silently. The active prompt (waiting or
    /// presenting) resolves as [`Answer::Dismissed`] and its callback runs.
    /// Returns `false` if the prompt has no live lifetime here.
    pub fn cancel(&self, prompt: &Prompt) -> bool {
        let mut state = self.shared.state.borrow_mut();

        if let Some(lifetime) = state
            .active
            .as_ref()
            .filter(|a| a.prompt.same(prompt))
            .map(|a| a.lifetime)
        {
            drop(state);
            tracing::info!(prompt = %prompt.title(), %lifetime, "Cancelling active prompt");
            self.finish(prompt, lifetime, Ok(Answer::Dismissed));
            return true;
        }

        let Some(lifetime) = state.lifetime_of(prompt) else {
            return false;
        };
        state.remove_queued(lifetime);
        state.retire_driver(lifetime);
        prompt.set_live(false);
        prompt.set_phase(PromptPhase::Done);
        tracing::info!(prompt = %prompt.title(), %lifetime, "Removed pending prompt from queue");
        true
    }

    /// Prompt holding the active slot, if any
    #[must_use]
    pub fn active_prompt(&self) -> Option<Prompt> {
        self.shared
            .state
            .borrow()
            .active
            .as_ref()
            .map(|a| a.prompt.clone())
    }

    /// Number of prompts waiting for the active slot
    #[must_use]
    pub fn pending_len(&self) -> usize {
        let state = self.shared.state.borrow();
        state.pending.len() + state.forced.len()
    }

    /// Whether nothing is pending or active
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.borrow();
        state.active.is_none() && state.pending.is_empty() && state.forced.is_empty()
    }

    /// Read-only view for diagnostics
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.shared.state.borrow();
        let titles = |q: &VecDeque<Entry>| q.iter().map(|e| e.prompt.title().to_string()).collect();
        QueueSnapshot {
            pending: titles(&state.pending),
            forced: titles(&state.forced),
            active: state.active.as_ref().map(|a| ActiveView {
                id: a.prompt.id(),
                title: a.prompt.title().to_string(),
                phase: a.prompt.phase(),
            }),
            gate_busy: self.shared.gate.is_busy(),
            teardown: state.teardown.len(),
        }
    }

    // ------------------------------------------------------------------------
    // Driver transitions
    // ------------------------------------------------------------------------

    fn ensure_sweeper(&self) -> Result<(), QueueError> {
        if self.shared.state.borrow().sweeper.is_some() {
            return Ok(());
        }
        let handle = self
            .shared
            .scheduler
            .spawn("prompt-sweeper", sweep(Rc::downgrade(&self.shared)).boxed_local())?;
        self.shared.state.borrow_mut().sweeper = Some(handle);
        Ok(())
    }

    /// Queued → Waiting, if every admission condition holds
    fn try_admit(&self, prompt: &Prompt, lifetime: LifetimeId) -> Admission {
        let host = &self.shared.host;
        {
            let mut state = self.shared.state.borrow_mut();
            if !state.is_queued(lifetime) {
                return Admission::Gone;
            }
            let forced = prompt.forces_display();
            if state.active.is_some()
                || self.shared.gate.is_busy()
                || !state.is_head(lifetime, forced)
                || (!forced && host.pause.is_paused())
            {
                return Admission::Wait;
            }

            self.shared.gate.claim();
            state.active = Some(ActiveSlot {
                prompt: prompt.clone(),
                lifetime,
                hook: None,
                restore_pause: prompt.pauses_host().then(|| host.pause.is_paused()),
            });
        }

        prompt.set_phase(PromptPhase::Waiting);
        if prompt.pauses_host() {
            host.pause.set_paused(true);
        }
        if prompt.mode() == PromptMode::Acknowledge {
            let footer = self.shared.layout.wrap(&self.shared.config.confirmation_text);
            prompt.set_footer(footer.lines, footer.line_height);
        }
        tracing::debug!(prompt = %prompt.title(), %lifetime, "Prompt admitted to active slot");
        Admission::Admitted
    }

    /// Waiting → Presenting. Returns the render error cell the frame hook
    /// reports into, or `None` if the lifetime was cancelled meanwhile.
    fn begin_presenting(
        &self,
        prompt: &Prompt,
        lifetime: LifetimeId,
    ) -> Option<Rc<RefCell<Option<HostError>>>> {
        {
            let mut state = self.shared.state.borrow_mut();
            if !state.is_current(lifetime) {
                return None;
            }
            state.remove_queued(lifetime);
        }

        let render_error: Rc<RefCell<Option<HostError>>> = Rc::default();
        let hook = {
            let prompt = prompt.clone();
            let config = self.shared.config.clone();
            let errors = Rc::clone(&render_error);
            Rc::new(move |canvas: &mut dyn Canvas, resolution: Resolution| {
                if let Err(e) = render_prompt(&prompt, canvas, resolution, &config) {
                    errors.borrow_mut().get_or_insert(e);
                }
            })
        };
        let hook_id = self.shared.host.render.on_frame(hook);

        if let Some(slot) = self.shared.state.borrow_mut().active.as_mut() {
            slot.hook = Some(hook_id);
        }
        prompt.set_active(true);
        prompt.set_phase(PromptPhase::Presenting);
        tracing::info!(prompt = %prompt.title(), %lifetime, "Beginning to draw prompt");
        Some(render_error)
    }

    /// Poll the keys this prompt listens to, lowest answer key first
    fn poll_input(&self, prompt: &Prompt) -> Result<Option<Answer>, HostError> {
        let input = &self.shared.host.input;
        match prompt.mode() {
            PromptMode::Acknowledge => {
                if input.is_key_down(Key::Confirm)? {
                    tracing::info!(prompt = %prompt.title(), "Close key pressed");
                    return Ok(Some(Answer::Acknowledged));
                }
            }
            PromptMode::Answers => {
                let offered = prompt.answers().len().min(MAX_ANSWERS);
                for position in 0..offered {
                    if input.is_key_down(Key::answer(position))? {
                        let answer = prompt.answer_at_position(position).map(Answer::Selected);
                        tracing::info!(
                            prompt = %prompt.title(),
                            key = %Key::answer(position),
                            ?answer,
                            "Answer key pressed"
                        );
                        return Ok(answer);
                    }
                }
            }
            PromptMode::Silent => {}
        }
        Ok(None)
    }

    /// Resolving → Done: release everything, then run the callback
    fn finish(&self, prompt: &Prompt, lifetime: LifetimeId, result: Result<Answer, HostError>) {
        let slot = {
            let mut state = self.shared.state.borrow_mut();
            if !state.is_current(lifetime) {
                return;
            }
            let slot = state.active.take();
            state.remove_queued(lifetime);
            state.retire_driver(lifetime);
            slot
        };
        let Some(slot) = slot else {
            return;
        };

        let host = &self.shared.host;
        let was_presented = slot.hook.is_some();
        if let Some(hook) = slot.hook {
            host.render.off_frame(hook);
        }
        self.shared.gate.release();
        if let Some(previous) = slot.restore_pause {
            host.pause.set_paused(previous);
        }

        prompt.set_active(false);
        if was_presented {
            prompt.mark_displayed();
        }
        prompt.set_selected(result.as_ref().ok().and_then(Answer::index));
        prompt.set_phase(PromptPhase::Done);
        prompt.set_live(false);

        match &result {
            Ok(answer) => {
                tracing::debug!(prompt = %prompt.title(), %lifetime, ?answer, "Prompt resolved");
            }
            Err(e) => {
                tracing::warn!(prompt = %prompt.title(), %lifetime, error = %e, "Prompt ended by collaborator failure");
            }
        }

        if let Some(callback) = prompt.on_resolved() {
            callback(&Completion {
                prompt,
                result,
                queue: self,
            });
        }
    }

    fn is_current(&self, lifetime: LifetimeId) -> bool {
        self.shared.state.borrow().is_current(lifetime)
    }
}

impl std::fmt::Debug for PromptQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptQueue")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// Display driver for one lifetime of `prompt`
async fn drive(queue: PromptQueue, prompt: Prompt, lifetime: LifetimeId) {
    let scheduler = Rc::clone(&queue.shared.scheduler);

    loop {
        match queue.try_admit(&prompt, lifetime) {
            Admission::Admitted => break,
            Admission::Wait => scheduler.next_frame().await,
            Admission::Gone => return,
        }
    }

    scheduler.sleep(prompt.activation_delay()).await;

    let Some(render_error) = queue.begin_presenting(&prompt, lifetime) else {
        return;
    };

    let config = &queue.shared.config;
    let host = queue.shared.host.clone();
    let mut idle_since = scheduler.now();

    loop {
        if prompt.pauses_host() {
            host.pause.set_paused(true);
        }
        scheduler.next_frame().await;

        if !queue.is_current(lifetime) {
            return;
        }

        let failure = render_error.borrow_mut().take();
        if let Some(e) = failure {
            queue.finish(&prompt, lifetime, Err(e));
            return;
        }

        let now = scheduler.now();
        if now.saturating_sub(idle_since) > config.idle_notice_after {
            tracing::warn!(prompt = %prompt.title(), "Prompt still unanswered, notifying user");
            host.notifier.notify(&config.idle_notice_text);
            idle_since = now;
        }

        match queue.poll_input(&prompt) {
            Ok(Some(answer)) => {
                queue.finish(&prompt, lifetime, Ok(answer));
                return;
            }
            Ok(None) => {}
            Err(e) => {
                queue.finish(&prompt, lifetime, Err(e));
                return;
            }
        }
    }
}

/// Abort retired driver handles once per frame
async fn sweep(shared: Weak<QueueShared>) {
    loop {
        let frame = match shared.upgrade() {
            Some(shared) => shared.scheduler.next_frame(),
            None => return,
        };
        frame.await;

        let Some(shared) = shared.upgrade() else {
            return;
        };
        let retired = std::mem::take(&mut shared.state.borrow_mut().teardown);
        for handle in retired {
            tracing::trace!(task = %handle.id(), name = handle.name(), "Cleaning up prompt driver");
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_rules() {
        let mut state = QueueState::default();
        let layout = TextLayout::new(
            Rc::new(crate::layout::MonospaceMeasurer::terminal()),
            720.0,
            crate::layout::FontSpec::new("Arial Bold", 15.0),
        );
        let a = Prompt::message("a", "").build(&layout).unwrap();
        let b = Prompt::message("b", "").force_display(true).build(&layout).unwrap();
        state.pending.push_back(Entry {
            prompt: a,
            lifetime: LifetimeId(1),
        });
        assert!(state.is_head(LifetimeId(1), false));

        state.forced.push_back(Entry {
            prompt: b,
            lifetime: LifetimeId(2),
        });
        assert!(!state.is_head(LifetimeId(1), false));
        assert!(state.is_head(LifetimeId(2), true));

        assert!(state.remove_queued(LifetimeId(2)).is_some());
        assert!(state.is_head(LifetimeId(1), false));
        assert!(state.remove_queued(LifetimeId(2)).is_none());
    }
}
