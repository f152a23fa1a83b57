//! Cooperative Scheduler Adapter
//!
//! The popup subsystem shares a single-threaded execution context with the
//! host's frame loop. Work is expressed as local futures that yield back to
//! the host every frame; nothing here ever blocks the host thread.
//!
//! # Design Philosophy
//!
//! The host owns the loop. Once per frame it calls [`FrameScheduler::tick`],
//! which advances the frame clock, wakes every task waiting on the frame and
//! runs the executor until no task can make progress. Tasks only suspend at
//! [`Scheduler::next_frame`] and [`Scheduler::sleep`], so a tick is a
//! deterministic unit of work and tests can step the world frame by frame.
//!
//! ```text
//! host frame loop ──tick(dt)──▶ FrameClock (frame += 1, now += dt)
//!                                   │ wake waiters
//!                                   ▼
//!                              LocalPool::run_until_stalled()
//!                                   │
//!                     ┌─────────────┼─────────────┐
//!                  driver A      driver B      sweeper
//! ```

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{AbortHandle, Abortable, LocalBoxFuture};
use futures::task::{LocalSpawnExt, SpawnError};
use futures::FutureExt;
use thiserror::Error;

/// Errors raised by a scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The executor refused the task (usually because it has shut down)
    #[error("failed to spawn cooperative task `{name}`: {source}")]
    Spawn {
        /// Name the task was spawned under
        name: String,
        /// Underlying executor error
        source: SpawnError,
    },
}

/// Identifier of a spawned cooperative task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Handle to a cooperative task
///
/// Aborting drops the task at its next suspension point. Aborting a task that
/// already ran to completion does nothing.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: TaskId,
    name: Rc<str>,
    abort: AbortHandle,
    finished: Rc<Cell<bool>>,
}

impl TaskHandle {
    /// Task identifier
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Name the task was spawned under
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the task ran to completion
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Whether the task was aborted
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Abort the task
    pub fn abort(&self) {
        if !self.is_finished() {
            self.abort.abort();
        }
    }
}

/// The cooperative primitives the display drivers are built on
pub trait Scheduler {
    /// Start a cooperative task. It first runs the next time the executor runs.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Spawn`] if the executor is gone.
    fn spawn(
        &self,
        name: &str,
        task: LocalBoxFuture<'static, ()>,
    ) -> Result<TaskHandle, SchedulerError>;

    /// Yield until the next frame
    fn next_frame(&self) -> LocalBoxFuture<'static, ()>;

    /// Yield for at least one frame, then until `duration` has elapsed on the
    /// frame clock
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;

    /// Current reading of the frame clock
    fn now(&self) -> Duration;

    /// Number of frames ticked so far
    fn frame(&self) -> u64;
}

/// Duration of one frame at `fps` frames per second
#[must_use]
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

// ============================================================================
// Frame clock
// ============================================================================

#[derive(Default)]
struct FrameClock {
    frame: Cell<u64>,
    now: Cell<Duration>,
    waiters: RefCell<Vec<Waker>>,
}

impl FrameClock {
    fn advance(&self, dt: Duration) {
        self.frame.set(self.frame.get() + 1);
        self.now.set(self.now.get() + dt);
        let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
        for waker in waiters {
            waker.wake();
        }
    }

    fn register(&self, waker: &Waker) {
        let mut waiters = self.waiters.borrow_mut();
        if !waiters.iter().any(|w| w.will_wake(waker)) {
            waiters.push(waker.clone());
        }
    }
}

/// Resolves once the frame counter reaches `frame` and the clock reaches
/// `deadline`
struct FrameWait {
    clock: Rc<FrameClock>,
    frame: u64,
    deadline: Duration,
}

impl Future for FrameWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.clock.frame.get() >= self.frame && self.clock.now.get() >= self.deadline {
            Poll::Ready(())
        } else {
            self.clock.register(cx.waker());
            Poll::Pending
        }
    }
}

// ============================================================================
// Frame scheduler
// ============================================================================

/// Single-threaded, host-ticked scheduler
///
/// Cheap to share behind an `Rc`; hand it to the queue as `Rc<dyn Scheduler>`
/// and keep a concrete `Rc<FrameScheduler>` in the host loop for ticking.
pub struct FrameScheduler {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    clock: Rc<FrameClock>,
}

impl FrameScheduler {
    /// Create a scheduler with the clock at zero
    #[must_use]
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
            clock: Rc::new(FrameClock::default()),
        }
    }

    /// Advance one frame by `dt` and run every task that became ready
    ///
    /// Must be called from the host loop, never from inside a task.
    pub fn tick(&self, dt: Duration) {
        self.clock.advance(dt);
        self.pool.borrow_mut().run_until_stalled();
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for FrameScheduler {
    fn spawn(
        &self,
        name: &str,
        task: LocalBoxFuture<'static, ()>,
    ) -> Result<TaskHandle, SchedulerError> {
        let (abort, registration) = AbortHandle::new_pair();
        let finished = Rc::new(Cell::new(false));
        let done = Rc::clone(&finished);
        let id = TaskId::next();

        let wrapped = Abortable::new(task, registration).map(move |result| {
            if result.is_ok() {
                done.set(true);
            } else {
                tracing::trace!(task = %id, "cooperative task aborted");
            }
        });

        self.spawner
            .spawn_local(wrapped)
            .map_err(|source| SchedulerError::Spawn {
                name: name.to_string(),
                source,
            })?;

        tracing::trace!(task = %id, name, "cooperative task spawned");
        Ok(TaskHandle {
            id,
            name: Rc::from(name),
            abort,
            finished,
        })
    }

    fn next_frame(&self) -> LocalBoxFuture<'static, ()> {
        FrameWait {
            clock: Rc::clone(&self.clock),
            frame: self.clock.frame.get() + 1,
            deadline: Duration::ZERO,
        }
        .boxed_local()
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        FrameWait {
            clock: Rc::clone(&self.clock),
            frame: self.clock.frame.get() + 1,
            deadline: self.clock.now.get() + duration,
        }
        .boxed_local()
    }

    fn now(&self) -> Duration {
        self.clock.now.get()
    }

    fn frame(&self) -> u64 {
        self.clock.frame.get()
    }
}
