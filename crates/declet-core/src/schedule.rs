#![forbid(unsafe_code)]

//! Single-tick deferred task scheduling.
//!
//! A [`Scheduler`] accepts a task and returns a [`TaskHandle`]; the task runs
//! later, on the same thread, when the owner of the scheduler drives it.
//! Nodes receive the scheduler as an injected `Rc<dyn Scheduler>`.
//!
//! [`TickQueue`] is the cooperative implementation used by the tree:
//!
//! - `schedule()` only enqueues. Nothing runs synchronously.
//! - `tick()` runs the tasks that were queued when the tick began. Tasks
//!   scheduled while it runs wait for the next tick.
//! - `drain()` ticks until idle, bounded by
//!   [`SchedulerConfig::max_ticks_per_drain`].
//!
//! # Failure Modes
//!
//! - **Task returns `Err`**: logged at `ERROR`, reported in
//!   [`DrainReport::failures`], never retried. Remaining tasks still run.
//! - **Task keeps rescheduling**: `drain()` stops at the tick budget and sets
//!   [`DrainReport::exhausted`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{error, trace, warn};
use web_time::Instant;

use crate::config::SchedulerConfig;
use crate::error::BoxError;

/// Deferred unit of work.
pub type Task = Box<dyn FnOnce() -> Result<(), BoxError>>;

/// Identifier of a scheduled task, unique per scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Where a task is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Queued and not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Ran to completion (successfully or not).
    Finished,
    /// Cancelled before it started; it will never run.
    Unscheduled,
}

/// Defer a call until the scheduler's next drain.
pub trait Scheduler {
    /// Queue `task`. Implementations must not run it before returning.
    fn schedule(&self, label: &'static str, task: Task) -> TaskHandle;
}

/// Handle to a scheduled task.
///
/// Clones share state; unscheduling through any clone cancels the task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    label: &'static str,
    state: Rc<Cell<TaskState>>,
}

impl TaskHandle {
    /// Create a handle in the `Pending` state. Used by [`Scheduler`]
    /// implementations.
    #[must_use]
    pub fn new(id: TaskId, label: &'static str) -> Self {
        Self {
            id,
            label,
            state: Rc::new(Cell::new(TaskState::Pending)),
        }
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.get() == TaskState::Pending
    }

    /// Cancel the task if it has not started.
    ///
    /// Returns `true` when the task was pending and will now never run.
    pub fn unschedule(&self) -> bool {
        if self.is_pending() {
            self.state.set(TaskState::Unscheduled);
            trace!(message = "schedule.unschedule", task = %self.id, label = self.label);
            true
        } else {
            false
        }
    }

    /// Record a state transition. Used by [`Scheduler`] implementations.
    pub fn set_state(&self, state: TaskState) {
        self.state.set(state);
    }
}

/// A task that returned an error.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: TaskId,
    pub label: &'static str,
    pub error: BoxError,
}

/// Outcome of [`TickQueue::tick`] or [`TickQueue::drain`].
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Ticks executed.
    pub ticks: usize,
    /// Tasks that ran (including failed ones).
    pub ran: usize,
    /// Unscheduled tasks discarded without running.
    pub skipped: usize,
    /// Errors returned by tasks, in execution order.
    pub failures: Vec<TaskFailure>,
    /// `drain()` stopped at the tick budget with work still queued.
    pub exhausted: bool,
}

impl DrainReport {
    /// No task failed and the drain was not cut short.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.exhausted
    }

    fn absorb(&mut self, tick: DrainReport) {
        self.ticks += tick.ticks;
        self.ran += tick.ran;
        self.skipped += tick.skipped;
        self.failures.extend(tick.failures);
    }
}

struct Queued {
    handle: TaskHandle,
    task: Task,
}

/// Cooperative FIFO scheduler driven explicitly by its owner.
pub struct TickQueue {
    config: SchedulerConfig,
    queue: RefCell<VecDeque<Queued>>,
    next_id: Cell<u64>,
}

impl Default for TickQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TickQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickQueue")
            .field("config", &self.config)
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl TickQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            queue: RefCell::new(VecDeque::new()),
            next_id: Cell::new(1),
        }
    }

    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Tasks queued and still pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue
            .borrow()
            .iter()
            .filter(|queued| queued.handle.is_pending())
            .count()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending_count() == 0
    }

    /// Run every task queued before this call, in FIFO order.
    pub fn tick(&self) -> DrainReport {
        let batch: Vec<Queued> = self.queue.borrow_mut().drain(..).collect();
        let mut report = DrainReport {
            ticks: 1,
            ..DrainReport::default()
        };

        for Queued { handle, task } in batch {
            if !handle.is_pending() {
                report.skipped += 1;
                continue;
            }
            handle.set_state(TaskState::Running);
            let started = Instant::now();
            let outcome = task();
            handle.set_state(TaskState::Finished);
            report.ran += 1;

            let duration_us = started.elapsed().as_micros() as u64;
            match outcome {
                Ok(()) => trace!(
                    message = "tick_queue.task_finished",
                    task = %handle.id(),
                    label = handle.label(),
                    duration_us
                ),
                Err(err) => {
                    error!(
                        message = "tick_queue.task_failed",
                        task = %handle.id(),
                        label = handle.label(),
                        error = %err,
                        duration_us
                    );
                    report.failures.push(TaskFailure {
                        task: handle.id(),
                        label: handle.label(),
                        error: err,
                    });
                }
            }
        }
        report
    }

    /// Tick until no task is pending or the tick budget runs out.
    pub fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        while !self.is_idle() {
            if report.ticks >= self.config.max_ticks_per_drain {
                report.exhausted = true;
                warn!(
                    message = "tick_queue.drain_exhausted",
                    ticks = report.ticks,
                    pending = self.pending_count()
                );
                break;
            }
            report.absorb(self.tick());
        }
        report
    }
}

impl Scheduler for TickQueue {
    fn schedule(&self, label: &'static str, task: Task) -> TaskHandle {
        let id = TaskId::new(self.next_id.get());
        self.next_id.set(id.raw() + 1);
        let handle = TaskHandle::new(id, label);
        self.queue.borrow_mut().push_back(Queued {
            handle: handle.clone(),
            task,
        });
        trace!(message = "tick_queue.schedule", task = %id, label);
        handle
    }
}
