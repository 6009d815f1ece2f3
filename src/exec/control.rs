//! Cancellation, deadlines and progress for long-running stages.

use crate::util::{EftemError, EftemResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default stage timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Shared flag that requests early termination of a job.
///
/// Clones share the same flag. Row tasks check it before they start, so rows
/// that already began are finished and never left half-written.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-job progress counter, incremented once per finished row task.
#[derive(Clone, Debug, Default)]
pub struct Progress {
    done: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl Progress {
    /// Creates a counter with no work registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of finished row tasks.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    /// Number of row tasks registered for the current job.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Finished fraction in `[0, 1]`; `0` when no work is registered.
    pub fn fraction(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.done() as f32 / total as f32).min(1.0)
    }

    pub(crate) fn begin(&self, total: usize) {
        self.done.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    pub(crate) fn increment(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }
}

/// Caller-owned controls for a job: cancellation, timeout and progress.
#[derive(Clone, Debug)]
pub struct JobControl {
    /// Cancellation token checked at the start of each row task.
    pub cancel: CancelToken,
    /// Wall-clock budget for one stage; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Progress counter owned by this job.
    pub progress: Progress,
}

impl Default for JobControl {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            progress: Progress::new(),
        }
    }
}

impl JobControl {
    /// Controls with the given timeout and fresh token and counter.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// A running stage: fixes the deadline and records why rows were skipped.
pub(crate) struct Stage<'a> {
    name: &'static str,
    control: &'a JobControl,
    deadline: Option<Instant>,
    timed_out: AtomicBool,
    cancelled: AtomicBool,
}

impl<'a> Stage<'a> {
    /// Starts a stage of `total_rows` row tasks and resets the job progress.
    pub(crate) fn begin(control: &'a JobControl, name: &'static str, total_rows: usize) -> Self {
        control.progress.begin(total_rows);
        Self {
            name,
            control,
            deadline: control.timeout.and_then(|t| Instant::now().checked_add(t)),
            timed_out: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Returns `true` if the next row may run.
    pub(crate) fn enter_row(&self) -> bool {
        if self.control.cancel.is_cancelled() {
            self.cancelled.store(true, Ordering::Relaxed);
            return false;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out.store(true, Ordering::Relaxed);
                return false;
            }
        }
        true
    }

    pub(crate) fn row_done(&self) {
        self.control.progress.increment();
    }

    /// Fails if any row was skipped so far.
    pub(crate) fn check(&self) -> EftemResult<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(EftemError::Cancelled { stage: self.name });
        }
        if self.timed_out.load(Ordering::Relaxed) {
            return Err(EftemError::TimedOut {
                stage: self.name,
                timeout: self.control.timeout.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Like [`check`](Self::check), but also probes the token and deadline so
    /// that work between row batches can stop early.
    pub(crate) fn checkpoint(&self) -> EftemResult<()> {
        self.enter_row();
        self.check()
    }
}
