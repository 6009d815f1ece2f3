//! Row-parallel execution shared by the correlation and mapping engines.
//!
//! Both engines split their output into disjoint rows and hand each row to an
//! independent task. With the `rayon` feature the tasks run on a reusable
//! fixed-size thread pool; without it they run in order on the calling thread.

mod control;

pub use control::{CancelToken, JobControl, Progress, DEFAULT_TIMEOUT};
pub(crate) use control::Stage;

use crate::util::EftemResult;
#[cfg(feature = "rayon")]
use crate::util::EftemError;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "rayon")]
use std::sync::Arc;

/// Worker pool reused across jobs.
///
/// Cloning is cheap; clones share the same threads.
#[derive(Clone)]
pub struct WorkerPool {
    #[cfg(feature = "rayon")]
    pool: Arc<rayon::ThreadPool>,
    threads: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .finish()
    }
}

impl WorkerPool {
    /// Creates a pool with `threads` workers; `0` uses the available
    /// hardware parallelism.
    pub fn new(threads: usize) -> EftemResult<Self> {
        let threads = if threads == 0 {
            available_threads()
        } else {
            threads
        };

        #[cfg(feature = "rayon")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|idx| format!("eftem-worker-{idx}"))
                .build()
                .map_err(|err| EftemError::ThreadPool {
                    reason: err.to_string(),
                })?;
            Ok(Self {
                pool: Arc::new(pool),
                threads,
            })
        }

        #[cfg(not(feature = "rayon"))]
        {
            let _ = threads;
            Ok(Self { threads: 1 })
        }
    }

    /// Creates a pool sized to the available hardware parallelism.
    pub fn with_available_parallelism() -> EftemResult<Self> {
        Self::new(0)
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Runs `task(index, row)` once per row handle unless the stage is
    /// cancelled or past its deadline when the row would start.
    ///
    /// Rows are independent; their completion order is unspecified.
    pub(crate) fn for_each_row<R, F>(&self, stage: &Stage<'_>, rows: Vec<R>, task: F)
    where
        R: Send,
        F: Fn(usize, R) + Sync + Send,
    {
        let run = |(idx, row): (usize, R)| {
            if !stage.enter_row() {
                return;
            }
            task(idx, row);
            stage.row_done();
        };

        #[cfg(feature = "rayon")]
        self.pool
            .install(|| rows.into_par_iter().enumerate().for_each(run));

        #[cfg(not(feature = "rayon"))]
        rows.into_iter().enumerate().for_each(run);
    }
}

fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
