//! Dedicated thread for cache maintenance.
//!
//! Disk initialization, clearing, flushing and closing touch the file system
//! and may take a while, so they run on their own single thread, in the
//! order they were requested and independently of image loads.

use crate::worker::{WorkerPool, WorkerPoolConfig};
use std::fmt;
use std::io;
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Kind of maintenance operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Init,
    Clear,
    Flush,
    Close,
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheOp::Init => "init",
            CacheOp::Clear => "clear",
            CacheOp::Flush => "flush",
            CacheOp::Close => "close",
        };
        f.write_str(name)
    }
}

struct CacheJob {
    op: CacheOp,
    task: Box<dyn FnOnce() + Send>,
    done: mpsc::Sender<()>,
}

/// Handle to a scheduled maintenance operation
///
/// Dropping it does not cancel the operation.
#[must_use = "a Completion does nothing unless waited on"]
pub struct Completion {
    done: mpsc::Receiver<()>,
}

impl Completion {
    /// Block until the operation finishes.
    ///
    /// Returns false if it was dropped without running, which happens when
    /// the cache thread shuts down first.
    pub fn wait(self) -> bool {
        self.done.recv().is_ok()
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> bool {
        self.done.recv_timeout(timeout).is_ok()
    }
}

/// Single background thread running [`CacheOp`]s in FIFO order
pub struct CacheThread {
    pool: WorkerPool<CacheJob>,
}

impl CacheThread {
    pub fn new(poll_interval: Duration) -> io::Result<Self> {
        let executor = Arc::new(|job: CacheJob| {
            tracing::debug!(op = %job.op, "running cache maintenance");
            (job.task)();
            // The caller may have dropped its Completion
            let _ = job.done.send(());
        });
        let pool = WorkerPool::new(
            "thumbgrid-cache",
            executor,
            WorkerPoolConfig::new(1).with_poll_interval(poll_interval),
        )?;
        Ok(Self { pool })
    }

    /// Queue `task` and return a handle to wait on.
    pub fn schedule<F>(&self, op: CacheOp, task: F) -> Completion
    where
        F: FnOnce() + Send + 'static,
    {
        let (done, rx) = mpsc::channel();
        let job = CacheJob {
            op,
            task: Box::new(task),
            done,
        };
        if !self.pool.submit(job) {
            tracing::warn!(op = %op, "cache thread is shut down, dropping operation");
        }
        Completion { done: rx }
    }

    /// Number of operations not yet started
    pub fn pending(&self) -> usize {
        self.pool.pending()
    }

    /// Block until every queued operation has been picked up
    pub fn drain(&self) {
        self.pool.drain();
    }

    /// Stop the thread after the current operation and wait for it.
    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}
