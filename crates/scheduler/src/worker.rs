//! Fixed-size worker pool.
//!
//! Workers pull jobs from a shared FIFO [`JobQueue`] and hand each one to the
//! pool's executor. Cancellation is the executor's business: jobs carry
//! their own tokens.

use crate::queue::JobQueue;
use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Callback run on a worker thread for every job taken from the queue.
pub type JobExecutor<J> = Arc<dyn Fn(J) + Send + Sync>;

/// Configuration for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads to spawn.
    /// Default: 2.
    pub num_workers: usize,

    /// Maximum time an idle worker waits for a job before checking shutdown.
    /// Default: 100ms.
    pub poll_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl WorkerPoolConfig {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Pool of named worker threads executing jobs in submission order.
///
/// Dropping the pool signals its workers to stop once their current job
/// returns, without waiting for them. Use [`shutdown`](Self::shutdown) to
/// wait. Jobs still queued at shutdown are dropped unexecuted.
///
/// # Example
///
/// ```
/// use std::sync::{atomic::{AtomicUsize, Ordering}, Arc};
/// use thumbgrid_scheduler::{WorkerPool, WorkerPoolConfig};
///
/// let total = Arc::new(AtomicUsize::new(0));
/// let sum = Arc::clone(&total);
/// let pool = WorkerPool::new(
///     "adder",
///     Arc::new(move |n: usize| {
///         sum.fetch_add(n, Ordering::SeqCst);
///     }),
///     WorkerPoolConfig::new(2),
/// )
/// .unwrap();
///
/// pool.submit(1);
/// pool.submit(2);
/// pool.drain();
/// pool.shutdown();
/// assert_eq!(total.load(Ordering::SeqCst), 3);
/// ```
pub struct WorkerPool<J: Send + 'static> {
    queue: Arc<JobQueue<J>>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Spawn `config.num_workers` threads named `{name}-{index}`.
    pub fn new(name: &str, executor: JobExecutor<J>, config: WorkerPoolConfig) -> io::Result<Self> {
        let queue = Arc::new(JobQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(config.num_workers);

        for id in 0..config.num_workers.max(1) {
            let worker_queue = Arc::clone(&queue);
            let executor = Arc::clone(&executor);
            let worker_shutdown = Arc::clone(&shutdown);
            let poll_interval = config.poll_interval;
            let spawned = thread::Builder::new()
                .name(format!("{name}-{id}"))
                .spawn(move || run(worker_queue, executor, worker_shutdown, poll_interval));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    shutdown.store(true, Ordering::Release);
                    queue.wake_all();
                    return Err(err);
                }
            }
        }

        Ok(Self {
            queue,
            workers,
            shutdown,
            poll_interval: config.poll_interval,
        })
    }

    /// Queue a job. Returns false if the pool is shutting down.
    pub fn submit(&self, job: J) -> bool {
        if self.is_shutting_down() {
            return false;
        }
        self.queue.push(job);
        true
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Number of jobs waiting for a worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Block until the queue is empty.
    ///
    /// Jobs already taken by a worker may still be running on return.
    pub fn drain(&self) {
        while !self.queue.is_empty() {
            thread::sleep(self.poll_interval.min(Duration::from_millis(5)));
        }
    }

    /// Stop the workers and wait for them to exit.
    pub fn shutdown(mut self) {
        self.signal_shutdown();
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().map(str::to_owned);
            if worker.join().is_err() {
                tracing::error!(worker = ?name, "worker thread panicked");
            }
        }
    }

    fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let dropped = self.queue.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "dropping queued jobs at shutdown");
        }
        self.queue.wake_all();
    }
}

impl<J: Send + 'static> Drop for WorkerPool<J> {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

fn run<J>(
    queue: Arc<JobQueue<J>>,
    executor: JobExecutor<J>,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    while !shutdown.load(Ordering::Acquire) {
        if let Some(job) = queue.pop_timeout(poll_interval) {
            executor(job);
        }
    }
}
