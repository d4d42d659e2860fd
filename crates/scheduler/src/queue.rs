//! FIFO job queue shared by a pool's workers

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// Unbounded FIFO queue with a blocking, time-limited pop
pub struct JobQueue<J> {
    jobs: Mutex<VecDeque<J>>,
    available: Condvar,
}

impl<J> JobQueue<J> {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Append a job and wake one waiting worker
    pub fn push(&self, job: J) {
        self.jobs.lock().push_back(job);
        self.available.notify_one();
    }

    /// Take the oldest job, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<J> {
        let mut jobs = self.jobs.lock();
        if jobs.is_empty() {
            self.available.wait_for(&mut jobs, timeout);
        }
        jobs.pop_front()
    }

    #[cfg(test)]
    fn try_pop(&self) -> Option<J> {
        self.jobs.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Drop every queued job and return how many there were
    pub fn clear(&self) -> usize {
        let mut jobs = self.jobs.lock();
        let count = jobs.len();
        jobs.clear();
        count
    }

    /// Wake every waiting worker without queueing anything
    pub fn wake_all(&self) {
        self.available.notify_all();
    }
}

impl<J> Default for JobQueue<J> {
    fn default() -> Self {
        Self::new()
    }
}
