//! Pause gate shared by all work units of a loader

use crate::cancel::CancellationToken;
use parking_lot::{Condvar, Mutex};

/// Blocks work units while paused, e.g. during a fling.
///
/// Waiters wake on resume and on [`wake_all`](Self::wake_all), which
/// cancellation uses so a cancelled unit never stays parked.
#[derive(Default)]
pub struct PauseGate {
    paused: Mutex<bool>,
    resumed: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_paused(&self, paused: bool) {
        let mut state = self.paused.lock();
        *state = paused;
        if !paused {
            self.resumed.notify_all();
        }
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Block while paused and `token` is not cancelled.
    pub fn wait_while_paused(&self, token: &CancellationToken) {
        let mut paused = self.paused.lock();
        while *paused && !token.is_cancelled() {
            self.resumed.wait(&mut paused);
        }
    }

    /// Wake every waiter so it can recheck its token
    pub fn wake_all(&self) {
        let _guard = self.paused.lock();
        self.resumed.notify_all();
    }
}
