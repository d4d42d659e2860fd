//! One cancellable unit of image work bound to one display target

use crate::cancel::CancellationToken;
use crate::target::ImageTarget;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Loads the bitmap for one key on behalf of one [`ImageTarget`].
///
/// The unit only holds a weak reference to its target, so a dropped target
/// never outlives its view and the unit's result is simply discarded.
#[derive(Debug)]
pub struct WorkUnit {
    id: u64,
    key: String,
    token: CancellationToken,
    started: AtomicBool,
    target: Weak<ImageTarget>,
}

impl WorkUnit {
    pub(crate) fn new(id: u64, key: &str, target: &Arc<ImageTarget>) -> Self {
        Self {
            id,
            key: key.to_string(),
            token: CancellationToken::new(),
            started: AtomicBool::new(false),
            target: Arc::downgrade(target),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn mark_started(&self) {
        self.started.store(true, Ordering::Release);
    }

    /// True once a worker has picked the unit up
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn target(&self) -> Option<Arc<ImageTarget>> {
        self.target.upgrade()
    }

    /// True while the target still exists and is bound to this unit
    pub fn is_bound(&self) -> bool {
        self.target()
            .is_some_and(|target| target.current_unit_id() == Some(self.id))
    }
}
