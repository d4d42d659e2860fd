//! Display targets
//!
//! An [`ImageTarget`] stands in for one cell of a grid. It records which
//! work unit it is currently waiting on, so a unit can tell whether its
//! result is still wanted before delivering it.

use crate::work::WorkUnit;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thumbgrid_decode::Bitmap;

/// How a delivered bitmap should appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Immediate,
    /// Cross-fade from the placeholder over the given duration
    FadeIn(Duration),
}

/// What a target currently shows
#[derive(Debug, Clone, Default)]
pub enum TargetContent {
    #[default]
    Empty,
    /// Waiting on unit `unit_id`, showing the placeholder if any
    Loading {
        placeholder: Option<Bitmap>,
        unit_id: u64,
    },
    Ready {
        bitmap: Bitmap,
        transition: Transition,
    },
}

/// Callback invoked with the new content whenever a target changes
pub type TargetListener = Box<dyn Fn(&TargetContent) + Send + Sync>;

#[derive(Default)]
struct TargetState {
    content: TargetContent,
    unit: Option<Arc<WorkUnit>>,
}

/// One display slot, bound to at most one [`WorkUnit`] at a time
#[derive(Default)]
pub struct ImageTarget {
    state: Mutex<TargetState>,
    listener: Option<TargetListener>,
}

impl fmt::Debug for ImageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ImageTarget")
            .field("content", &state.content)
            .field("unit", &state.unit.as_ref().map(|unit| unit.id()))
            .finish()
    }
}

impl ImageTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a target that reports every content change to `listener`.
    ///
    /// The listener runs on whichever thread changed the content, outside
    /// the target's lock.
    pub fn with_listener<F>(listener: F) -> Self
    where
        F: Fn(&TargetContent) + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(TargetState::default()),
            listener: Some(Box::new(listener)),
        }
    }

    pub fn content(&self) -> TargetContent {
        self.state.lock().content.clone()
    }

    /// The bitmap on display: the delivered image, else the placeholder
    pub fn bitmap(&self) -> Option<Bitmap> {
        match &self.state.lock().content {
            TargetContent::Empty => None,
            TargetContent::Loading { placeholder, .. } => placeholder.clone(),
            TargetContent::Ready { bitmap, .. } => Some(bitmap.clone()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state.lock().content, TargetContent::Loading { .. })
    }

    pub fn current_unit_id(&self) -> Option<u64> {
        self.state.lock().unit.as_ref().map(|unit| unit.id())
    }

    pub fn bound_unit(&self) -> Option<Arc<WorkUnit>> {
        self.state.lock().unit.clone()
    }

    /// Bind `unit` and show the loading placeholder.
    pub(crate) fn bind(&self, unit: Arc<WorkUnit>, placeholder: Option<Bitmap>) {
        let content = TargetContent::Loading {
            placeholder,
            unit_id: unit.id(),
        };
        self.update(Some(unit), content);
    }

    /// Show `bitmap` right away, dropping any binding.
    pub(crate) fn show(&self, bitmap: Bitmap, transition: Transition) {
        self.update(None, TargetContent::Ready { bitmap, transition });
    }

    /// Show `bitmap` only if the target is still bound to `unit_id`.
    pub(crate) fn deliver_if_bound(&self, unit_id: u64, bitmap: Bitmap, transition: Transition) -> bool {
        let content = {
            let mut state = self.state.lock();
            if state.unit.as_ref().map(|unit| unit.id()) != Some(unit_id) {
                return false;
            }
            state.unit = None;
            state.content = TargetContent::Ready { bitmap, transition };
            state.content.clone()
        };
        self.notify(&content);
        true
    }

    /// Forget the bound unit, leaving the content as is.
    pub(crate) fn detach_unit(&self) -> Option<Arc<WorkUnit>> {
        self.state.lock().unit.take()
    }

    /// Forget the binding if it is still `unit_id`, leaving the content.
    pub(crate) fn unbind_if(&self, unit_id: u64) -> bool {
        let mut state = self.state.lock();
        if state.unit.as_ref().map(|unit| unit.id()) == Some(unit_id) {
            state.unit = None;
            true
        } else {
            false
        }
    }

    fn update(&self, unit: Option<Arc<WorkUnit>>, content: TargetContent) {
        {
            let mut state = self.state.lock();
            state.unit = unit;
            state.content = content.clone();
        }
        self.notify(&content);
    }

    fn notify(&self, content: &TargetContent) {
        if let Some(listener) = &self.listener {
            listener(content);
        }
    }
}
