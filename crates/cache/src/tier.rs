//! Disk tier with gated initialization
//!
//! A [`DiskTier`] owns one optional [`DiskLruCache`] and the readiness state
//! that guards it. Readers block while the tier is `Starting` and are released
//! together once initialization finishes, whether or not the journal could be
//! opened. The tier is used both for encoded bitmaps and for raw HTTP bytes;
//! each instance has its own lock.

use crate::error::CacheError;
use crate::journal::DiskLruCache;
use parking_lot::{Condvar, Mutex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Journal generation written by this crate
pub const DISK_APP_VERSION: u32 = 1;

/// Whether disk readers may proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Initialization or a clear is pending; readers wait
    Starting,
    /// Readers proceed, with or without an open journal
    Ready,
}

struct TierState {
    readiness: Readiness,
    journal: Option<Arc<DiskLruCache>>,
    /// `None` when the tier is disabled or its directory proved unusable
    directory: Option<PathBuf>,
    /// The first open already happened, so clear-on-start no longer applies
    opened_once: bool,
}

/// Reusable byte-blob disk tier.
///
/// ```no_run
/// use thumbgrid_cache::DiskTier;
///
/// let tier = DiskTier::new("http", "/tmp/thumbgrid/http", 10 * 1024 * 1024);
/// tier.initialize();
/// if let Some(journal) = tier.journal() {
///     let _ = journal.get("0cc175b9c0f1b6a831c399e269772661");
/// }
/// ```
pub struct DiskTier {
    name: String,
    max_size: u64,
    app_version: u32,
    clear_on_start: bool,
    state: Mutex<TierState>,
    ready: Condvar,
}

impl DiskTier {
    /// Create an enabled tier. Readers block until [`initialize`](Self::initialize).
    pub fn new<P: Into<PathBuf>>(name: &str, directory: P, max_size: u64) -> Self {
        Self::with_state(name, Some(directory.into()), max_size, Readiness::Starting)
    }

    /// Create a tier that never opens a journal. Readers never block.
    pub fn disabled(name: &str) -> Self {
        Self::with_state(name, None, 0, Readiness::Ready)
    }

    fn with_state(
        name: &str,
        directory: Option<PathBuf>,
        max_size: u64,
        readiness: Readiness,
    ) -> Self {
        Self {
            name: name.to_string(),
            max_size,
            app_version: DISK_APP_VERSION,
            clear_on_start: false,
            state: Mutex::new(TierState {
                readiness,
                journal: None,
                directory,
                opened_once: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Delete any existing journal the first time the tier opens
    pub fn with_clear_on_start(mut self, clear: bool) -> Self {
        self.clear_on_start = clear;
        self
    }

    pub fn with_app_version(mut self, app_version: u32) -> Self {
        self.app_version = app_version;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Open the journal if it is not open yet, then release waiting readers.
    ///
    /// The directory is created if needed and the journal is only opened when
    /// the volume has more usable space than the tier's budget. A journal
    /// that fails to open disables the tier for the lifetime of this instance.
    pub fn initialize(&self) {
        let mut state = self.state.lock();
        self.initialize_locked(&mut state);
    }

    fn initialize_locked(&self, state: &mut TierState) {
        let needs_open = state
            .journal
            .as_ref()
            .map_or(true, |journal| journal.is_closed());

        if needs_open {
            if let Some(directory) = state.directory.clone() {
                let clear_first = self.clear_on_start && !state.opened_once;
                state.opened_once = true;
                match self.open_journal(&directory, clear_first) {
                    Ok(Some(journal)) => {
                        tracing::debug!(tier = %self.name, directory = %directory.display(), "disk cache initialized");
                        state.journal = Some(journal);
                    }
                    Ok(None) => {
                        state.journal = None;
                    }
                    Err(err) => {
                        tracing::error!(
                            tier = %self.name,
                            directory = %directory.display(),
                            error = %err,
                            "failed to open disk cache, continuing without it"
                        );
                        state.journal = None;
                        state.directory = None;
                    }
                }
            }
        }

        state.readiness = Readiness::Ready;
        self.ready.notify_all();
    }

    fn open_journal(
        &self,
        directory: &Path,
        clear_first: bool,
    ) -> Result<Option<Arc<DiskLruCache>>, CacheError> {
        fs::create_dir_all(directory)?;

        let available = fs2::available_space(directory)?;
        if available <= self.max_size {
            tracing::warn!(
                tier = %self.name,
                available,
                required = self.max_size,
                "not enough usable space for disk cache"
            );
            return Ok(None);
        }

        if clear_first {
            DiskLruCache::open(directory, self.app_version, self.max_size)?.delete()?;
            tracing::debug!(tier = %self.name, "disk cache cleared on start");
        }

        DiskLruCache::open(directory, self.app_version, self.max_size).map(Some)
    }

    /// Wait until the tier is ready, then return the open journal if any.
    pub fn journal(&self) -> Option<Arc<DiskLruCache>> {
        let mut state = self.state.lock();
        while state.readiness == Readiness::Starting {
            self.ready.wait(&mut state);
        }
        Self::open_journal_of(&state)
    }

    /// Return the open journal without waiting for initialization.
    pub fn current_journal(&self) -> Option<Arc<DiskLruCache>> {
        Self::open_journal_of(&self.state.lock())
    }

    fn open_journal_of(state: &TierState) -> Option<Arc<DiskLruCache>> {
        state
            .journal
            .as_ref()
            .filter(|journal| !journal.is_closed())
            .cloned()
    }

    pub fn readiness(&self) -> Readiness {
        self.state.lock().readiness
    }

    /// False once the tier is disabled, by configuration or after a failed open
    pub fn is_enabled(&self) -> bool {
        self.state.lock().directory.is_some()
    }

    /// Delete every entry and reopen an empty journal.
    ///
    /// Readers are held back until the new journal is ready.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.readiness = Readiness::Starting;

        if let Some(journal) = state.journal.take() {
            match journal.delete() {
                Ok(()) => tracing::debug!(tier = %self.name, "disk cache cleared"),
                Err(err) => {
                    tracing::error!(tier = %self.name, error = %err, "failed to clear disk cache")
                }
            }
        }

        self.initialize_locked(&mut state);
    }

    /// Flush the journal to disk
    pub fn flush(&self) {
        let state = self.state.lock();
        if let Some(journal) = Self::open_journal_of(&state) {
            match journal.flush() {
                Ok(()) => tracing::debug!(tier = %self.name, "disk cache flushed"),
                Err(err) => {
                    tracing::error!(tier = %self.name, error = %err, "failed to flush disk cache")
                }
            }
        }
    }

    /// Close the journal. A later [`initialize`](Self::initialize) reopens it.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if let Some(journal) = state.journal.take() {
            if journal.is_closed() {
                return;
            }
            match journal.close() {
                Ok(()) => tracing::debug!(tier = %self.name, "disk cache closed"),
                Err(err) => {
                    tracing::error!(tier = %self.name, error = %err, "failed to close disk cache")
                }
            }
        }
    }
}
