//! Journaled disk LRU store
//!
//! Each key maps to one value file in the cache directory. Writes go through
//! an [`Editor`] into a temporary file that is renamed over the value on
//! commit, so readers never observe a partial value. Every state change is
//! appended to a journal file which is replayed on open to rebuild the index
//! and its recency order.
//!
//! Journal layout:
//!
//! ```text
//! thumbgrid.journal
//! 1
//! <app version>
//! 1
//!
//! DIRTY 3400330d1dfc7f3f7f4b8d4d803dfcf6
//! CLEAN 3400330d1dfc7f3f7f4b8d4d803dfcf6 4698
//! READ 3400330d1dfc7f3f7f4b8d4d803dfcf6
//! REMOVE 3400330d1dfc7f3f7f4b8d4d803dfcf6
//! ```
//!
//! `DIRTY` marks an edit in progress and must be followed by `CLEAN` (with the
//! value length in bytes) or `REMOVE`. A `DIRTY` with neither is an edit that
//! never finished; its files are deleted on the next open.

use crate::error::CacheError;
use lru::LruCache;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const JOURNAL_FILE: &str = "journal";
const JOURNAL_FILE_TMP: &str = "journal.tmp";
const MAGIC: &str = "thumbgrid.journal";
const VERSION: &str = "1";
const VALUE_COUNT: &str = "1";

const CLEAN: &str = "CLEAN";
const DIRTY: &str = "DIRTY";
const REMOVE: &str = "REMOVE";
const READ: &str = "READ";

const MAX_KEY_LEN: usize = 120;

/// The journal is rewritten once this many records are superseded and they
/// outnumber the live entries
const REDUNDANT_OP_COMPACT_THRESHOLD: usize = 2000;

/// Statistics about journal usage
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskCacheStats {
    pub entry_count: usize,
    /// Bytes held by committed values
    pub size: u64,
    pub max_size: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    /// Length of the committed value in bytes
    length: u64,
    /// A committed value exists
    readable: bool,
    /// An editor is live for this key
    editing: bool,
}

struct JournalState {
    /// Iteration order is most recently used first
    entries: LruCache<String, Entry>,
    size: u64,
    max_size: u64,
    /// `None` once closed
    writer: Option<BufWriter<File>>,
    redundant_ops: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl JournalState {
    fn new(entries: LruCache<String, Entry>, max_size: u64) -> Self {
        let size = entries
            .iter()
            .filter(|(_, entry)| entry.readable)
            .map(|(_, entry)| entry.length)
            .sum();
        Self {
            entries,
            size,
            max_size,
            writer: None,
            redundant_ops: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn check_open(&self) -> Result<(), CacheError> {
        if self.writer.is_none() {
            return Err(CacheError::Closed);
        }
        Ok(())
    }

    fn append(&mut self, record: &str, flush: bool) -> Result<(), CacheError> {
        let writer = self.writer.as_mut().ok_or(CacheError::Closed)?;
        writeln!(writer, "{}", record)?;
        if flush {
            writer.flush()?;
        }
        Ok(())
    }

    fn compaction_required(&self) -> bool {
        self.redundant_ops >= REDUNDANT_OP_COMPACT_THRESHOLD
            && self.redundant_ops >= self.entries.len()
    }
}

/// Index rebuilt from an existing journal file
struct Replay {
    entries: LruCache<String, Entry>,
    record_count: usize,
    /// The final record was cut off mid-line
    truncated: bool,
}

/// Bounded, journaled key-to-blob store with LRU eviction.
///
/// Keys must match `[a-z0-9_-]{1,120}`; use
/// [`hash_key_for_disk`](crate::hash_key_for_disk) to derive one from an
/// arbitrary string. At most one [`Editor`] may be live per key.
pub struct DiskLruCache {
    directory: PathBuf,
    app_version: u32,
    state: Mutex<JournalState>,
}

impl DiskLruCache {
    /// Open the cache in `directory`, creating it if needed.
    ///
    /// An existing journal is replayed. A journal that cannot be parsed, or
    /// that was written by a different `app_version`, is discarded together
    /// with every value in the directory.
    pub fn open<P: AsRef<Path>>(
        directory: P,
        app_version: u32,
        max_size: u64,
    ) -> Result<Arc<Self>, CacheError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        remove_if_exists(&directory.join(JOURNAL_FILE_TMP))?;

        let journal_path = directory.join(JOURNAL_FILE);
        let replay = if journal_path.exists() {
            match read_journal(&journal_path, app_version) {
                Ok(replay) => Some(replay),
                Err(err) => {
                    tracing::warn!(
                        directory = %directory.display(),
                        error = %err,
                        "discarding unreadable cache journal"
                    );
                    fs::remove_dir_all(&directory)?;
                    fs::create_dir_all(&directory)?;
                    None
                }
            }
        } else {
            None
        };

        let cache = match replay {
            Some(replay) => Self::from_replay(directory, app_version, max_size, replay)?,
            None => {
                let cache = Self {
                    directory,
                    app_version,
                    state: Mutex::new(JournalState::new(LruCache::unbounded(), max_size)),
                };
                {
                    let mut state = cache.state.lock();
                    cache.rebuild_journal(&mut state)?;
                }
                cache
            }
        };

        tracing::debug!(
            directory = %cache.directory.display(),
            entries = cache.len(),
            size = cache.size(),
            "disk cache opened"
        );
        Ok(Arc::new(cache))
    }

    fn from_replay(
        directory: PathBuf,
        app_version: u32,
        max_size: u64,
        replay: Replay,
    ) -> Result<Self, CacheError> {
        let Replay {
            mut entries,
            record_count,
            truncated,
        } = replay;

        // Edits that never finished leave both files behind
        let unfinished: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.editing)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &unfinished {
            remove_if_exists(&directory.join(clean_name(key)))?;
            remove_if_exists(&directory.join(dirty_name(key)))?;
            entries.pop(key.as_str());
        }

        let cache = Self {
            directory,
            app_version,
            state: Mutex::new(JournalState::new(entries, max_size)),
        };
        {
            let mut state = cache.state.lock();
            state.redundant_ops = record_count.saturating_sub(state.entries.len());
            if truncated || !unfinished.is_empty() {
                cache.rebuild_journal(&mut state)?;
            } else {
                state.writer = Some(open_append(&cache.directory.join(JOURNAL_FILE))?);
            }
            cache.trim_to_size(&mut state)?;
        }
        Ok(cache)
    }

    fn clean_path(&self, key: &str) -> PathBuf {
        self.directory.join(clean_name(key))
    }

    fn dirty_path(&self, key: &str) -> PathBuf {
        self.directory.join(dirty_name(key))
    }

    /// Return a snapshot of the committed value for `key`, or `None`.
    ///
    /// The entry becomes the most recently used. The snapshot reads the value
    /// as it was at this call even if it is replaced or evicted afterwards.
    pub fn get(&self, key: &str) -> Result<Option<Snapshot>, CacheError> {
        validate_key(key)?;
        let mut state = self.state.lock();
        state.check_open()?;

        let readable = state
            .entries
            .get(key)
            .map(|entry| (entry.readable, entry.length));
        let Some((true, length)) = readable else {
            state.misses += 1;
            return Ok(None);
        };

        let file = match File::open(self.clean_path(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                state.misses += 1;
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        state.hits += 1;
        state.redundant_ops += 1;
        state.append(&format!("{} {}", READ, key), false)?;
        if state.compaction_required() {
            self.rebuild_journal(&mut state)?;
        }

        Ok(Some(Snapshot {
            key: key.to_string(),
            length,
            file,
        }))
    }

    /// Start an edit of `key`.
    ///
    /// Returns `Ok(None)` if another editor is live for the same key.
    pub fn edit(self: &Arc<Self>, key: &str) -> Result<Option<Editor>, CacheError> {
        validate_key(key)?;
        let mut state = self.state.lock();
        state.check_open()?;

        match state.entries.get(key).map(|entry| entry.editing) {
            Some(true) => return Ok(None),
            Some(false) => {
                if let Some(entry) = state.entries.get_mut(key) {
                    entry.editing = true;
                }
            }
            None => {
                state.entries.put(
                    key.to_string(),
                    Entry {
                        editing: true,
                        ..Entry::default()
                    },
                );
            }
        }

        // Flushed before any value bytes exist so a crash cannot leak files
        state.append(&format!("{} {}", DIRTY, key), true)?;

        let file = match File::create(self.dirty_path(key)) {
            Ok(file) => file,
            Err(err) => {
                drop(state);
                self.complete_edit(key, false)?;
                return Err(err.into());
            }
        };

        Ok(Some(Editor {
            cache: Arc::clone(self),
            key: key.to_string(),
            writer: Some(BufWriter::new(file)),
        }))
    }

    fn complete_edit(&self, key: &str, success: bool) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        let dirty = self.dirty_path(key);

        if state.writer.is_none() {
            remove_if_exists(&dirty)?;
            return if success {
                Err(CacheError::Closed)
            } else {
                Ok(())
            };
        }

        let Some(mut entry) = state.entries.peek(key).copied() else {
            remove_if_exists(&dirty)?;
            return Ok(());
        };
        entry.editing = false;

        let outcome = if success {
            match self.publish(key, &dirty) {
                Ok(length) => {
                    if entry.readable {
                        state.size = state.size.saturating_sub(entry.length);
                    }
                    state.size += length;
                    entry.length = length;
                    entry.readable = true;
                    Ok(())
                }
                Err(err) => Err(CacheError::from(err)),
            }
        } else {
            Ok(())
        };
        if !success || outcome.is_err() {
            remove_if_exists(&dirty)?;
        }

        if entry.readable {
            if let Some(slot) = state.entries.get_mut(key) {
                *slot = entry;
            }
            state.append(&format!("{} {} {}", CLEAN, key, entry.length), true)?;
        } else {
            state.entries.pop(key);
            state.append(&format!("{} {}", REMOVE, key), true)?;
        }

        state.redundant_ops += 1;
        self.trim_to_size(&mut state)?;
        if state.compaction_required() {
            self.rebuild_journal(&mut state)?;
        }
        outcome
    }

    /// Move a finished temporary file over the value, returning its length
    fn publish(&self, key: &str, dirty: &Path) -> io::Result<u64> {
        let length = fs::metadata(dirty)?.len();
        fs::rename(dirty, self.clean_path(key))?;
        Ok(length)
    }

    /// Delete the committed value for `key`.
    ///
    /// Returns false if there was no value or an edit is in progress.
    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        validate_key(key)?;
        let mut state = self.state.lock();
        state.check_open()?;

        let removed = self.remove_entry(&mut state, key)?;
        if removed && state.compaction_required() {
            self.rebuild_journal(&mut state)?;
        }
        Ok(removed)
    }

    fn remove_entry(&self, state: &mut JournalState, key: &str) -> Result<bool, CacheError> {
        match state.entries.peek(key) {
            Some(entry) if !entry.editing => {}
            _ => return Ok(false),
        }

        remove_if_exists(&self.clean_path(key))?;
        if let Some(entry) = state.entries.pop(key) {
            if entry.readable {
                state.size = state.size.saturating_sub(entry.length);
            }
        }
        state.redundant_ops += 1;
        state.append(&format!("{} {}", REMOVE, key), false)?;
        Ok(true)
    }

    /// Evict least recently used values until the size fits the budget
    fn trim_to_size(&self, state: &mut JournalState) -> Result<(), CacheError> {
        while state.size > state.max_size {
            let victim = state
                .entries
                .iter()
                .rev()
                .find(|(_, entry)| entry.readable && !entry.editing)
                .map(|(key, _)| key.clone());
            let Some(key) = victim else {
                break;
            };
            self.remove_entry(state, &key)?;
            state.evictions += 1;
            tracing::trace!(key = %key, "evicted disk cache entry");
        }
        Ok(())
    }

    /// Rewrite the journal with one record per live entry
    fn rebuild_journal(&self, state: &mut JournalState) -> Result<(), CacheError> {
        let tmp_path = self.directory.join(JOURNAL_FILE_TMP);
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            writeln!(writer, "{}", MAGIC)?;
            writeln!(writer, "{}", VERSION)?;
            writeln!(writer, "{}", self.app_version)?;
            writeln!(writer, "{}", VALUE_COUNT)?;
            writeln!(writer)?;
            for (key, entry) in state.entries.iter().rev() {
                if entry.editing {
                    writeln!(writer, "{} {}", DIRTY, key)?;
                } else {
                    writeln!(writer, "{} {} {}", CLEAN, key, entry.length)?;
                }
            }
            writer.flush()?;
        }

        let journal_path = self.directory.join(JOURNAL_FILE);
        fs::rename(&tmp_path, &journal_path)?;
        state.writer = Some(open_append(&journal_path)?);
        state.redundant_ops = 0;
        Ok(())
    }

    /// Write buffered journal records and trim to the size budget
    pub fn flush(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        state.check_open()?;
        self.trim_to_size(&mut state)?;
        if let Some(writer) = state.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flush and close the journal. Closing twice is a no-op.
    ///
    /// Editors still live when the cache closes are aborted when they finish.
    pub fn close(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        if state.writer.is_none() {
            return Ok(());
        }
        self.trim_to_size(&mut state)?;
        if let Some(mut writer) = state.writer.take() {
            writer.flush()?;
        }
        tracing::debug!(directory = %self.directory.display(), "disk cache closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().writer.is_none()
    }

    /// Close the cache and delete its directory with every stored value
    pub fn delete(&self) -> Result<(), CacheError> {
        self.close()?;
        match fs::remove_dir_all(&self.directory) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Bytes held by committed values
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    pub fn max_size(&self) -> u64 {
        self.state.lock().max_size
    }

    /// Change the size budget, evicting immediately if it shrank
    pub fn set_max_size(&self, max_size: u64) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        state.max_size = max_size;
        if state.writer.is_some() {
            self.trim_to_size(&mut state)?;
        }
        Ok(())
    }

    /// Number of entries, including ones with an edit in progress
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn stats(&self) -> DiskCacheStats {
        let state = self.state.lock();
        DiskCacheStats {
            entry_count: state.entries.len(),
            size: state.size,
            max_size: state.max_size,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }
}

/// Write access to the value of one key.
///
/// Bytes written go to a temporary file. [`commit`](Editor::commit) publishes
/// them atomically; [`abort`](Editor::abort), or dropping the editor, discards
/// them and leaves any previous value untouched.
pub struct Editor {
    cache: Arc<DiskLruCache>,
    key: String,
    /// `None` once the edit completed
    writer: Option<BufWriter<File>>,
}

impl Editor {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Publish the written bytes as the new value
    pub fn commit(mut self) -> Result<(), CacheError> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        match writer.into_inner() {
            Ok(_file) => self.cache.complete_edit(&self.key, true),
            Err(err) => {
                self.cache.complete_edit(&self.key, false)?;
                Err(err.into_error().into())
            }
        }
    }

    /// Discard the written bytes
    pub fn abort(mut self) -> Result<(), CacheError> {
        self.writer.take();
        self.cache.complete_edit(&self.key, false)
    }
}

impl Write for Editor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "edit already completed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            if let Err(err) = self.cache.complete_edit(&self.key, false) {
                tracing::warn!(key = %self.key, error = %err, "failed to abort dropped editor");
            }
        }
    }
}

/// A committed value as of the moment it was looked up
pub struct Snapshot {
    key: String,
    length: u64,
    file: File,
}

impl Snapshot {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Length of the value in bytes
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Read the whole value into memory
    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.length as usize);
        self.file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

impl Read for Snapshot {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

fn clean_name(key: &str) -> String {
    format!("{}.0", key)
}

fn dirty_name(key: &str) -> String {
    format!("{}.0.tmp", key)
}

fn validate_key(key: &str) -> Result<(), CacheError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn open_append(path: &Path) -> io::Result<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

fn read_journal(path: &Path, app_version: u32) -> Result<Replay, CacheError> {
    let contents = fs::read_to_string(path)?;
    let mut lines: Vec<&str> = contents.split('\n').collect();
    // Text after the final newline is a record cut off mid-write
    let truncated = lines.pop().is_some_and(|tail| !tail.is_empty());

    let app_version = app_version.to_string();
    let expected = [MAGIC, VERSION, app_version.as_str(), VALUE_COUNT, ""];
    for (index, expected) in expected.iter().enumerate() {
        match lines.get(index) {
            Some(line) if line == expected => {}
            Some(line) => {
                return Err(corrupt(index + 1, format!("unexpected header {:?}", line)));
            }
            None => return Err(corrupt(index + 1, "journal header is incomplete")),
        }
    }

    let mut entries = LruCache::unbounded();
    let records = &lines[expected.len()..];
    for (offset, line) in records.iter().enumerate() {
        apply_record(&mut entries, line, expected.len() + offset + 1)?;
    }

    Ok(Replay {
        entries,
        record_count: records.len(),
        truncated,
    })
}

fn apply_record(
    entries: &mut LruCache<String, Entry>,
    line: &str,
    number: usize,
) -> Result<(), CacheError> {
    let parts: Vec<&str> = line.split(' ').collect();
    match parts.as_slice() {
        [CLEAN, key, length] => {
            let length = length
                .parse::<u64>()
                .map_err(|_| corrupt(number, format!("invalid length {:?}", length)))?;
            let entry = Entry {
                length,
                readable: true,
                editing: false,
            };
            if let Some(slot) = entries.get_mut(*key) {
                *slot = entry;
            } else {
                entries.put(key.to_string(), entry);
            }
        }
        [DIRTY, key] => {
            if let Some(slot) = entries.get_mut(*key) {
                slot.editing = true;
            } else {
                entries.put(
                    key.to_string(),
                    Entry {
                        editing: true,
                        ..Entry::default()
                    },
                );
            }
        }
        [REMOVE, key] => {
            entries.pop(*key);
        }
        [READ, key] => {
            entries.get(*key);
        }
        _ => return Err(corrupt(number, format!("unexpected record {:?}", line))),
    }
    Ok(())
}

fn corrupt(line: usize, reason: impl Into<String>) -> CacheError {
    CacheError::CorruptJournal {
        line,
        reason: reason.into(),
    }
}
