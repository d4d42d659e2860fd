//! Two-tier bitmap cache
//!
//! Memory lookups are synchronous and cheap. Disk lookups wait for the disk
//! tier to become ready and decode the stored bytes, so they belong on a
//! worker thread.

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::journal::DiskLruCache;
use crate::key::hash_key_for_disk;
use crate::memory::MemoryCache;
use crate::tier::DiskTier;
use std::sync::Arc;
use thumbgrid_decode::{decode_sampled, encode, Bitmap};

/// Memory LRU of decoded bitmaps in front of a disk journal of encoded bytes
pub struct ImageCache {
    config: CacheConfig,
    memory: Option<MemoryCache>,
    disk: DiskTier,
}

impl ImageCache {
    /// Build both tiers from `config`.
    ///
    /// The disk journal is opened here only if
    /// [`init_disk_cache_on_create`](CacheConfig::init_disk_cache_on_create)
    /// is set. Otherwise call [`init_disk_cache`](Self::init_disk_cache) off
    /// the latency-sensitive thread; disk reads wait until then.
    pub fn new(config: CacheConfig) -> Self {
        let memory = config
            .memory_cache_enabled
            .then(|| MemoryCache::new(config.memory_cache_size));

        let name = config
            .disk_cache_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "images".to_string());
        let disk = if config.disk_cache_enabled {
            DiskTier::new(&name, config.disk_cache_dir.clone(), config.disk_cache_size)
                .with_clear_on_start(config.clear_disk_cache_on_start)
        } else {
            DiskTier::disabled(&name)
        };

        let cache = Self {
            config,
            memory,
            disk,
        };
        if cache.config.init_disk_cache_on_create {
            cache.disk.initialize();
        }
        cache
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The memory tier, if enabled
    pub fn memory(&self) -> Option<&MemoryCache> {
        self.memory.as_ref()
    }

    pub fn disk(&self) -> &DiskTier {
        &self.disk
    }

    /// Look up `key` in the memory tier only.
    pub fn get(&self, key: &str) -> Option<Bitmap> {
        let bitmap = self.memory.as_ref()?.get(key)?;
        tracing::debug!(key, "memory cache hit");
        Some(bitmap)
    }

    /// Look up `key` on disk, decoding with the configured target size.
    ///
    /// Blocks while the disk tier is starting. Read and decode failures are
    /// logged and reported as a miss.
    pub fn get_from_disk(&self, key: &str) -> Option<Bitmap> {
        let journal = self.disk.journal()?;
        match self.read_from_disk(&journal, &hash_key_for_disk(key)) {
            Ok(Some(bitmap)) => {
                tracing::debug!(key, "disk cache hit");
                Some(bitmap)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read bitmap from disk cache");
                None
            }
        }
    }

    fn read_from_disk(
        &self,
        journal: &DiskLruCache,
        disk_key: &str,
    ) -> Result<Option<Bitmap>, CacheError> {
        let Some(snapshot) = journal.get(disk_key)? else {
            return Ok(None);
        };
        let bytes = snapshot.read_to_vec()?;
        Ok(Some(decode_sampled(&bytes, self.config.target_size)?))
    }

    /// Store `bitmap` in both tiers.
    ///
    /// The memory tier keeps an existing bitmap for `key`. The disk tier is
    /// written only if it is open and holds no entry for `key` yet. Disk
    /// failures are logged and otherwise ignored.
    pub fn put(&self, key: &str, bitmap: &Bitmap) {
        if let Some(memory) = &self.memory {
            memory.put_if_absent(key, bitmap.clone());
        }

        let Some(journal) = self.disk.current_journal() else {
            return;
        };
        if let Err(err) = self.write_to_disk(&journal, &hash_key_for_disk(key), bitmap) {
            tracing::warn!(key, error = %err, "failed to write bitmap to disk cache");
        }
    }

    fn write_to_disk(
        &self,
        journal: &Arc<DiskLruCache>,
        disk_key: &str,
        bitmap: &Bitmap,
    ) -> Result<(), CacheError> {
        if journal.get(disk_key)?.is_some() {
            return Ok(());
        }
        let Some(mut editor) = journal.edit(disk_key)? else {
            tracing::trace!(disk_key, "entry is already being written");
            return Ok(());
        };

        let encoded = encode(
            bitmap,
            self.config.compress_format,
            self.config.compress_quality,
            &mut editor,
        );
        match encoded {
            Ok(()) => editor.commit(),
            Err(err) => {
                editor.abort()?;
                Err(err.into())
            }
        }
    }

    /// Open the disk tier if needed and release waiting readers
    pub fn init_disk_cache(&self) {
        self.disk.initialize();
    }

    /// Empty the memory tier, then delete and reopen the disk tier
    pub fn clear(&self) {
        if let Some(memory) = &self.memory {
            memory.clear();
            tracing::debug!(tier = %self.disk.name(), "memory cache cleared");
        }
        self.disk.clear();
    }

    pub fn flush(&self) {
        self.disk.flush();
    }

    pub fn close(&self) {
        self.disk.close();
    }
}
