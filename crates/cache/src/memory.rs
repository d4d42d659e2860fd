//! Memory tier with LRU eviction
//!
//! Holds decoded bitmaps keyed by their logical cache key. Entries are sized
//! by their decoded pixel footprint and the least recently used bitmaps are
//! evicted once the byte budget is exceeded.

use lru::LruCache;
use parking_lot::Mutex;
use thumbgrid_decode::Bitmap;

/// Statistics about memory tier usage
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCacheStats {
    /// Number of bitmaps currently cached
    pub entry_count: usize,

    /// Total decoded bytes held by cached bitmaps
    pub memory_used: usize,

    /// Byte budget
    pub memory_limit: usize,

    pub hits: u64,
    pub misses: u64,

    /// Number of bitmaps evicted due to memory pressure
    pub evictions: u64,
}

impl MemoryCacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate memory utilization (0.0 to 1.0)
    pub fn memory_utilization(&self) -> f64 {
        if self.memory_limit == 0 {
            0.0
        } else {
            self.memory_used as f64 / self.memory_limit as f64
        }
    }
}

struct CacheState {
    /// Recency order is owned by the LRU map; capacity is enforced in bytes
    entries: LruCache<String, Bitmap>,
    memory_used: usize,
    memory_limit: usize,
    stats: MemoryCacheStats,
}

impl CacheState {
    fn new(memory_limit: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            memory_used: 0,
            memory_limit,
            stats: MemoryCacheStats {
                memory_limit,
                ..Default::default()
            },
        }
    }

    fn sync_stats(&mut self) {
        self.stats.entry_count = self.entries.len();
        self.stats.memory_used = self.memory_used;
        self.stats.memory_limit = self.memory_limit;
    }

    fn evict_lru(&mut self) -> Option<(String, Bitmap)> {
        let (key, bitmap) = self.entries.pop_lru()?;
        self.memory_used = self.memory_used.saturating_sub(bitmap.byte_size());
        self.stats.evictions += 1;
        Some((key, bitmap))
    }

    /// Evict bitmaps until `required_size` more bytes fit in the budget
    fn evict_to_fit(&mut self, required_size: usize) {
        while self.memory_used + required_size > self.memory_limit {
            if self.evict_lru().is_none() {
                break;
            }
        }
    }
}

/// Thread-safe in-memory bitmap cache.
///
/// # Example
///
/// ```
/// use image::DynamicImage;
/// use thumbgrid_cache::MemoryCache;
/// use thumbgrid_decode::Bitmap;
///
/// let cache = MemoryCache::new(1024 * 1024);
/// cache.put("https://example.com/a.jpg", Bitmap::new(DynamicImage::new_rgba8(64, 64)));
///
/// let bitmap = cache.get("https://example.com/a.jpg").unwrap();
/// assert_eq!(bitmap.width(), 64);
/// assert_eq!(cache.stats().hits, 1);
/// ```
pub struct MemoryCache {
    state: Mutex<CacheState>,
}

impl MemoryCache {
    /// Create a memory cache holding at most `memory_limit` decoded bytes
    pub fn new(memory_limit: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::new(memory_limit)),
        }
    }

    /// Store a bitmap, replacing any previous bitmap for `key`.
    ///
    /// Least recently used bitmaps are evicted to make room. A bitmap larger
    /// than the whole budget is not cached. Returns true if it was stored.
    pub fn put(&self, key: &str, bitmap: Bitmap) -> bool {
        let mut state = self.state.lock();
        let size = bitmap.byte_size();

        if let Some(old) = state.entries.pop(key) {
            state.memory_used = state.memory_used.saturating_sub(old.byte_size());
        }

        if size > state.memory_limit {
            tracing::debug!(key, size, limit = state.memory_limit, "bitmap exceeds memory budget");
            state.sync_stats();
            return false;
        }

        state.evict_to_fit(size);
        state.entries.put(key.to_string(), bitmap);
        state.memory_used += size;
        state.sync_stats();
        true
    }

    /// Store a bitmap only if `key` is not cached yet. Returns true if stored.
    pub fn put_if_absent(&self, key: &str, bitmap: Bitmap) -> bool {
        if self.contains(key) {
            return false;
        }
        self.put(key, bitmap)
    }

    /// Look up a bitmap, marking it most recently used on a hit.
    pub fn get(&self, key: &str) -> Option<Bitmap> {
        let mut state = self.state.lock();
        match state.entries.get(key).cloned() {
            Some(bitmap) => {
                state.stats.hits += 1;
                Some(bitmap)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Check for a key without touching recency or statistics
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains(key)
    }

    /// Remove a bitmap, returning it if present
    pub fn remove(&self, key: &str) -> Option<Bitmap> {
        let mut state = self.state.lock();
        let bitmap = state.entries.pop(key)?;
        state.memory_used = state.memory_used.saturating_sub(bitmap.byte_size());
        state.sync_stats();
        Some(bitmap)
    }

    /// Remove every bitmap
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.memory_used = 0;
        state.sync_stats();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn memory_used(&self) -> usize {
        self.state.lock().memory_used
    }

    pub fn memory_limit(&self) -> usize {
        self.state.lock().memory_limit
    }

    /// Change the byte budget, evicting immediately if it shrank
    pub fn set_memory_limit(&self, memory_limit: usize) {
        let mut state = self.state.lock();
        state.memory_limit = memory_limit;
        state.evict_to_fit(0);
        state.sync_stats();
    }

    pub fn stats(&self) -> MemoryCacheStats {
        self.state.lock().stats
    }
}
