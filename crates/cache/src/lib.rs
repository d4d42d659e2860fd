//! Thumbgrid cache library
//!
//! Two-tier image cache: an in-memory LRU of decoded bitmaps in front of an
//! on-disk journal of encoded bytes. The disk tier is a reusable byte-blob
//! store ([`DiskTier`]) that other crates instantiate for their own
//! namespaces.

pub mod config;
pub mod error;
pub mod image_cache;
pub mod journal;
pub mod key;
pub mod memory;
pub mod registry;
pub mod tier;

pub use config::{CacheConfig, ConfigError};
pub use error::CacheError;
pub use image_cache::ImageCache;
pub use journal::{DiskCacheStats, DiskLruCache, Editor, Snapshot};
pub use key::hash_key_for_disk;
pub use memory::{MemoryCache, MemoryCacheStats};
pub use registry::CacheRegistry;
pub use tier::{DiskTier, Readiness, DISK_APP_VERSION};
