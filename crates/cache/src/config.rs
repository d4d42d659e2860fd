//! Cache configuration for image cache namespaces.
//!
//! A [`CacheConfig`] is built once per namespace (for example `thumbs` or
//! `images`) and describes both tiers: the memory budget, the disk budget and
//! location, the codec used to persist bitmaps, and which tiers are enabled.
//! Configuration can be loaded from a TOML file, environment variables, or
//! created programmatically.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use sysinfo::System;
use thumbgrid_decode::{CompressFormat, ImageSize};

/// Default memory tier budget: 5 MiB
pub const DEFAULT_MEMORY_CACHE_SIZE: usize = 5 * 1024 * 1024;
/// Default disk tier budget: 10 MiB
pub const DEFAULT_DISK_CACHE_SIZE: u64 = 10 * 1024 * 1024;
/// Default JPEG quality for persisted bitmaps
pub const DEFAULT_COMPRESS_QUALITY: u8 = 70;
/// Namespace used by [`CacheConfig::default`]
pub const DEFAULT_NAMESPACE: &str = "images";

/// Smallest accepted fraction for [`CacheConfig::with_memory_percent`]
pub const MIN_MEMORY_PERCENT: f32 = 0.05;
/// Largest accepted fraction for [`CacheConfig::with_memory_percent`]
pub const MAX_MEMORY_PERCENT: f32 = 0.8;

/// Configuration for one image cache namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memory tier budget in bytes of decoded pixels
    pub memory_cache_size: usize,
    /// Disk tier budget in bytes of encoded data
    pub disk_cache_size: u64,
    /// Directory holding the disk journal for this namespace
    pub disk_cache_dir: PathBuf,
    /// Codec used when persisting bitmaps
    pub compress_format: CompressFormat,
    /// Codec quality, 1-100 (lossy formats only)
    pub compress_quality: u8,
    pub memory_cache_enabled: bool,
    pub disk_cache_enabled: bool,
    /// Open the disk journal while constructing the cache instead of on the
    /// maintenance thread
    pub init_disk_cache_on_create: bool,
    /// Delete any existing journal the first time the disk tier opens
    pub clear_disk_cache_on_start: bool,
    /// Bounds used when decoding bitmaps read back from disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_size: Option<ImageSize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_cache_size: DEFAULT_MEMORY_CACHE_SIZE,
            disk_cache_size: DEFAULT_DISK_CACHE_SIZE,
            disk_cache_dir: Self::default_cache_dir(DEFAULT_NAMESPACE),
            compress_format: CompressFormat::default(),
            compress_quality: DEFAULT_COMPRESS_QUALITY,
            memory_cache_enabled: true,
            disk_cache_enabled: true,
            init_disk_cache_on_create: false,
            clear_disk_cache_on_start: false,
            target_size: None,
        }
    }
}

impl CacheConfig {
    /// Default configuration whose disk directory is the platform cache
    /// directory for `namespace`.
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            disk_cache_dir: Self::default_cache_dir(namespace),
            ..Self::default()
        }
    }

    /// Sets the memory budget in kilobytes.
    pub fn with_memory_kb(mut self, kb: usize) -> Self {
        self.memory_cache_size = kb * 1024;
        self
    }

    /// Sets the memory budget in megabytes.
    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.memory_cache_size = mb * 1024 * 1024;
        self
    }

    /// Sets the memory budget to `percent` of the memory currently available
    /// on this machine.
    ///
    /// # Errors
    /// Returns [`ConfigError::MemoryPercentOutOfRange`] unless `percent` lies
    /// in `[0.05, 0.8]`.
    pub fn with_memory_percent(self, percent: f32) -> Result<Self, ConfigError> {
        let mut system = System::new();
        system.refresh_memory();
        self.with_memory_percent_of(percent, system.available_memory())
    }

    /// Like [`with_memory_percent`](Self::with_memory_percent) against an
    /// explicit amount of available memory in bytes.
    pub fn with_memory_percent_of(
        mut self,
        percent: f32,
        available_bytes: u64,
    ) -> Result<Self, ConfigError> {
        if !(MIN_MEMORY_PERCENT..=MAX_MEMORY_PERCENT).contains(&percent) {
            return Err(ConfigError::MemoryPercentOutOfRange(percent));
        }
        self.memory_cache_size = (available_bytes as f64 * percent as f64).round() as usize;
        Ok(self)
    }

    /// Sets the disk budget in megabytes.
    pub fn with_disk_mb(mut self, mb: u64) -> Self {
        self.disk_cache_size = mb * 1024 * 1024;
        self
    }

    /// Sets the disk budget in bytes.
    pub fn with_disk_bytes(mut self, bytes: u64) -> Self {
        self.disk_cache_size = bytes;
        self
    }

    /// Sets the disk cache directory.
    pub fn with_disk_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.disk_cache_dir = path.as_ref().to_path_buf();
        self
    }

    /// Sets the codec and quality used for persisted bitmaps.
    pub fn with_compression(mut self, format: CompressFormat, quality: u8) -> Self {
        self.compress_format = format;
        self.compress_quality = quality;
        self
    }

    pub fn with_memory_cache(mut self, enabled: bool) -> Self {
        self.memory_cache_enabled = enabled;
        self
    }

    pub fn with_disk_cache(mut self, enabled: bool) -> Self {
        self.disk_cache_enabled = enabled;
        self
    }

    pub fn with_init_disk_cache_on_create(mut self, enabled: bool) -> Self {
        self.init_disk_cache_on_create = enabled;
        self
    }

    pub fn with_clear_disk_cache_on_start(mut self, enabled: bool) -> Self {
        self.clear_disk_cache_on_start = enabled;
        self
    }

    /// Sets the bounds used when decoding bitmaps read back from disk.
    pub fn with_target_size(mut self, size: ImageSize) -> Self {
        self.target_size = Some(size);
        self
    }

    /// Returns the default cache directory for `namespace`.
    ///
    /// - macOS: ~/Library/Caches/thumbgrid/<namespace>
    /// - Linux: ~/.cache/thumbgrid/<namespace>
    /// - Windows: %LOCALAPPDATA%\thumbgrid\<namespace>
    pub fn default_cache_dir(namespace: &str) -> PathBuf {
        if let Some(cache_dir) = dirs::cache_dir() {
            cache_dir.join("thumbgrid").join(namespace)
        } else {
            // Fallback to current directory if cache dir unavailable
            PathBuf::from("cache").join(namespace)
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `THUMBGRID_MEMORY_CACHE_KB`: memory budget in KB (default: 5120)
    /// - `THUMBGRID_DISK_CACHE_MB`: disk budget in MB (default: 10)
    /// - `THUMBGRID_CACHE_DIR`: disk cache directory path
    /// - `THUMBGRID_COMPRESS_QUALITY`: codec quality, 1-100 (default: 70)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("THUMBGRID_MEMORY_CACHE_KB") {
            config.memory_cache_size = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("THUMBGRID_MEMORY_CACHE_KB".to_string()))?
                * 1024;
        }

        if let Ok(val) = std::env::var("THUMBGRID_DISK_CACHE_MB") {
            config.disk_cache_size = val
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue("THUMBGRID_DISK_CACHE_MB".to_string()))?
                * 1024
                * 1024;
        }

        if let Ok(val) = std::env::var("THUMBGRID_CACHE_DIR") {
            config.disk_cache_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("THUMBGRID_COMPRESS_QUALITY") {
            config.compress_quality = val
                .parse::<u8>()
                .ok()
                .filter(|q| (1..=100).contains(q))
                .ok_or_else(|| {
                    ConfigError::InvalidValue("THUMBGRID_COMPRESS_QUALITY".to_string())
                })?;
        }

        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Missing keys keep their defaults:
    /// ```toml
    /// memory_cache_size = 5242880
    /// disk_cache_size = 10485760
    /// disk_cache_dir = "/path/to/cache/thumbs"
    /// compress_format = "jpeg"
    /// compress_quality = 70
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Saves configuration to a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_toml()?)?;
        Ok(())
    }

    /// Converts configuration to TOML format.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the memory budget in kilobytes.
    pub fn memory_cache_kb(&self) -> usize {
        self.memory_cache_size / 1024
    }

    /// Returns the disk budget in megabytes.
    pub fn disk_cache_mb(&self) -> u64 {
        self.disk_cache_size / (1024 * 1024)
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),

    #[error("memory cache percent {0} outside the range 0.05..=0.8")]
    MemoryPercentOutOfRange(f32),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}
