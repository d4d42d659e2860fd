//! Fetcher configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thumbgrid_cache::CacheConfig;
use thumbgrid_decode::ImageSize;

/// Namespace of the raw-bytes disk tier
pub const HTTP_CACHE_NAMESPACE: &str = "http";
/// Default raw-bytes disk tier budget: 10 MiB
pub const DEFAULT_HTTP_CACHE_SIZE: u64 = 10 * 1024 * 1024;
/// Default decode bounds for produced bitmaps
pub const DEFAULT_IMAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Bounds every produced bitmap is downsampled towards
    pub image_size: ImageSize,
    /// Directory of the raw-bytes disk tier
    pub http_cache_dir: PathBuf,
    /// Raw-bytes disk tier budget in bytes
    pub http_cache_size: u64,
    /// With the raw-bytes tier disabled, URLs are downloaded into memory on
    /// every request
    pub http_cache_enabled: bool,
    /// Close each connection after its response instead of pooling it
    pub disable_connection_reuse: bool,
    /// Overall timeout of one HTTP request, in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            image_size: ImageSize::square(DEFAULT_IMAGE_SIZE),
            http_cache_dir: CacheConfig::default_cache_dir(HTTP_CACHE_NAMESPACE),
            http_cache_size: DEFAULT_HTTP_CACHE_SIZE,
            http_cache_enabled: true,
            disable_connection_reuse: false,
            timeout_secs: 30,
            user_agent: concat!("thumbgrid/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetcherConfig {
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_size = ImageSize::new(width, height);
        self
    }

    pub fn with_http_cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.http_cache_dir = path.into();
        self
    }

    pub fn with_http_cache_size(mut self, bytes: u64) -> Self {
        self.http_cache_size = bytes;
        self
    }

    pub fn with_http_cache(mut self, enabled: bool) -> Self {
        self.http_cache_enabled = enabled;
        self
    }

    pub fn with_connection_reuse(mut self, enabled: bool) -> Self {
        self.disable_connection_reuse = !enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.http_cache_size, 10 * 1024 * 1024);
        assert!(config.http_cache_dir.ends_with("http"));
        assert!(config.http_cache_enabled);
        assert!(!config.disable_connection_reuse);
        assert!(config.user_agent.starts_with("thumbgrid/"));
    }

    #[test]
    fn test_builders() {
        let config = FetcherConfig::default()
            .with_image_size(320, 240)
            .with_http_cache_dir("/tmp/http")
            .with_connection_reuse(false)
            .with_timeout(Duration::from_millis(10));

        assert_eq!(config.image_size, ImageSize::new(320, 240));
        assert_eq!(config.http_cache_dir, PathBuf::from("/tmp/http"));
        assert!(config.disable_connection_reuse);
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
