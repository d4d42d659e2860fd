//! Image fetcher
//!
//! Resolves a key to its [`ImageSource`] and decodes it, downsampled to the
//! current target size. URL bodies are stored in the raw-bytes disk tier
//! before decoding so repeated requests never hit the network.

use crate::config::{FetcherConfig, HTTP_CACHE_NAMESPACE};
use crate::error::FetchError;
use crate::http::{build_agent, download_to};
use crate::producer::BitmapProducer;
use crate::resources::ResourceBundle;
use crate::source::ImageSource;
use parking_lot::RwLock;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use thumbgrid_cache::{hash_key_for_disk, DiskLruCache, DiskTier};
use thumbgrid_decode::{decode_sampled, decode_sampled_file, Bitmap, ImageSize};

pub struct ImageFetcher {
    config: FetcherConfig,
    image_size: RwLock<ImageSize>,
    http_cache: DiskTier,
    resources: ResourceBundle,
    agent: ureq::Agent,
}

impl ImageFetcher {
    /// Create a fetcher. The raw-bytes tier opens on
    /// [`init_disk_cache`](BitmapProducer::init_disk_cache).
    pub fn new(config: FetcherConfig) -> Self {
        let http_cache = if config.http_cache_enabled {
            DiskTier::new(
                HTTP_CACHE_NAMESPACE,
                config.http_cache_dir.clone(),
                config.http_cache_size,
            )
        } else {
            DiskTier::disabled(HTTP_CACHE_NAMESPACE)
        };

        Self {
            image_size: RwLock::new(config.image_size),
            agent: build_agent(&config),
            resources: ResourceBundle::new(),
            http_cache,
            config,
        }
    }

    pub fn with_resources(mut self, resources: ResourceBundle) -> Self {
        self.resources = resources;
        self
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Change the decode bounds for subsequently produced bitmaps
    pub fn set_image_size(&self, width: u32, height: u32) {
        *self.image_size.write() = ImageSize::new(width, height);
    }

    pub fn set_image_size_square(&self, size: u32) {
        self.set_image_size(size, size);
    }

    pub fn image_size(&self) -> ImageSize {
        *self.image_size.read()
    }

    /// The raw-bytes disk tier
    pub fn http_cache(&self) -> &DiskTier {
        &self.http_cache
    }

    /// Decode the image behind `source`.
    pub fn fetch(&self, source: &ImageSource) -> Result<Bitmap, FetchError> {
        let target = self.image_size();
        match source {
            ImageSource::Resource(name) => {
                let bytes = self.resources.load(name)?;
                Ok(decode_sampled(&bytes, Some(target))?)
            }
            ImageSource::File(path) => self.decode_file(path, target),
            ImageSource::Url(url) => self.fetch_url(url, target),
        }
    }

    fn decode_file(&self, path: &Path, target: ImageSize) -> Result<Bitmap, FetchError> {
        Ok(decode_sampled_file(path, Some(target))?)
    }

    fn fetch_url(&self, url: &str, target: ImageSize) -> Result<Bitmap, FetchError> {
        let Some(journal) = self.http_cache.journal() else {
            return self.download_to_memory(url, target);
        };

        let disk_key = hash_key_for_disk(url);
        let bytes = match journal.get(&disk_key)? {
            Some(snapshot) => snapshot.read_to_vec()?,
            None => match self.download_into_cache(&journal, &disk_key, url)? {
                Some(bytes) => bytes,
                None => return self.download_to_memory(url, target),
            },
        };

        match decode_sampled(&bytes, Some(target)) {
            Ok(bitmap) => Ok(bitmap),
            Err(err) => {
                // Drop the bad body so the next request downloads it again
                if let Err(remove_err) = journal.remove(&disk_key) {
                    tracing::warn!(url, error = %remove_err, "failed to drop undecodable body");
                }
                Err(err.into())
            }
        }
    }

    /// Stream `url` into a new journal entry, keeping a copy of the body.
    ///
    /// The body is decoded from the copy, so an entry evicted right after
    /// commit costs no second request. Returns `Ok(None)` when another worker
    /// is already writing the entry.
    fn download_into_cache(
        &self,
        journal: &Arc<DiskLruCache>,
        disk_key: &str,
        url: &str,
    ) -> Result<Option<Vec<u8>>, FetchError> {
        let Some(mut editor) = journal.edit(disk_key)? else {
            tracing::debug!(url, "body is being downloaded by another worker");
            return Ok(None);
        };

        let mut body = Vec::new();
        let result = download_to(
            &self.agent,
            url,
            TeeWriter {
                first: &mut editor,
                second: &mut body,
            },
        );
        match result {
            Ok(_) => editor.commit()?,
            Err(err) => {
                editor.abort()?;
                return Err(err);
            }
        }

        if body.len() as u64 > journal.max_size() {
            tracing::debug!(url, size = body.len(), "downloaded body did not fit the cache");
        }
        Ok(Some(body))
    }

    fn download_to_memory(&self, url: &str, target: ImageSize) -> Result<Bitmap, FetchError> {
        let mut bytes = Vec::new();
        download_to(&self.agent, url, &mut bytes)?;
        Ok(decode_sampled(&bytes, Some(target))?)
    }
}

/// Writes every buffer to both inner writers
struct TeeWriter<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

impl BitmapProducer for ImageFetcher {
    fn produce(&self, key: &str) -> Option<Bitmap> {
        match self.fetch(&ImageSource::parse(key)) {
            Ok(bitmap) => Some(bitmap),
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to produce bitmap");
                None
            }
        }
    }

    fn init_disk_cache(&self) {
        self.http_cache.initialize();
    }

    fn clear_cache(&self) {
        self.http_cache.clear();
    }

    fn flush_cache(&self) {
        self.http_cache.flush();
    }

    fn close_cache(&self) {
        self.http_cache.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::fs;
    use tempfile::TempDir;
    use thumbgrid_decode::{encode, CompressFormat};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let bitmap = Bitmap::new(DynamicImage::ImageRgb8(RgbImage::new(width, height)));
        let mut bytes = Vec::new();
        encode(&bitmap, CompressFormat::Png, 100, &mut bytes).unwrap();
        bytes
    }

    fn fetcher(dir: &TempDir) -> ImageFetcher {
        let fetcher = ImageFetcher::new(
            FetcherConfig::default()
                .with_image_size(50, 50)
                .with_http_cache_dir(dir.path().join("http")),
        );
        fetcher.init_disk_cache();
        fetcher
    }

    #[test]
    fn test_resource_is_downsampled() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&dir)
            .with_resources(ResourceBundle::new().with_resource("photo.png", png(200, 100)));

        let bitmap = fetcher.produce("res:photo.png").unwrap();
        assert_eq!(bitmap.size(), ImageSize::new(100, 50));
        assert!(fetcher.produce("res:unknown.png").is_none());
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.png");
        fs::write(&path, png(40, 40)).unwrap();

        let fetcher = fetcher(&dir);
        let bitmap = fetcher.produce(path.to_str().unwrap()).unwrap();
        assert_eq!(bitmap.size(), ImageSize::square(40));
        assert!(fetcher.produce("/no/such/file.png").is_none());
    }

    #[test]
    fn test_url_is_downloaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/photo.png")
            .with_status(200)
            .with_body(png(100, 100))
            .expect(1)
            .create();
        let url = format!("{}/photo.png", server.url());

        let fetcher = fetcher(&dir);
        let first = fetcher.produce(&url).unwrap();
        let second = fetcher.produce(&url).unwrap();
        assert_eq!(first.size(), ImageSize::square(50));
        assert_eq!(second.size(), ImageSize::square(50));
        mock.assert();

        let journal = fetcher.http_cache().journal().unwrap();
        assert!(journal.get(&hash_key_for_disk(&url)).unwrap().is_some());
    }

    #[test]
    fn test_body_larger_than_cache_is_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 7 ^ y * 13) as u8, (x * y) as u8, (x + y * 3) as u8])
        });
        let mut body = Vec::new();
        encode(
            &Bitmap::new(DynamicImage::ImageRgb8(image)),
            CompressFormat::Png,
            100,
            &mut body,
        )
        .unwrap();
        assert!(body.len() > 100);

        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/large.png")
            .with_status(200)
            .with_body(&body)
            .expect(1)
            .create();
        let url = format!("{}/large.png", server.url());

        let fetcher = ImageFetcher::new(
            FetcherConfig::default()
                .with_image_size(32, 32)
                .with_http_cache_dir(dir.path().join("http"))
                .with_http_cache_size(100),
        );
        fetcher.init_disk_cache();

        let bitmap = fetcher.produce(&url).unwrap();
        assert_eq!(bitmap.size(), ImageSize::square(32));
        mock.assert();

        // The body was committed and then trimmed away
        let journal = fetcher.http_cache().journal().unwrap();
        assert!(journal.get(&hash_key_for_disk(&url)).unwrap().is_none());
    }

    #[test]
    fn test_failed_download_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/gone.png").with_status(404).create();
        let url = format!("{}/gone.png", server.url());

        let fetcher = fetcher(&dir);
        assert!(fetcher.produce(&url).is_none());
        mock.assert();

        let journal = fetcher.http_cache().journal().unwrap();
        assert!(journal.is_empty());
        assert_eq!(journal.size(), 0);
    }

    #[test]
    fn test_undecodable_body_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/broken.png")
            .with_status(200)
            .with_body("<html>not an image</html>")
            .expect(2)
            .create();
        let url = format!("{}/broken.png", server.url());

        let fetcher = fetcher(&dir);
        assert!(fetcher.produce(&url).is_none());
        assert!(fetcher.produce(&url).is_none());
        mock.assert();
    }

    #[test]
    fn test_disabled_http_cache_downloads_every_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/photo.png")
            .with_status(200)
            .with_body(png(20, 20))
            .expect(2)
            .create();
        let url = format!("{}/photo.png", server.url());

        let fetcher = ImageFetcher::new(
            FetcherConfig::default()
                .with_http_cache_dir(dir.path().join("http"))
                .with_http_cache(false),
        );
        fetcher.init_disk_cache();
        assert!(fetcher.produce(&url).is_some());
        assert!(fetcher.produce(&url).is_some());
        mock.assert();
        assert!(!dir.path().join("http").exists());
    }

    #[test]
    fn test_image_size_can_change() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&dir)
            .with_resources(ResourceBundle::new().with_resource("photo.png", png(400, 400)));

        fetcher.set_image_size_square(200);
        assert_eq!(fetcher.image_size(), ImageSize::square(200));
        assert_eq!(fetcher.produce("res:photo.png").unwrap().size(), ImageSize::square(200));

        fetcher.set_image_size(100, 100);
        assert_eq!(fetcher.produce("res:photo.png").unwrap().size(), ImageSize::square(100));
    }

    #[test]
    fn test_clear_cache_forces_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/photo.png")
            .with_status(200)
            .with_body(png(30, 30))
            .expect(2)
            .create();
        let url = format!("{}/photo.png", server.url());

        let fetcher = fetcher(&dir);
        assert!(fetcher.produce(&url).is_some());
        fetcher.flush_cache();
        fetcher.clear_cache();
        assert!(fetcher.produce(&url).is_some());
        mock.assert();

        fetcher.close_cache();
        assert!(fetcher.http_cache().journal().is_none());
    }
}
