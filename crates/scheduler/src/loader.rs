//! Image loader
//!
//! Binds display targets to background work units. A request served from
//! the memory tier is shown synchronously; anything else is loaded on the
//! worker pool from the disk tier or, failing that, the producer. Each
//! target waits on at most one unit, and a result only reaches a target
//! that is still bound to the unit that produced it.

use crate::maintenance::{CacheOp, CacheThread, Completion};
use crate::pause::PauseGate;
use crate::target::{ImageTarget, Transition};
use crate::work::WorkUnit;
use crate::worker::{WorkerPool, WorkerPoolConfig};
use parking_lot::RwLock;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thumbgrid_cache::{CacheConfig, CacheRegistry, ImageCache};
use thumbgrid_decode::Bitmap;
use thumbgrid_fetch::BitmapProducer;

/// Default cross-fade duration for delivered bitmaps
pub const DEFAULT_FADE_IN_DURATION: Duration = Duration::from_millis(200);

/// Configuration for an [`ImageLoader`]
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of worker threads loading images.
    /// Default: 2.
    pub workers: usize,

    /// How often idle workers check for shutdown.
    /// Default: 100ms.
    pub poll_interval: Duration,

    /// Cross-fade delivered bitmaps over the placeholder.
    /// Default: true.
    pub fade_in: bool,

    /// Default: 200ms.
    pub fade_in_duration: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            poll_interval: Duration::from_millis(100),
            fade_in: true,
            fade_in_duration: DEFAULT_FADE_IN_DURATION,
        }
    }
}

impl LoaderConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_fade_in(mut self, fade_in: bool) -> Self {
        self.fade_in = fade_in;
        self
    }

    pub fn with_fade_in_duration(mut self, duration: Duration) -> Self {
        self.fade_in_duration = duration;
        self
    }
}

/// Outcome of checking a target for work already bound to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkConflict {
    /// Nothing useful is bound; any stale unit has been cancelled
    NoConflict,
    /// The target is already loading the same key
    SameWorkInProgress,
}

/// State shared between the loader and its workers
struct Shared {
    producer: Arc<dyn BitmapProducer>,
    cache: RwLock<Option<Arc<ImageCache>>>,
    pause: PauseGate,
    exit_early: AtomicBool,
    fade_in: AtomicBool,
    fade_in_duration: Duration,
    loading_image: RwLock<Option<Bitmap>>,
}

impl Shared {
    fn cache(&self) -> Option<Arc<ImageCache>> {
        self.cache.read().clone()
    }

    fn exits_early(&self) -> bool {
        self.exit_early.load(Ordering::Acquire)
    }

    fn should_continue(&self, unit: &WorkUnit) -> bool {
        !unit.is_cancelled() && unit.is_bound() && !self.exits_early()
    }

    fn transition(&self) -> Transition {
        if self.fade_in.load(Ordering::Acquire) {
            Transition::FadeIn(self.fade_in_duration)
        } else {
            Transition::Immediate
        }
    }

    fn run_unit(&self, unit: &WorkUnit) {
        let key = unit.key();
        tracing::trace!(key, unit = unit.id(), "work unit started");
        unit.mark_started();
        self.pause.wait_while_paused(unit.token());

        let cache = self.cache();
        let mut bitmap = None;
        if self.should_continue(unit) {
            bitmap = cache.as_ref().and_then(|cache| cache.get_from_disk(key));
        }
        if bitmap.is_none() && self.should_continue(unit) {
            bitmap = self.producer.produce(key);
        }

        // Keep whatever was produced, even if nobody wants it any more
        if let (Some(bitmap), Some(cache)) = (&bitmap, &cache) {
            cache.put(key, bitmap);
        }

        let delivered = if unit.is_cancelled() || self.exits_early() {
            false
        } else {
            match (bitmap, unit.target()) {
                (Some(bitmap), Some(target)) => {
                    target.deliver_if_bound(unit.id(), bitmap, self.transition())
                }
                _ => false,
            }
        };

        if delivered {
            tracing::trace!(key, unit = unit.id(), "bitmap delivered");
        } else if let Some(target) = unit.target() {
            // Let a later request for the same key start over
            target.unbind_if(unit.id());
        }

        if unit.is_cancelled() {
            self.pause.wake_all();
        }
    }
}

/// Loads images into [`ImageTarget`]s through a tiered cache and a
/// [`BitmapProducer`].
///
/// Requests are meant to come from one dispatch thread. Dropping the loader
/// releases paused workers and lets them exit after their current unit.
pub struct ImageLoader {
    shared: Arc<Shared>,
    pool: WorkerPool<Arc<WorkUnit>>,
    cache_thread: CacheThread,
    next_unit_id: AtomicU64,
}

impl ImageLoader {
    pub fn new(producer: Arc<dyn BitmapProducer>, config: LoaderConfig) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            producer,
            cache: RwLock::new(None),
            pause: PauseGate::new(),
            exit_early: AtomicBool::new(false),
            fade_in: AtomicBool::new(config.fade_in),
            fade_in_duration: config.fade_in_duration,
            loading_image: RwLock::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let pool = WorkerPool::new(
            "thumbgrid-loader",
            Arc::new(move |unit: Arc<WorkUnit>| worker_shared.run_unit(&unit)),
            WorkerPoolConfig::new(config.workers).with_poll_interval(config.poll_interval),
        )?;
        let cache_thread = CacheThread::new(config.poll_interval)?;

        Ok(Self {
            shared,
            pool,
            cache_thread,
            next_unit_id: AtomicU64::new(1),
        })
    }

    pub fn producer(&self) -> &Arc<dyn BitmapProducer> {
        &self.shared.producer
    }

    /// Load the image for `key` into `target`.
    ///
    /// A `None` key does nothing. A memory-tier hit is shown before this
    /// returns. Otherwise the target shows the loading image and a work unit
    /// is queued, unless the target is already loading the same key.
    pub fn load_image(&self, key: Option<&str>, target: &Arc<ImageTarget>) {
        let Some(key) = key else {
            return;
        };

        if let Some(bitmap) = self.shared.cache().and_then(|cache| cache.get(key)) {
            target.show(bitmap, Transition::Immediate);
            return;
        }

        if self.cancel_potential_work(key, target) == WorkConflict::SameWorkInProgress {
            return;
        }

        let id = self.next_unit_id.fetch_add(1, Ordering::Relaxed);
        let unit = Arc::new(WorkUnit::new(id, key, target));
        let placeholder = self.shared.loading_image.read().clone();
        target.bind(Arc::clone(&unit), placeholder);
        if !self.pool.submit(unit) {
            tracing::warn!(key, "loader is shutting down, request dropped");
        }
    }

    /// Cancel the unit bound to `target` unless it is already loading `key`.
    pub fn cancel_potential_work(&self, key: &str, target: &ImageTarget) -> WorkConflict {
        let Some(unit) = target.bound_unit() else {
            return WorkConflict::NoConflict;
        };

        if unit.key() == key && unit.is_started() && !unit.is_cancelled() {
            return WorkConflict::SameWorkInProgress;
        }

        unit.cancel();
        self.shared.pause.wake_all();
        tracing::debug!(key = unit.key(), unit = unit.id(), "cancelled work");
        WorkConflict::NoConflict
    }

    /// Cancel whatever `target` is loading.
    ///
    /// Returns true if a unit was bound.
    pub fn cancel_work(&self, target: &ImageTarget) -> bool {
        let Some(unit) = target.detach_unit() else {
            return false;
        };
        unit.cancel();
        self.shared.pause.wake_all();
        tracing::debug!(key = unit.key(), unit = unit.id(), "cancelled work");
        true
    }

    /// The target left the screen
    pub fn detach(&self, target: &ImageTarget) -> bool {
        self.cancel_work(target)
    }

    /// Hold units before they touch the cache or producer. Resuming wakes
    /// all of them.
    pub fn set_pause_work(&self, paused: bool) {
        self.shared.pause.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.pause.is_paused()
    }

    /// Make running units skip their remaining work and results.
    ///
    /// Always resumes paused work so waiting units can observe the flag.
    pub fn set_exit_tasks_early(&self, exit_early: bool) {
        self.shared.exit_early.store(exit_early, Ordering::Release);
        self.set_pause_work(false);
    }

    pub fn exits_early(&self) -> bool {
        self.shared.exits_early()
    }

    /// Bitmap shown while a unit is loading
    pub fn set_loading_image(&self, bitmap: Option<Bitmap>) {
        *self.shared.loading_image.write() = bitmap;
    }

    pub fn set_image_fade_in(&self, fade_in: bool) {
        self.shared.fade_in.store(fade_in, Ordering::Release);
    }

    pub fn image_cache(&self) -> Option<Arc<ImageCache>> {
        self.shared.cache()
    }

    /// Use `cache` for subsequent requests. Does not initialize its disk tier.
    pub fn set_image_cache(&self, cache: Option<Arc<ImageCache>>) {
        *self.shared.cache.write() = cache;
    }

    /// Find or create the cache for `namespace`, use it, and initialize the
    /// disk tiers on the cache thread.
    pub fn add_image_cache(
        &self,
        registry: &CacheRegistry,
        namespace: &str,
        config: CacheConfig,
    ) -> Completion {
        let cache = registry.find_or_create(namespace, config);
        self.set_image_cache(Some(Arc::clone(&cache)));

        let producer = Arc::clone(&self.shared.producer);
        self.cache_thread.schedule(CacheOp::Init, move || {
            cache.init_disk_cache();
            producer.init_disk_cache();
        })
    }

    /// Initialize the current cache's disk tier and the producer's.
    pub fn init_disk_cache(&self) -> Completion {
        let shared = Arc::clone(&self.shared);
        self.cache_thread.schedule(CacheOp::Init, move || {
            if let Some(cache) = shared.cache() {
                cache.init_disk_cache();
            }
            shared.producer.init_disk_cache();
        })
    }

    /// Empty every tier, then reopen the disk tiers.
    pub fn clear_cache(&self) -> Completion {
        let shared = Arc::clone(&self.shared);
        self.cache_thread.schedule(CacheOp::Clear, move || {
            if let Some(cache) = shared.cache() {
                cache.clear();
            }
            shared.producer.clear_cache();
        })
    }

    pub fn flush_cache(&self) -> Completion {
        let shared = Arc::clone(&self.shared);
        self.cache_thread.schedule(CacheOp::Flush, move || {
            if let Some(cache) = shared.cache() {
                cache.flush();
            }
            shared.producer.flush_cache();
        })
    }

    /// Close the disk tiers and stop using the current cache.
    pub fn close_cache(&self) -> Completion {
        let shared = Arc::clone(&self.shared);
        self.cache_thread.schedule(CacheOp::Close, move || {
            let cache = shared.cache.write().take();
            if let Some(cache) = cache {
                cache.close();
            }
            shared.producer.close_cache();
        })
    }

    /// Units waiting for a worker
    pub fn pending(&self) -> usize {
        self.pool.pending()
    }

    /// Run queued cache maintenance, then stop.
    ///
    /// Units in progress finish in the background and deliver nothing.
    pub fn shutdown(self) {
        self.release_workers();
        self.cache_thread.drain();
    }

    fn release_workers(&self) {
        self.shared.exit_early.store(true, Ordering::Release);
        self.shared.pause.set_paused(false);
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        self.release_workers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetContent;
    use image::{DynamicImage, RgbImage};
    use parking_lot::{Condvar, Mutex};
    use std::thread;
    use std::time::Instant;
    use tempfile::TempDir;

    fn bitmap(size: u32) -> Bitmap {
        Bitmap::new(DynamicImage::ImageRgb8(RgbImage::new(size, size)))
    }

    /// Key `"<n>"` produces an n×n bitmap; anything else fails.
    /// Production of keys listed in `held` blocks until released.
    #[derive(Default)]
    struct TestProducer {
        calls: Mutex<Vec<String>>,
        held: Mutex<Vec<String>>,
        released: Condvar,
    }

    impl TestProducer {
        fn hold(&self, key: &str) {
            self.held.lock().push(key.to_string());
        }

        fn release(&self, key: &str) {
            self.held.lock().retain(|held| held != key);
            self.released.notify_all();
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl BitmapProducer for TestProducer {
        fn produce(&self, key: &str) -> Option<Bitmap> {
            self.calls.lock().push(key.to_string());
            let mut held = self.held.lock();
            while held.iter().any(|held| held == key) {
                self.released.wait(&mut held);
            }
            key.parse().ok().map(bitmap)
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn loader(producer: &Arc<TestProducer>) -> ImageLoader {
        let config = LoaderConfig::default().with_poll_interval(Duration::from_millis(10));
        ImageLoader::new(Arc::clone(producer) as Arc<dyn BitmapProducer>, config).unwrap()
    }

    fn cache(dir: &TempDir) -> Arc<ImageCache> {
        Arc::new(ImageCache::new(
            CacheConfig::default()
                .with_disk_dir(dir.path().join("images"))
                .with_init_disk_cache_on_create(true),
        ))
    }

    fn shown_size(target: &ImageTarget) -> Option<u32> {
        match target.content() {
            TargetContent::Ready { bitmap, .. } => Some(bitmap.width()),
            _ => None,
        }
    }

    #[test]
    fn test_loader_config_default() {
        let config = LoaderConfig::default();
        assert_eq!(config.workers, 2);
        assert!(config.fade_in);
        assert_eq!(config.fade_in_duration, Duration::from_millis(200));
        assert_eq!(LoaderConfig::default().with_workers(0).workers, 1);
    }

    #[test]
    fn test_missing_key_is_ignored() {
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let target = Arc::new(ImageTarget::new());

        loader.load_image(None, &target);
        assert!(matches!(target.content(), TargetContent::Empty));
        assert_eq!(loader.pending(), 0);
    }

    #[test]
    fn test_load_delivers_with_fade_in() {
        let dir = tempfile::tempdir().unwrap();
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let cache = cache(&dir);
        loader.set_image_cache(Some(Arc::clone(&cache)));
        let target = Arc::new(ImageTarget::new());

        loader.load_image(Some("12"), &target);
        assert!(wait_for(|| shown_size(&target) == Some(12)));
        assert!(matches!(
            target.content(),
            TargetContent::Ready {
                transition: Transition::FadeIn(_),
                ..
            }
        ));
        assert_eq!(producer.calls(), vec!["12"]);
        assert!(target.current_unit_id().is_none());
        assert!(wait_for(|| cache.get("12").is_some()));
    }

    #[test]
    fn test_fade_in_can_be_disabled() {
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        loader.set_image_fade_in(false);
        let target = Arc::new(ImageTarget::new());

        loader.load_image(Some("3"), &target);
        assert!(wait_for(|| shown_size(&target) == Some(3)));
        assert!(matches!(
            target.content(),
            TargetContent::Ready {
                transition: Transition::Immediate,
                ..
            }
        ));
    }

    #[test]
    fn test_memory_hit_is_synchronous() {
        let dir = tempfile::tempdir().unwrap();
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let cache = cache(&dir);
        cache.put("cached", &bitmap(9));
        loader.set_image_cache(Some(cache));
        let target = Arc::new(ImageTarget::new());

        loader.load_image(Some("cached"), &target);
        assert_eq!(shown_size(&target), Some(9));
        assert!(matches!(
            target.content(),
            TargetContent::Ready {
                transition: Transition::Immediate,
                ..
            }
        ));
        assert_eq!(loader.pending(), 0);
        assert!(producer.calls().is_empty());
    }

    #[test]
    fn test_disk_hit_skips_producer() {
        let dir = tempfile::tempdir().unwrap();
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let cache = Arc::new(ImageCache::new(
            CacheConfig::default()
                .with_disk_dir(dir.path().join("images"))
                .with_memory_cache(false)
                .with_init_disk_cache_on_create(true),
        ));
        cache.put("on-disk", &bitmap(7));
        loader.set_image_cache(Some(cache));
        let target = Arc::new(ImageTarget::new());

        loader.load_image(Some("on-disk"), &target);
        assert!(wait_for(|| shown_size(&target) == Some(7)));
        assert!(producer.calls().is_empty());
    }

    #[test]
    fn test_back_to_back_requests_run_once() {
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let target = Arc::new(ImageTarget::new());

        loader.set_pause_work(true);
        loader.load_image(Some("5"), &target);
        loader.load_image(Some("5"), &target);
        loader.set_pause_work(false);

        assert!(wait_for(|| shown_size(&target) == Some(5)));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(producer.calls(), vec!["5"]);
    }

    #[test]
    fn test_same_key_in_progress_is_kept() {
        let producer = Arc::new(TestProducer::default());
        producer.hold("6");
        let loader = loader(&producer);
        let target = Arc::new(ImageTarget::new());

        loader.load_image(Some("6"), &target);
        assert!(wait_for(|| producer.calls().len() == 1));
        let unit = target.current_unit_id();

        assert_eq!(
            loader.cancel_potential_work("6", &target),
            WorkConflict::SameWorkInProgress
        );
        loader.load_image(Some("6"), &target);
        assert_eq!(target.current_unit_id(), unit);

        producer.release("6");
        assert!(wait_for(|| shown_size(&target) == Some(6)));
        assert_eq!(producer.calls().len(), 1);
    }

    #[test]
    fn test_rebinding_never_delivers_stale_result() {
        let dir = tempfile::tempdir().unwrap();
        let producer = Arc::new(TestProducer::default());
        producer.hold("10");
        let loader = loader(&producer);
        let cache = cache(&dir);
        loader.set_image_cache(Some(Arc::clone(&cache)));
        let target = Arc::new(ImageTarget::new());

        loader.load_image(Some("10"), &target);
        assert!(wait_for(|| producer.calls().len() == 1));
        let stale = target.bound_unit().unwrap();

        loader.load_image(Some("20"), &target);
        assert!(stale.is_cancelled());
        assert!(wait_for(|| shown_size(&target) == Some(20)));

        producer.release("10");
        // The stale bitmap is still cached, just never shown
        assert!(wait_for(|| cache.get("10").is_some()));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(shown_size(&target), Some(20));
    }

    #[test]
    fn test_pause_holds_work_until_resume() {
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let placeholder = bitmap(1);
        loader.set_loading_image(Some(placeholder.clone()));
        let target = Arc::new(ImageTarget::new());

        loader.set_pause_work(true);
        assert!(loader.is_paused());
        loader.load_image(Some("4"), &target);
        thread::sleep(Duration::from_millis(50));
        assert!(producer.calls().is_empty());
        assert!(target.bitmap().unwrap().ptr_eq(&placeholder));

        loader.set_pause_work(false);
        assert!(wait_for(|| shown_size(&target) == Some(4)));
    }

    #[test]
    fn test_exit_early_discards_results() {
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let target = Arc::new(ImageTarget::new());

        loader.set_pause_work(true);
        loader.set_exit_tasks_early(true);
        assert!(!loader.is_paused());
        assert!(loader.exits_early());

        loader.load_image(Some("8"), &target);
        assert!(wait_for(|| target.current_unit_id().is_none()));
        assert!(producer.calls().is_empty());
        assert!(target.is_loading());

        // The finished unit does not block a fresh request
        loader.set_exit_tasks_early(false);
        loader.load_image(Some("8"), &target);
        assert!(wait_for(|| shown_size(&target) == Some(8)));
    }

    #[test]
    fn test_cancel_work_before_start() {
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let target = Arc::new(ImageTarget::new());

        loader.set_pause_work(true);
        loader.load_image(Some("2"), &target);
        let unit = target.bound_unit().unwrap();

        assert!(loader.detach(&target));
        assert!(!loader.cancel_work(&target));
        assert!(unit.is_cancelled());

        loader.set_pause_work(false);
        thread::sleep(Duration::from_millis(50));
        assert!(producer.calls().is_empty());
        assert!(shown_size(&target).is_none());
    }

    #[test]
    fn test_failed_produce_keeps_placeholder() {
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let placeholder = bitmap(1);
        loader.set_loading_image(Some(placeholder.clone()));
        let target = Arc::new(ImageTarget::new());

        loader.load_image(Some("not-a-size"), &target);
        assert!(wait_for(|| producer.calls().len() == 1));
        assert!(wait_for(|| target.current_unit_id().is_none()));
        assert!(target.bitmap().unwrap().ptr_eq(&placeholder));
    }

    #[test]
    fn test_dropped_target_gets_nothing() {
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let target = Arc::new(ImageTarget::new());

        loader.set_pause_work(true);
        loader.load_image(Some("3"), &target);
        drop(target);
        loader.set_pause_work(false);

        thread::sleep(Duration::from_millis(50));
        assert!(producer.calls().is_empty());
    }

    #[test]
    fn test_add_image_cache_initializes_disk() {
        let dir = tempfile::tempdir().unwrap();
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let registry = CacheRegistry::new();
        let config = CacheConfig::for_namespace("thumbs").with_disk_dir(dir.path().join("thumbs"));

        let completion = loader.add_image_cache(&registry, "thumbs", config);
        assert!(completion.wait_timeout(Duration::from_secs(5)));

        let cache = loader.image_cache().unwrap();
        assert!(Arc::ptr_eq(&cache, &registry.get("thumbs").unwrap()));
        assert_eq!(cache.disk().readiness(), thumbgrid_cache::Readiness::Ready);
        assert!(cache.disk().current_journal().is_some());
    }

    #[test]
    fn test_cache_maintenance() {
        let dir = tempfile::tempdir().unwrap();
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let cache = cache(&dir);
        cache.put("k", &bitmap(4));
        loader.set_image_cache(Some(Arc::clone(&cache)));

        assert!(loader.flush_cache().wait());
        assert!(loader.clear_cache().wait());
        assert!(cache.get("k").is_none());
        assert!(cache.get_from_disk("k").is_none());

        assert!(loader.close_cache().wait());
        assert!(loader.image_cache().is_none());
        assert!(cache.disk().current_journal().is_none());

        loader.set_image_cache(Some(Arc::clone(&cache)));
        assert!(loader.init_disk_cache().wait());
        assert!(cache.disk().current_journal().is_some());
    }

    #[test]
    fn test_shutdown_runs_queued_maintenance() {
        let dir = tempfile::tempdir().unwrap();
        let producer = Arc::new(TestProducer::default());
        let loader = loader(&producer);
        let cache = cache(&dir);
        loader.set_image_cache(Some(Arc::clone(&cache)));

        let completion = loader.close_cache();
        loader.shutdown();
        assert!(completion.wait_timeout(Duration::from_secs(5)));
        assert!(cache.disk().current_journal().is_none());
    }
}
