//! Host lifecycle and scroll signals

use crate::loader::ImageLoader;
use crate::maintenance::Completion;

/// Scroll state reported by the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
    #[default]
    Idle,
    TouchScroll,
    Fling,
}

impl ImageLoader {
    /// Pause work while flinging, resume otherwise.
    pub fn on_scroll_state_changed(&self, state: ScrollState) {
        self.set_pause_work(state == ScrollState::Fling);
    }

    /// The host came back to the foreground
    pub fn on_resume(&self) {
        self.set_exit_tasks_early(false);
    }

    /// The host went to the background: abandon running work and flush the
    /// disk tiers.
    pub fn on_pause(&self) -> Completion {
        self.set_exit_tasks_early(true);
        self.flush_cache()
    }

    /// The host is going away: close the disk tiers.
    pub fn on_destroy(&self) -> Completion {
        self.close_cache()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoaderConfig;
    use std::sync::Arc;
    use thumbgrid_cache::{CacheConfig, ImageCache};
    use thumbgrid_decode::Bitmap;
    use thumbgrid_fetch::BitmapProducer;

    struct NoProducer;

    impl BitmapProducer for NoProducer {
        fn produce(&self, _key: &str) -> Option<Bitmap> {
            None
        }
    }

    fn loader() -> ImageLoader {
        ImageLoader::new(Arc::new(NoProducer), LoaderConfig::default()).unwrap()
    }

    #[test]
    fn test_fling_pauses_work() {
        let loader = loader();
        loader.on_scroll_state_changed(ScrollState::Fling);
        assert!(loader.is_paused());

        loader.on_scroll_state_changed(ScrollState::TouchScroll);
        assert!(!loader.is_paused());

        loader.on_scroll_state_changed(ScrollState::Fling);
        loader.on_scroll_state_changed(ScrollState::Idle);
        assert!(!loader.is_paused());
    }

    #[test]
    fn test_pause_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader();
        let cache = Arc::new(ImageCache::new(
            CacheConfig::default()
                .with_disk_dir(dir.path().join("thumbs"))
                .with_init_disk_cache_on_create(true),
        ));
        loader.set_image_cache(Some(Arc::clone(&cache)));

        loader.on_scroll_state_changed(ScrollState::Fling);
        assert!(loader.on_pause().wait());
        assert!(loader.exits_early());
        assert!(!loader.is_paused());
        assert!(cache.disk().current_journal().is_some());

        loader.on_resume();
        assert!(!loader.exits_early());
    }

    #[test]
    fn test_destroy_closes_disk() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader();
        let cache = Arc::new(ImageCache::new(
            CacheConfig::default()
                .with_disk_dir(dir.path().join("thumbs"))
                .with_init_disk_cache_on_create(true),
        ));
        loader.set_image_cache(Some(Arc::clone(&cache)));

        assert!(loader.on_destroy().wait());
        assert!(cache.disk().current_journal().is_none());
        assert!(loader.image_cache().is_none());
    }
}
