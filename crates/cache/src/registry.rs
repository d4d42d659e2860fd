//! Namespace-keyed cache registry
//!
//! Lets a host keep one [`ImageCache`] per namespace alive across the
//! recreation of the views that use it. The registry is an ordinary value
//! owned by the host and passed to whoever needs it.

use crate::config::CacheConfig;
use crate::image_cache::ImageCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct CacheRegistry {
    caches: Mutex<HashMap<String, Arc<ImageCache>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cache registered under `namespace`, creating it from
    /// `config` if there is none. `config` is ignored for existing caches.
    pub fn find_or_create(&self, namespace: &str, config: CacheConfig) -> Arc<ImageCache> {
        let mut caches = self.caches.lock();
        if let Some(cache) = caches.get(namespace) {
            tracing::debug!(namespace, "reusing retained image cache");
            return Arc::clone(cache);
        }
        let cache = Arc::new(ImageCache::new(config));
        caches.insert(namespace.to_string(), Arc::clone(&cache));
        cache
    }

    pub fn get(&self, namespace: &str) -> Option<Arc<ImageCache>> {
        self.caches.lock().get(namespace).cloned()
    }

    /// Drop the cache for `namespace`, closing its disk tier.
    ///
    /// Returns false if no cache was registered.
    pub fn invalidate(&self, namespace: &str) -> bool {
        let removed = self.caches.lock().remove(namespace);
        match removed {
            Some(cache) => {
                cache.close();
                true
            }
            None => false,
        }
    }

    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.caches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
