use crate::backend::Backend;
use log::{debug, warn};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// Bounded cache of thumbnail bytes keyed by item id, filled lazily from the
/// backend.
#[derive(Clone)]
pub struct ThumbnailCache {
    backend: Arc<dyn Backend>,
    inner: Arc<Mutex<LruCache<String, Arc<[u8]>>>>,
    retries: u32,
    retry_delay: Duration,
}

impl ThumbnailCache {
    pub fn new(
        backend: Arc<dyn Backend>,
        capacity: usize,
        retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            backend,
            inner: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            ))),
            retries,
            retry_delay,
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<[u8]>> {
        self.inner.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().contains(id)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<[u8]>> {
        self.inner.lock().pop(id)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Cached bytes, or a fetch that retries while the backend reports the
    /// thumbnail as not generated yet. Transport errors end the attempt.
    pub async fn load(&self, id: &str) -> Option<Arc<[u8]>> {
        if let Some(hit) = self.get(id) {
            return Some(hit);
        }

        for attempt in 0..=self.retries {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
            }
            match self.backend.get_thumbnail(id).await {
                Ok(Some(bytes)) if !bytes.is_empty() => {
                    let bytes: Arc<[u8]> = bytes.into();
                    self.inner.lock().put(id.to_string(), Arc::clone(&bytes));
                    return Some(bytes);
                }
                Ok(_) => debug!("thumbnail {} not ready (attempt {})", id, attempt + 1),
                Err(e) => {
                    warn!("Failed to load thumbnail {}: {}", id, e);
                    return None;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn cache(capacity: usize) -> (Arc<MemoryBackend>, ThumbnailCache) {
        let backend = Arc::new(MemoryBackend::default());
        let cache = ThumbnailCache::new(backend.clone(), capacity, 3, Duration::from_millis(500));
        (backend, cache)
    }

    #[tokio::test]
    async fn hit_skips_backend() {
        let (backend, cache) = cache(4);
        backend.put_thumbnail("a", vec![1, 2, 3]);

        assert_eq!(cache.load("a").await.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(cache.load("a").await.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_materialized() {
        let (backend, cache) = cache(4);
        let loader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.load("img").await })
        };

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(backend.calls().len(), 2);
        backend.put_thumbnail("img", vec![9]);

        let bytes = loader.await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&[9u8][..]));
        assert_eq!(backend.calls().len(), 3);
        assert!(cache.contains("img"));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_retries() {
        let (backend, cache) = cache(4);
        backend.put_thumbnail("empty", Vec::new());

        assert!(cache.load("empty").await.is_none());
        assert_eq!(backend.calls().len(), 4);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn transport_error_is_not_retried() {
        let (backend, cache) = cache(4);
        backend.fail_on("get_thumbnail");

        assert!(cache.load("a").await.is_none());
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn least_recent_entry_is_evicted() {
        let (backend, cache) = cache(2);
        for id in ["a", "b", "c"] {
            backend.put_thumbnail(id, vec![0]);
        }
        cache.load("a").await;
        cache.load("b").await;
        cache.get("a");
        cache.load("c").await;

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.remove("a").is_some());
    }
}
