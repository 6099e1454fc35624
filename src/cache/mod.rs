//! Compiled route caching.
//!
//! # Responsibilities
//! - Hold at most one live compiled route per canonical [`CacheKey`]
//! - Bound the number of live routes, evicting least-recently-used entries
//! - Coalesce concurrent misses for one key into a single construction
//!
//! # Design Decisions
//! - Access order, not insertion order, drives recency
//! - A failed construction is never stored; the next request retries fresh
//! - Concurrent missers await the in-flight construction and share its
//!   outcome, success or failure (single-flight)
//! - The internal index is the only synchronized state; construction runs
//!   outside the lock

pub mod key;

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::observability::metrics;

pub use key::CacheKey;

type PendingEntry<T, E> = Shared<BoxFuture<'static, Result<Arc<T>, Arc<E>>>>;

/// Bounded, keyed store of compiled route entries.
///
/// `T` is the entry type; `E` is the error produced by entry construction.
/// Entries are immutable once stored: a changed parameter set yields a new
/// key and a new entry, never an update in place.
pub struct RouteCache<T, E> {
    inner: Mutex<CacheInner<T, E>>,
}

struct CacheInner<T, E> {
    entries: LruCache<CacheKey, Arc<T>>,
    pending: HashMap<CacheKey, PendingEntry<T, E>>,
}

impl<T, E> RouteCache<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                pending: HashMap::new(),
            }),
        }
    }

    /// Return the entry for `key`, constructing it with `factory` on miss.
    ///
    /// A hit marks the entry most-recently-used and never invokes the
    /// factory. On a miss the factory runs exactly once per key, no matter
    /// how many callers are waiting; every waiter receives the same entry
    /// or the same error. Readers never observe an entry mid-construction.
    pub async fn get_or_create<F, Fut>(&self, key: CacheKey, factory: F) -> Result<Arc<T>, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let build = {
            let mut inner = self.inner.lock().await;
            if let Some(entry) = inner.entries.get(&key) {
                metrics::record_route_cache_hit();
                return Ok(Arc::clone(entry));
            }
            metrics::record_route_cache_miss();
            match inner.pending.get(&key) {
                Some(build) => build.clone(),
                None => {
                    let build = factory()
                        .map(|result| result.map(Arc::new).map_err(Arc::new))
                        .boxed()
                        .shared();
                    inner.pending.insert(key.clone(), build.clone());
                    build
                }
            }
        };

        let result = build.await;

        let mut inner = self.inner.lock().await;
        // The first waiter to get here publishes the outcome; failures are
        // dropped so the next request retries with a fresh construction.
        if inner.pending.remove(&key).is_some() {
            if let Ok(entry) = &result {
                if let Some((evicted, _)) = inner.entries.push(key.clone(), Arc::clone(entry)) {
                    // push also returns the old value when the key itself was
                    // already present; only count real evictions.
                    if evicted != key {
                        metrics::record_route_cache_eviction();
                        tracing::debug!(key = %evicted, "evicted least-recently-used route");
                    }
                }
            }
        }
        result
    }

    /// Number of stored entries (excludes in-flight constructions).
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether `key` is stored, without touching recency.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().await.entries.peek(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn key(name: &str) -> CacheKey {
        CacheKey::for_request(name, &BTreeMap::new())
    }

    async fn insert(cache: &RouteCache<String, String>, name: &'static str) {
        cache
            .get_or_create(key(name), || async move { Ok(name.to_string()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_hit_returns_same_entry_without_invoking_factory() {
        let cache = RouteCache::<String, String>::new(4);
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_create(key("/world,"), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("entry".to_string()) }
            })
            .await
            .unwrap();
        let second = cache
            .get_or_create(key("/world,"), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("other".to_string()) }
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_construction() {
        let cache = Arc::new(RouteCache::<String, String>::new(4));
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_create(key("/world,z=3"), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok("entry".to_string())
                    })
                    .await
            }));
        }

        // Let every task reach the shared construction, then release it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.notify_waiters();

        let mut entries = Vec::new();
        for task in tasks {
            entries.push(task.await.unwrap().unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(entries.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_failed_construction_is_not_cached() {
        let cache = RouteCache::<String, String>::new(4);
        let calls = AtomicUsize::new(0);

        let err = cache
            .get_or_create(key("/broken,"), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("backend down".to_string()) }
            })
            .await
            .unwrap_err();
        assert_eq!(*err, "backend down");
        assert!(cache.is_empty().await);

        // The next request retries with a fresh construction.
        let entry = cache
            .get_or_create(key("/broken,"), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("recovered".to_string()) }
            })
            .await
            .unwrap();
        assert_eq!(*entry, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_missers_share_the_failure() {
        let cache = Arc::new(RouteCache::<String, String>::new(4));
        let gate = Arc::new(Notify::new());

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_create(key("/broken,"), move || async move {
                        gate.notified().await;
                        Err::<String, _>("boom".to_string())
                    })
                    .await
            }));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.notify_waiters();

        let mut errors = Vec::new();
        for task in tasks {
            errors.push(task.await.unwrap().unwrap_err());
        }
        assert!(errors.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_eviction_drops_least_recently_used() {
        let cache = RouteCache::<String, String>::new(2);
        insert(&cache, "/a,").await;
        insert(&cache, "/b,").await;

        // Touch /a so /b becomes least-recently-used.
        insert(&cache, "/a,").await;
        insert(&cache, "/c,").await;

        assert!(cache.contains(&key("/a,")).await);
        assert!(!cache.contains(&key("/b,")).await);
        assert!(cache.contains(&key("/c,")).await);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_evicted_key_is_an_ordinary_miss() {
        let cache = RouteCache::<String, String>::new(1);
        let calls = AtomicUsize::new(0);
        for name in ["/a,", "/b,", "/a,"] {
            cache
                .get_or_create(key(name), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(name.to_string()) }
                })
                .await
                .unwrap();
        }
        // /a was evicted by /b, so its second access rebuilds it.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped_to_one() {
        let cache = RouteCache::<String, String>::new(0);
        insert(&cache, "/a,").await;
        assert_eq!(cache.len().await, 1);
    }
}
