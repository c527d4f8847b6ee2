//! Request-keyed query cache.
//!
//! Components read through [`QueryCache::fetch_or_cached`] so repeated renders
//! do not refetch, and mutations call [`QueryCache::invalidate`] so the next
//! read goes back to the server. Keys are segment lists; invalidating a key
//! also invalidates every key it prefixes (`["item"]` covers `["item", "42"]`).
//!
//! Backed by `moka` with a capacity bound and time-to-live. A load that was
//! already running when an invalidation happened returns its value but does
//! not cache it.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache;
use tracing::{debug, warn};

use crate::config::QueryCacheConfig;

/// Well-known key roots.
pub mod keys {
    pub const CART: &str = "cart";
    pub const PROFILE: &str = "profile";
    pub const ORDERS: &str = "orders";
    pub const EXPLORE: &str = "explore";
    pub const ITEMS: &str = "items";
    pub const ITEM: &str = "item";
    pub const REVIEWS: &str = "reviews";
    pub const SEARCH: &str = "search";

    /// Keys that belong to the signed-in identity and must not survive logout.
    pub const IDENTITY_SCOPED: [&str; 5] = [PROFILE, CART, ORDERS, EXPLORE, ITEMS];
}

/// Cache key made of path-like segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Build a key from segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Single-segment key.
    pub fn root(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Extend the key with another segment.
    #[must_use]
    pub fn with(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// The segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `self` is a prefix of (or equal to) `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl From<&str> for QueryKey {
    fn from(segment: &str) -> Self {
        Self::root(segment)
    }
}

type CachedValue = Arc<dyn Any + Send + Sync>;

/// Shared, type-erased query cache.
///
/// Cheaply cloneable; clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
    cache: Cache<QueryKey, CachedValue>,
    /// Bumped before every invalidation.
    generation: Arc<AtomicU64>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(&QueryCacheConfig::default())
    }
}

impl QueryCache {
    /// Create a cache sized by configuration.
    #[must_use]
    pub fn new(config: &QueryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.time_to_live)
            .support_invalidation_closures()
            .build();

        Self {
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the cached value for `key`, or run `loader` and cache its result.
    ///
    /// Loader errors are returned as-is and nothing is cached. A cached value
    /// of a different type than `T` counts as a miss and is replaced. When any
    /// invalidation lands while `loader` runs, its value is returned uncached.
    ///
    /// # Errors
    ///
    /// Returns whatever error `loader` produced.
    pub async fn fetch_or_cached<T, E, F, Fut>(&self, key: &QueryKey, loader: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.cache.get(key).await {
            if let Some(value) = cached.downcast_ref::<T>() {
                debug!(key = %key, "Query cache hit");
                return Ok(value.clone());
            }
            warn!(key = %key, "Query cache entry has unexpected type, reloading");
        }

        debug!(key = %key, "Query cache miss");
        let generation = self.generation.load(Ordering::SeqCst);
        let value = loader().await?;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(key = %key, "Query invalidated during load, not caching");
            return Ok(value);
        }
        self.cache
            .insert(key.clone(), Arc::new(value.clone()) as CachedValue)
            .await;
        // An invalidation may have cleared entries between the check and the
        // insert.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.cache.invalidate(key).await;
        }

        Ok(value)
    }

    /// Mark `key` and every key it prefixes as stale.
    pub async fn invalidate(&self, key: &QueryKey) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(key).await;

        let prefix = key.clone();
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |candidate, _| prefix.is_prefix_of(candidate))
        {
            // Only possible when closures are unsupported; fall back to a full
            // clear so nothing stale is served.
            warn!(key = %key, error = %e, "Prefix invalidation failed, clearing cache");
            self.invalidate_all().await;
            return;
        }
        debug!(key = %key, "Query invalidated");
    }

    /// Invalidate several keys.
    pub async fn invalidate_many<'a>(&self, keys: impl IntoIterator<Item = &'a QueryKey>) {
        for key in keys {
            self.invalidate(key).await;
        }
    }

    /// Drop every cached query.
    pub async fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Whether a fresh value is cached for exactly `key`.
    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.cache.get(key).await.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::oneshot;

    use super::*;

    async fn load_counted(
        cache: &QueryCache,
        key: &QueryKey,
        calls: &AtomicUsize,
        value: u32,
    ) -> Result<u32, String> {
        cache
            .fetch_or_cached(key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(value)
            })
            .await
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let cache = QueryCache::default();
        let key = QueryKey::root(keys::ITEMS);
        let calls = AtomicUsize::new(0);

        assert_eq!(load_counted(&cache, &key, &calls, 1).await, Ok(1));
        assert_eq!(load_counted(&cache, &key, &calls, 2).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let cache = QueryCache::default();
        let key = QueryKey::root(keys::CART);
        let calls = AtomicUsize::new(0);

        load_counted(&cache, &key, &calls, 1).await.ok();
        cache.invalidate(&key).await;
        assert_eq!(load_counted(&cache, &key, &calls, 2).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_overlapping_invalidate_is_not_cached() {
        let cache = QueryCache::default();
        let key = QueryKey::root(keys::ORDERS);
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let stale = tokio::spawn({
            let cache = cache.clone();
            let key = key.clone();
            async move {
                cache
                    .fetch_or_cached(&key, || async move {
                        started_tx.send(()).ok();
                        release_rx.await.ok();
                        Ok::<_, String>(1_u32)
                    })
                    .await
            }
        });
        started_rx.await.unwrap();
        cache.invalidate(&key).await;
        release_tx.send(()).unwrap();

        assert_eq!(stale.await.unwrap(), Ok(1));
        assert!(!cache.contains(&key).await);

        let calls = AtomicUsize::new(0);
        assert_eq!(load_counted(&cache, &key, &calls, 2).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prefix_invalidation() {
        let cache = QueryCache::default();
        let item_a = QueryKey::root(keys::ITEM).with("a");
        let item_b = QueryKey::root(keys::ITEM).with("b");
        let orders = QueryKey::root(keys::ORDERS);
        let calls = AtomicUsize::new(0);

        for key in [&item_a, &item_b, &orders] {
            load_counted(&cache, key, &calls, 1).await.ok();
        }

        cache.invalidate(&QueryKey::root(keys::ITEM)).await;

        assert!(!cache.contains(&item_a).await);
        assert!(!cache.contains(&item_b).await);
        assert!(cache.contains(&orders).await);
    }

    #[tokio::test]
    async fn test_loader_errors_are_not_cached() {
        let cache = QueryCache::default();
        let key = QueryKey::root(keys::PROFILE);

        let failed: Result<u32, String> = cache
            .fetch_or_cached(&key, || async { Err("offline".to_string()) })
            .await;
        assert_eq!(failed, Err("offline".to_string()));
        assert!(!cache.contains(&key).await);

        let calls = AtomicUsize::new(0);
        assert_eq!(load_counted(&cache, &key, &calls, 7).await, Ok(7));
    }

    #[tokio::test]
    async fn test_type_mismatch_reloads() {
        let cache = QueryCache::default();
        let key = QueryKey::root(keys::SEARCH).with("yam");

        let _: Result<String, ()> = cache
            .fetch_or_cached(&key, || async { Ok("cached".to_string()) })
            .await;
        let calls = AtomicUsize::new(0);
        assert_eq!(load_counted(&cache, &key, &calls, 3).await, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_key_prefix_and_display() {
        let key = QueryKey::new(["orders", "customer", "c1"]);
        assert!(QueryKey::root("orders").is_prefix_of(&key));
        assert!(!QueryKey::root("order").is_prefix_of(&key));
        assert_eq!(key.to_string(), "orders/customer/c1");
    }
}
