//! Bounded LRU cache fronting external live-data providers, with
//! stale-while-revalidate reads and in-flight request coalescing
//! (spec §4.3). Recency bookkeeping uses the `lru` crate; coalescing keys
//! `futures::future::Shared` futures in a `DashMap`, the idiomatic
//! single-flight pattern for async Rust — a natural extension of the
//! reference backend's `DashMap`-backed verification cache to the async
//! case.

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::{FutureExt, Shared};
use lru::LruCache;
use tokio::sync::Mutex;

use practice_config::CacheConfig;

use crate::category::Category;
use crate::entry::{Entry, Freshness};
use crate::error::CacheError;
use crate::stats::{CacheStats, StatsCounters};

type BoxedFetch<V> = Pin<Box<dyn Future<Output = Result<V, CacheError>> + Send>>;
type InFlight<V> = Shared<BoxedFetch<V>>;

struct Inner<V: Clone + Send + Sync + 'static> {
    config: CacheConfig,
    entries: Mutex<LruCache<String, Entry<V>>>,
    in_flight: DashMap<String, InFlight<V>>,
    stats: StatsCounters,
}

/// Cheap to clone — an `Arc` handle around the shared cache state, so a
/// background revalidation task can hold its own handle without borrowing.
pub struct ProviderCache<V: Clone + Send + Sync + 'static> {
    inner: Arc<Inner<V>>,
}

impl<V: Clone + Send + Sync + 'static> Clone for ProviderCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> ProviderCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_entries.max(1)).expect("max_entries > 0");
        Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(LruCache::new(cap)),
                in_flight: DashMap::new(),
                stats: StatsCounters::default(),
            }),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.inner.in_flight.len())
    }

    /// Implements the four-branch `getOrFetch` contract from spec §4.3.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        category: Category,
        fetcher: F,
    ) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, CacheError>> + Send + 'static,
    {
        let now = Instant::now();
        let stale_grace = Duration::from_millis(self.inner.config.stale_grace_ms);

        let observed = {
            let mut guard = self.inner.entries.lock().await;
            match guard.get_mut(key) {
                Some(entry) => {
                    let freshness = entry.freshness(now, stale_grace);
                    if freshness == Freshness::Expired {
                        guard.pop(key);
                        self.inner.stats.record_eviction();
                        None
                    } else {
                        entry.access_count += 1;
                        Some((freshness, entry.value.clone()))
                    }
                }
                None => None,
            }
        };

        match observed {
            Some((Freshness::Fresh, value)) => {
                self.inner.stats.record_hit();
                return Ok(value);
            }
            Some((Freshness::Stale, value)) => {
                self.inner.stats.record_stale_hit();
                if self.inner.config.stale_while_revalidate {
                    self.spawn_revalidation(key.to_string(), category, fetcher);
                    return Ok(value);
                }
                return self.fetch_with_fallback(key, category, fetcher, Some(value)).await;
            }
            Some((Freshness::Expired, _)) => unreachable!("expired entries are popped above"),
            None => {}
        }

        if let Some(shared) = self.inner.in_flight.get(key).map(|r| r.clone()) {
            self.inner.stats.record_deduplicated();
            return shared.await;
        }

        self.fetch_with_fallback(key, category, fetcher, None).await
    }

    async fn fetch_with_fallback<F, Fut>(
        &self,
        key: &str,
        category: Category,
        fetcher: F,
        stale_fallback: Option<V>,
    ) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, CacheError>> + Send + 'static,
    {
        self.inner.stats.record_miss();
        let shared = self.register_in_flight(key.to_string(), fetcher);
        let result = shared.await;
        self.inner.in_flight.remove(key);
        match result {
            Ok(value) => {
                self.set(key, value.clone(), category).await;
                Ok(value)
            }
            Err(err) => match stale_fallback {
                Some(value) => Ok(value),
                None => Err(err),
            },
        }
    }

    /// Spawns a background revalidation if one isn't already in flight for
    /// `key`; revalidation errors are swallowed per spec §4.3 — a failed
    /// revalidation just leaves the stale entry in place for the next read.
    fn spawn_revalidation<F, Fut>(&self, key: String, category: Category, fetcher: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, CacheError>> + Send + 'static,
    {
        if self.inner.in_flight.contains_key(&key) {
            return;
        }
        let shared = self.register_in_flight(key.clone(), fetcher);
        let cache = self.clone();
        tokio::spawn(async move {
            let result = shared.await;
            cache.inner.in_flight.remove(&key);
            if let Ok(value) = result {
                cache.set(&key, value, category).await;
            }
        });
    }

    fn register_in_flight<F, Fut>(&self, key: String, fetcher: F) -> InFlight<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, CacheError>> + Send + 'static,
    {
        let boxed: BoxedFetch<V> = Box::pin(fetcher());
        let shared: InFlight<V> = boxed.shared();
        self.inner.in_flight.insert(key, shared.clone());
        shared
    }

    /// Directly stores `value` under `key` with `category`'s TTL, bypassing
    /// `get_or_fetch` — used when the orchestrator already has a fresh value
    /// from some other path (e.g. a batched provider call).
    pub async fn set(&self, key: &str, value: V, category: Category) {
        let ttl = category.ttl(&self.inner.config);
        let mut guard = self.inner.entries.lock().await;
        guard.put(key.to_string(), Entry::new(value, ttl));
    }

    /// Background cleanup pass (spec §4.3): walks from the LRU tail,
    /// evicting entries past `expires_at + stale_grace`.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let stale_grace = Duration::from_millis(self.inner.config.stale_grace_ms);
        let mut guard = self.inner.entries.lock().await;
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.freshness(now, stale_grace) == Freshness::Expired)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            guard.pop(key);
        }
        drop(guard);
        for _ in &expired {
            self.inner.stats.record_eviction();
        }
        expired.len()
    }

    /// Spawns the periodic cleanup task (spec §4.3 "Cleanup"), owned by the
    /// caller (the orchestrator's `spawn_background_tasks`), not started
    /// eagerly on construction.
    pub fn spawn_cleanup_task(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = cache.cleanup_expired().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "provider cache cleanup evicted expired entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_config() -> CacheConfig {
        CacheConfig {
            max_entries: 10,
            ttl_time_ms: 20,
            ttl_market_ms: 20,
            ttl_crypto_ms: 20,
            ttl_weather_ms: 20,
            ttl_fx_ms: 20,
            stale_grace_ms: 1000,
            stale_while_revalidate: true,
            cleanup_interval_ms: 1000,
        }
    }

    #[tokio::test]
    async fn fresh_hit_does_not_call_fetcher() {
        let cache: ProviderCache<u32> = ProviderCache::new(test_config());
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let first = cache
            .get_or_fetch("k", Category::Time, move || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap();
        assert_eq!(first, 1);

        let c2 = calls.clone();
        let second = cache
            .get_or_fetch("k", Category::Time, move || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await
            .unwrap();
        assert_eq!(second, 1, "fresh hit must return cached value, not refetch");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_into_one_fetch() {
        let cache: ProviderCache<u32> = ProviderCache::new(test_config());
        let calls = Arc::new(AtomicU32::new(0));

        let c1 = calls.clone();
        let cache1 = cache.clone();
        let fut1 = tokio::spawn(async move {
            cache1
                .get_or_fetch("k", Category::Time, move || async move {
                    c1.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(42)
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(1)).await;

        let c2 = calls.clone();
        let cache2 = cache.clone();
        let fut2 = tokio::spawn(async move {
            cache2
                .get_or_fetch("k", Category::Time, move || async move {
                    c2.fetch_add(1, Ordering::SeqCst);
                    Ok(99)
                })
                .await
        });

        let (r1, r2) = tokio::join!(fut1, fut2);
        assert_eq!(r1.unwrap().unwrap(), 42);
        assert_eq!(r2.unwrap().unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn miss_without_stale_propagates_fetch_error() {
        let cache: ProviderCache<u32> = ProviderCache::new(test_config());
        let err = cache
            .get_or_fetch("k", Category::Time, || async {
                Err(CacheError::fetch_failed("k", "boom"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::FetchFailed { .. }));
    }
}
