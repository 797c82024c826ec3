//! Generic TTL Cache
//!
//! String-keyed get-or-compute-and-store cache using Moka, with a TTL chosen
//! per entry rather than per cache. Producer failures are never stored, so a
//! transient error cannot poison an entry; an empty value produced
//! successfully is cached like any other.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use moka::sync::Cache;
use moka::Expiry;
use tracing::{debug, trace};

/// A cached value together with the TTL it was stored under.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    ttl: Duration,
}

/// Expiry policy that reads each entry's own TTL.
///
/// Overwrites (`put`) restart the clock with the new entry's TTL instead of
/// keeping the remaining duration.
struct PerEntryTtl;

impl<V> Expiry<String, CacheEntry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Cache with per-entry TTL and explicit invalidation
///
/// Owns no domain semantics. Each component holds its own instance and
/// namespaces its keys (`settings:*`, `accounts:*`, `quota:<id>`), so no two
/// components ever write the same key.
pub struct TtlCache<V> {
    inner: Cache<String, CacheEntry<V>>,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a named cache. The name shows up in Moka diagnostics only.
    pub fn new(name: &str) -> Self {
        let inner = Cache::builder()
            .name(name)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            inner,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a live entry from the cache
    ///
    /// Returns Some(value) if a non-expired entry exists, None otherwise.
    /// Updates hit/miss counters.
    pub fn get(&self, key: &str) -> Option<V> {
        match self.inner.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = key, "Cache HIT");
                Some(entry.value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = key, "Cache MISS");
                None
            }
        }
    }

    /// Return the live entry for `key`, or run `producer` and store its result
    ///
    /// A producer error is returned to the caller and nothing is stored, so
    /// the next call runs the producer again. A `Duration::ZERO` TTL yields an
    /// entry that is already stale on the next lookup.
    pub fn get_or_compute<F>(&self, key: &str, ttl: Duration, producer: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = producer()?;
        self.put(key, value.clone(), ttl);
        Ok(value)
    }

    /// Async variant of [`TtlCache::get_or_compute`] for producers that await
    /// remote calls. Same contract: failures are never stored.
    pub async fn get_or_compute_async<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = producer().await?;
        self.put(key, value.clone(), ttl);
        Ok(value)
    }

    /// Store `value` under `key` with a fresh TTL, replacing any live entry.
    pub fn put(&self, key: &str, value: V, ttl: Duration) {
        self.inner
            .insert(key.to_string(), CacheEntry { value, ttl });
        debug!(key = key, ttl_secs = ttl.as_secs(), "Cached entry");
    }

    /// Remove the entry unconditionally. Idempotent.
    pub fn forget(&self, key: &str) {
        self.inner.invalidate(key);
        debug!(key = key, "Invalidated cache entry");
    }

    /// Get cache statistics
    ///
    /// Returns (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
