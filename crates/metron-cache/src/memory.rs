use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metron_models::Operation;
use moka::future::Cache;
use moka::Expiry;
use tracing::debug;

use crate::fingerprint::Fingerprint;

/// Cache address. Entries never cross backends or operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub backend: Arc<str>,
    pub operation: Operation,
    pub fingerprint: Fingerprint,
}

impl CacheKey {
    pub fn new(backend: &str, operation: Operation, fingerprint: Fingerprint) -> Self {
        Self {
            backend: Arc::from(backend),
            operation,
            fingerprint,
        }
    }
}

/// A memoized backend reply.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub computed_at: DateTime<Utc>,
    pub ttl: Duration,
}

/// Value returned by [`ResultCache::get_or_compute`].
#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: V,
    pub computed_at: DateTime<Utc>,
    /// False only for the caller whose compute future produced the value.
    /// Callers that waited on someone else's in-flight compute count as hits.
    pub hit: bool,
}

/// Expire each entry after its own TTL, measured from insertion.
struct EntryTtl;

impl<V> Expiry<CacheKey, CacheEntry<V>> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory, single-flight, TTL-bounded memoization backed by moka.
///
/// Concurrent misses on one key run a single compute future and every waiter
/// receives its result or its error. Failures are never stored. Expiry is
/// checked on access; there is no capacity bound.
pub struct ResultCache<V> {
    inner: Cache<CacheKey, CacheEntry<V>>,
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().expire_after(EntryTtl).build(),
        }
    }

    /// Return the live entry for `key`, or run `compute` once and store its value for `ttl`.
    pub async fn get_or_compute<F, E>(
        &self,
        key: CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<Cached<V>, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let backend = Arc::clone(&key.backend);
        let operation = key.operation;
        let fingerprint = key.fingerprint;

        let entry = self
            .inner
            .entry(key)
            .or_try_insert_with(async move {
                let value = compute.await?;
                Ok(CacheEntry {
                    value,
                    computed_at: Utc::now(),
                    ttl,
                })
            })
            .await?;

        let hit = !entry.is_fresh();
        debug!(
            backend = %backend,
            operation = %operation,
            fingerprint = ?fingerprint,
            hit,
            "Result cache lookup"
        );

        let entry = entry.into_value();
        Ok(Cached {
            value: entry.value,
            computed_at: entry.computed_at,
            hit,
        })
    }

    /// Look at a live entry without computing anything.
    pub async fn peek(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.inner.get(key).await
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        self.inner.invalidate(key).await;
    }

    /// Drop every entry.
    pub fn flush(&self) {
        self.inner.invalidate_all();
    }

    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

impl<V> Default for ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
