//! TTL-keyed product cache with per-key computation coalescing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

/// Cache key for one product payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub cycle: DateTime<Utc>,
    pub fxx: u8,
}

struct Entry<T> {
    stored_at: Instant,
    payload: T,
}

/// A TTL cache over expensive product computations.
///
/// Entries never evict on size; staleness is decided per read against the
/// caller's TTL. Concurrent callers of the same key are serialized on a
/// per-key gate so the computation runs at most once; the losers read the
/// fresh entry instead of recomputing.
pub struct ResultCache<T> {
    name: &'static str,
    entries: RwLock<HashMap<CacheKey, Entry<T>>>,
    gates: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached payload for `key` if fresh, otherwise run `compute`
    /// and store its result. A failed computation caches nothing.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let gate = {
            let mut gates = self.gates.lock().await;
            gates
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _held = gate.lock().await;

        if let Some(hit) = self.lookup(key, ttl).await {
            debug!(cache = self.name, fxx = key.fxx, "cache hit");
            return Ok(hit);
        }

        let payload = compute().await?;
        self.entries.write().await.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                payload: payload.clone(),
            },
        );
        debug!(cache = self.name, fxx = key.fxx, "cache fill");
        Ok(payload)
    }

    async fn lookup(&self, key: CacheKey, ttl: Duration) -> Option<T> {
        self.entries
            .read()
            .await
            .get(&key)
            .filter(|e| e.stored_at.elapsed() <= ttl)
            .map(|e| e.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use chrono::TimeZone;
    use tokio::time::advance;

    fn key(fxx: u8) -> CacheKey {
        CacheKey {
            cycle: Utc.with_ymd_and_hms(2026, 2, 22, 2, 0, 0).unwrap(),
            fxx,
        }
    }

    const TTL: Duration = Duration::from_secs(600);

    async fn fill(cache: &ResultCache<u32>, k: CacheKey, value: u32) -> u32 {
        cache
            .get_or_compute(k, TTL, || async move { Ok::<_, Infallible>(value) })
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_is_served_without_recompute() {
        let cache = ResultCache::new("test");
        assert_eq!(fill(&cache, key(1), 1).await, 1);
        advance(Duration::from_secs(599)).await;
        // A different compute result proves the entry was served from cache.
        assert_eq!(fill(&cache, key(1), 2).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_triggers_recompute() {
        let cache = ResultCache::new("test");
        assert_eq!(fill(&cache, key(1), 1).await, 1);
        advance(Duration::from_secs(601)).await;
        assert_eq!(fill(&cache, key(1), 2).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let cache = ResultCache::new("test");
        assert_eq!(fill(&cache, key(1), 10).await, 10);
        assert_eq!(fill(&cache, key(2), 20).await, 20);
        assert_eq!(fill(&cache, key(1), 99).await, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_coalesce_to_one_compute() {
        let cache = Arc::new(ResultCache::<u32>::new("test"));
        let computes = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            let computes = computes.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key(1), TTL, || async {
                        computes.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, Infallible>(7u32)
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 7);
        }
        assert_eq!(computes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_compute_is_not_cached() {
        let cache = ResultCache::<u32>::new("test");
        let err: Result<u32, &str> = cache
            .get_or_compute(key(1), TTL, || async { Err("upstream down") })
            .await;
        assert!(err.is_err());
        // Next caller recomputes instead of seeing a poisoned entry.
        assert_eq!(fill(&cache, key(1), 5).await, 5);
    }
}
