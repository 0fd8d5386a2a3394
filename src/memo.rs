// Memoizing fetcher.
// Counts every request, serves live cached payloads, and fetches on a miss.

use std::time::Duration;

use crate::cache::{CacheBackend, CacheKey};
use crate::config::DEFAULT_TTL_SECS;
use crate::error::{MemoError, Result};
use crate::fetch::Fetch;

/// Lifetime of cached results unless overridden with [`MemoizingFetcher::with_ttl`].
pub const DEFAULT_TTL: Duration = Duration::from_secs(DEFAULT_TTL_SECS);

/// Smallest TTL both backends can honour; Redis expiry has millisecond resolution.
pub const MIN_TTL: Duration = Duration::from_millis(1);

/// Wraps a [`Fetch`] implementation with a TTL cache and per-URL counters.
///
/// Two concurrent misses on the same URL may both reach the fetcher; the
/// later store wins.
#[derive(Debug)]
pub struct MemoizingFetcher<F> {
    backend: CacheBackend,
    fetcher: F,
    ttl: Duration,
}

impl<F: Fetch> MemoizingFetcher<F> {
    pub fn new(backend: CacheBackend, fetcher: F) -> Self {
        Self {
            backend,
            fetcher,
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the TTL. Anything below [`MIN_TTL`] is rejected.
    pub fn with_ttl(mut self, ttl: Duration) -> Result<Self> {
        if ttl < MIN_TTL {
            return Err(MemoError::Config(format!(
                "cache TTL must be at least {:?}, got {:?}",
                MIN_TTL, ttl
            )));
        }
        self.ttl = ttl;
        Ok(self)
    }

    /// Payload for `url`, served from cache when a live entry exists.
    ///
    /// The request is counted before the cache is consulted, so failed
    /// fetches are counted too. Fetch errors are returned unchanged and
    /// nothing is cached for them.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let key = CacheKey::new(url);

        let count = self.backend.increment_counter(&key).await?;

        if let Some(cached) = self.backend.get(&key).await? {
            tracing::debug!(url = %key, count, "cache hit");
            return Ok(cached);
        }

        tracing::debug!(url = %key, count, "cache miss");
        let body = self.fetcher.fetch(key.as_str()).await?;

        self.backend.set_with_expiry(&key, &body, self.ttl).await?;
        tracing::debug!(url = %key, ttl_secs = self.ttl.as_secs_f64(), "cache set");

        Ok(body)
    }

    /// How many times `url` has been requested through this cache.
    pub async fn request_count(&self, url: &str) -> Result<u64> {
        self.backend.request_count(&CacheKey::new(url)).await
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::shared::tests::{test_store, unique_key};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Counts calls per URL and answers "<url>#<n>" for the n-th call.
    /// URLs containing "bad" fail.
    #[derive(Clone, Default)]
    struct StubFetcher {
        calls: Arc<Mutex<HashMap<String, usize>>>,
        delay: Option<Duration>,
    }

    impl StubFetcher {
        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        fn calls(&self, url: &str) -> usize {
            self.calls.lock().get(url).copied().unwrap_or(0)
        }
    }

    impl Fetch for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            let n = {
                let mut calls = self.calls.lock();
                let n = calls.entry(url.to_string()).or_insert(0);
                *n += 1;
                *n
            };
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if url.contains("bad") {
                return Err(MemoError::Fetch(format!("connection reset: {}", url)));
            }
            Ok(format!("{}#{}", url, n))
        }
    }

    /// Every scenario runs against both backends.
    async fn backends() -> Vec<CacheBackend> {
        vec![
            CacheBackend::new_local(),
            CacheBackend::Shared(test_store().await),
        ]
    }

    fn url(name: &str) -> String {
        unique_key(name).as_str().to_string()
    }

    #[tokio::test]
    async fn test_second_fetch_within_ttl_is_served_from_cache() {
        for backend in backends().await {
            let stub = StubFetcher::default();
            let memo = MemoizingFetcher::new(backend.clone(), stub.clone());
            let u1 = url("u1");

            let first = memo.fetch(&u1).await.unwrap();
            let second = memo.fetch(&u1).await.unwrap();

            assert_eq!(first, second, "backend {}", backend.kind());
            assert_eq!(stub.calls(&u1), 1, "backend {}", backend.kind());
            assert_eq!(memo.request_count(&u1).await.unwrap(), 2);
        }
    }

    #[tokio::test]
    async fn test_counter_counts_hits_and_misses() {
        for backend in backends().await {
            let stub = StubFetcher::default();
            let memo = MemoizingFetcher::new(backend, stub.clone());
            let page = url("counted");

            for _ in 0..5 {
                memo.fetch(&page).await.unwrap();
            }

            assert_eq!(memo.request_count(&page).await.unwrap(), 5);
            assert_eq!(stub.calls(&page), 1);
        }
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        for backend in backends().await {
            let stub = StubFetcher::default();
            let memo = MemoizingFetcher::new(backend.clone(), stub.clone())
                .with_ttl(Duration::from_millis(100))
                .unwrap();
            let page = url("expiring");

            let first = memo.fetch(&page).await.unwrap();
            tokio::time::sleep(Duration::from_millis(250)).await;
            let second = memo.fetch(&page).await.unwrap();

            assert_ne!(first, second, "backend {}", backend.kind());
            assert_eq!(stub.calls(&page), 2);
            assert_eq!(memo.request_count(&page).await.unwrap(), 2);
        }
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_and_is_not_cached() {
        for backend in backends().await {
            let stub = StubFetcher::default();
            let memo = MemoizingFetcher::new(backend.clone(), stub.clone());
            let bad = url("bad-url");

            let result = memo.fetch(&bad).await;

            assert!(matches!(result, Err(MemoError::Fetch(_))));
            assert_eq!(memo.request_count(&bad).await.unwrap(), 1);
            assert_eq!(backend.get(&CacheKey::new(bad.as_str())).await.unwrap(), None);

            // No negative caching: the next call tries again.
            assert!(memo.fetch(&bad).await.is_err());
            assert_eq!(stub.calls(&bad), 2);
            assert_eq!(memo.request_count(&bad).await.unwrap(), 2);
        }
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        for backend in backends().await {
            let stub = StubFetcher::default();
            let memo = MemoizingFetcher::new(backend, stub.clone());
            let k1 = url("k1");
            let k2 = url("k2");

            let a = memo.fetch(&k1).await.unwrap();
            let b = memo.fetch(&k2).await.unwrap();
            memo.fetch(&k1).await.unwrap();

            assert_ne!(a, b);
            assert_eq!(stub.calls(&k1), 1);
            assert_eq!(stub.calls(&k2), 1);
            assert_eq!(memo.request_count(&k1).await.unwrap(), 2);
            assert_eq!(memo.request_count(&k2).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_backends_behave_identically() {
        let mut observed = Vec::new();

        for backend in backends().await {
            let kind = backend.kind();
            let stub = StubFetcher::default();
            let memo = MemoizingFetcher::new(backend, stub.clone())
                .with_ttl(Duration::from_millis(150))
                .unwrap();
            let page = url("transparent");

            let mut trace = Vec::new();
            for pause in [0u64, 10, 300, 10] {
                tokio::time::sleep(Duration::from_millis(pause)).await;
                let before = stub.calls(&page);
                let body = memo.fetch(&page).await.unwrap();
                let hit = stub.calls(&page) == before;
                // Strip the per-run URL so payloads compare across backends.
                let suffix = body.rsplit('#').next().unwrap_or_default().to_string();
                trace.push((hit, suffix));
            }
            let count = memo.request_count(&page).await.unwrap();
            observed.push((kind, trace, count));
        }

        let kinds: Vec<_> = observed.iter().map(|(kind, _, _)| *kind).collect();
        assert_eq!(kinds, vec!["local", "shared"]);

        let expected = (
            vec![
                (false, "1".to_string()),
                (true, "1".to_string()),
                (false, "2".to_string()),
                (true, "2".to_string()),
            ],
            4,
        );
        for (kind, trace, count) in observed {
            assert_eq!((trace, count), expected, "backend {}", kind);
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_all_counted() {
        for backend in backends().await {
            let stub = StubFetcher::slow(Duration::from_millis(20));
            let memo = Arc::new(MemoizingFetcher::new(backend, stub.clone()));
            let page = url("concurrent");

            let handles: Vec<_> = (0..32)
                .map(|_| {
                    let memo = Arc::clone(&memo);
                    let page = page.clone();
                    tokio::spawn(async move { memo.fetch(&page).await })
                })
                .collect();

            for handle in handles {
                let body = handle.await.unwrap().unwrap();
                assert!(body.starts_with(&page));
            }

            assert_eq!(memo.request_count(&page).await.unwrap(), 32);
            // Overlapping misses may each fetch; at least one must have.
            let calls = stub.calls(&page);
            assert!((1..=32).contains(&calls));

            // Once settled, the entry is live and serves the next call.
            memo.fetch(&page).await.unwrap();
            assert_eq!(stub.calls(&page), calls);
        }
    }

    #[tokio::test]
    async fn test_slow_fetch_does_not_block_other_keys() {
        let backend = CacheBackend::new_local();
        let slow = MemoizingFetcher::new(backend.clone(), StubFetcher::slow(Duration::from_millis(300)));
        let fast = MemoizingFetcher::new(backend, StubFetcher::default());

        let slow_task = tokio::spawn(async move { slow.fetch("slow-page").await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = std::time::Instant::now();
        fast.fetch("fast-page").await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));

        slow_task.await.unwrap().unwrap();
    }

    #[test]
    fn test_ttl_below_one_millisecond_rejected() {
        let memo = || MemoizingFetcher::new(CacheBackend::new_local(), StubFetcher::default());

        assert!(matches!(memo().with_ttl(Duration::ZERO), Err(MemoError::Config(_))));
        assert!(matches!(
            memo().with_ttl(Duration::from_micros(500)),
            Err(MemoError::Config(_))
        ));
        assert_eq!(memo().with_ttl(MIN_TTL).unwrap().ttl(), MIN_TTL);
    }

    #[test]
    fn test_default_ttl_is_ten_seconds() {
        let memo = MemoizingFetcher::new(CacheBackend::new_local(), StubFetcher::default());
        assert_eq!(memo.ttl(), Duration::from_secs(10));
        assert_eq!(memo.backend().kind(), "local");
    }
}
