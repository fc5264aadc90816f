//! Cache for the mode-selection table.
//!
//! The table is small and changes rarely, so one fetch serves every lookup
//! until the entry expires or is cleared. Concurrent misses share a single
//! fetch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use driftwatch_core::ModeSelectionEntry;
use moka::future::Cache;

use crate::error::DriftError;

type Table = Arc<Vec<ModeSelectionEntry>>;

#[derive(Debug, Clone)]
pub struct ModeSelectionCache {
    ttl: Option<Duration>,
    inner: Cache<(), Table>,
}

impl Default for ModeSelectionCache {
    fn default() -> Self {
        Self::never_expires()
    }
}

impl ModeSelectionCache {
    /// `ttl = None` keeps the first successful fetch until [`clear`](Self::clear).
    pub fn new(ttl: Option<Duration>) -> Self {
        let builder = Cache::builder().max_capacity(1);
        let inner = match ttl {
            Some(ttl) => builder.time_to_live(ttl).build(),
            None => builder.build(),
        };
        Self { ttl, inner }
    }

    pub fn never_expires() -> Self {
        Self::new(None)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Cached entries, if present and not expired.
    pub async fn get(&self) -> Option<Table> {
        self.inner.get(&()).await
    }

    /// Store a fresh table, replacing whatever was there.
    pub async fn put(&self, entries: Vec<ModeSelectionEntry>) -> Table {
        let entries = Arc::new(entries);
        self.inner.insert((), Arc::clone(&entries)).await;
        entries
    }

    /// Cached entries, or the result of `fetch` stored on success. Callers
    /// that miss at the same time wait on one `fetch`; a failure is not
    /// cached.
    pub async fn get_or_fetch<F>(&self, fetch: F) -> Result<Table, DriftError>
    where
        F: Future<Output = Result<Vec<ModeSelectionEntry>, DriftError>>,
    {
        self.inner
            .try_get_with((), async { fetch.await.map(Arc::new) })
            .await
            .map_err(|shared| Arc::try_unwrap(shared).unwrap_or_else(DriftError::Shared))
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    pub async fn is_populated(&self) -> bool {
        self.get().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ErrorKind;

    fn entry(user: &str) -> ModeSelectionEntry {
        ModeSelectionEntry {
            user: user.to_string(),
            business_unit: "CCS".to_string(),
            use_case: "CC-Di".to_string(),
            mode: "mode1".to_string(),
            alert_keeper: "ops@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn empty_cache_misses() {
        let cache = ModeSelectionCache::default();
        assert!(cache.get().await.is_none());
        assert!(!cache.is_populated().await);
    }

    #[tokio::test]
    async fn put_then_get_shares_the_same_table() {
        let cache = ModeSelectionCache::never_expires();
        let stored = cache.put(vec![entry("alice")]).await;
        let cached = cache.get().await.unwrap();
        assert!(Arc::ptr_eq(&stored, &cached));
    }

    #[tokio::test]
    async fn clear_forgets_the_table() {
        let cache = ModeSelectionCache::never_expires();
        cache.put(vec![entry("alice")]).await;
        cache.clear();
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn later_put_wins() {
        let cache = ModeSelectionCache::never_expires();
        cache.put(vec![entry("alice")]).await;
        cache.put(vec![entry("bob"), entry("carol")]).await;
        assert_eq!(cache.get().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn short_ttl_expires() {
        let cache = ModeSelectionCache::new(Some(Duration::from_millis(20)));
        cache.put(vec![entry("alice")]).await;
        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn long_ttl_keeps_the_table() {
        let cache = ModeSelectionCache::new(Some(Duration::from_secs(3600)));
        cache.put(vec![entry("alice")]).await;
        assert!(cache.is_populated().await);
        assert_eq!(cache.ttl(), Some(Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn get_or_fetch_runs_the_fetch_once() {
        let cache = ModeSelectionCache::never_expires();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![entry("alice")])
        };

        let first = cache.get_or_fetch(fetch()).await.unwrap();
        let second = cache.get_or_fetch(fetch()).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache = ModeSelectionCache::never_expires();
        let err = cache
            .get_or_fetch(async { Err(DriftError::Shape("bad table".into())) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert!(!cache.is_populated().await);

        let entries = cache
            .get_or_fetch(async { Ok(vec![entry("bob")]) })
            .await
            .unwrap();
        assert_eq!(entries[0].user, "bob");
    }
}
