//! Health cache (spec.md §4.3): caps the rate of backend health probes.
//!
//! The TTL-gated "reuse if fresh, else reprobe" shape is grounded on
//! `database::cache::CacheEntry::is_expired` from the teacher, generalized
//! from cache values to [`HealthSnapshot`] values and keyed per backend via a
//! `DashMap` the way `enterprise::cache::strategy::InMemoryStore` keys its
//! backing store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::time::timeout;

use crate::backend::{CacheBackend, DatabaseBackend};
use crate::model::HealthSnapshot;

struct Entry {
    snapshot: HealthSnapshot,
    fetched_at: Instant,
}

/// Backend identity used as the health cache's key space. The orchestrator
/// only ever has (at most) one of each, but the registry is keyed generically
/// so it generalizes cleanly if a host wires up more than one cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendId {
    Database,
    Cache,
}

/// Memoizes backend health probes behind a short TTL.
pub struct HealthCache {
    ttl: Duration,
    probe_deadline: Duration,
    entries: DashMap<BackendId, Entry>,
}

impl HealthCache {
    pub fn new(ttl: Duration, probe_deadline: Duration) -> Self {
        Self {
            ttl,
            probe_deadline,
            entries: DashMap::new(),
        }
    }

    fn fresh(&self, id: BackendId) -> Option<HealthSnapshot> {
        self.entries.get(&id).and_then(|entry| {
            if entry.fetched_at.elapsed() < self.ttl {
                Some(entry.snapshot.clone())
            } else {
                None
            }
        })
    }

    fn store(&self, id: BackendId, snapshot: HealthSnapshot) -> HealthSnapshot {
        self.entries.insert(
            id,
            Entry {
                snapshot: snapshot.clone(),
                fetched_at: Instant::now(),
            },
        );
        snapshot
    }

    /// Fetch the database backend's health, probing if the cached snapshot
    /// is stale. Probe errors are synthesized into an unhealthy snapshot and
    /// do NOT count as a breaker failure — health probes and request
    /// failures are separate channels (spec.md §4.3).
    pub async fn get_database_health(&self, backend: &Arc<dyn DatabaseBackend>) -> HealthSnapshot {
        if let Some(snapshot) = self.fresh(BackendId::Database) {
            return snapshot;
        }
        let snapshot = match timeout(self.probe_deadline, backend.health_probe()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => HealthSnapshot::unhealthy(e.to_string()),
            Err(_) => HealthSnapshot::unhealthy("health probe timed out"),
        };
        self.store(BackendId::Database, snapshot)
    }

    /// As [`Self::get_database_health`], for the cache backend.
    pub async fn get_cache_health(&self, backend: &Arc<dyn CacheBackend>) -> HealthSnapshot {
        if let Some(snapshot) = self.fresh(BackendId::Cache) {
            return snapshot;
        }
        let snapshot = match timeout(self.probe_deadline, backend.health_probe()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => HealthSnapshot::unhealthy(e.to_string()),
            Err(_) => HealthSnapshot::unhealthy("health probe timed out"),
        };
        self.store(BackendId::Cache, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::model::{SearchRequest, SearchResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingDb {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl DatabaseBackend for CountingDb {
        async fn search(&self, _: &SearchRequest) -> Result<Vec<SearchResult>, BackendError> {
            Ok(vec![])
        }

        async fn health_probe(&self) -> Result<HealthSnapshot, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HealthSnapshot::healthy(1))
        }
    }

    #[tokio::test]
    async fn reuses_snapshot_within_ttl() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = HealthCache::new(Duration::from_secs(30), Duration::from_secs(1));
        let db: Arc<dyn DatabaseBackend> = Arc::new(CountingDb {
            calls: calls.clone(),
        });
        cache.get_database_health(&db).await;
        cache.get_database_health(&db).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reprobes_after_ttl_expires() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = HealthCache::new(Duration::from_millis(10), Duration::from_secs(1));
        let db: Arc<dyn DatabaseBackend> = Arc::new(CountingDb {
            calls: calls.clone(),
        });
        cache.get_database_health(&db).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.get_database_health(&db).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
