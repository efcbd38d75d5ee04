//! Stats aggregator (spec.md §4.7): in-process, monotonic counters exposed as
//! an immutable snapshot. No external metrics system dependency — adapters
//! may export the snapshot however they like.
//!
//! Sharded-counter shape (a `DashMap` keyed by label tuple, each value an
//! atomic) is grounded on `enterprise::ratelimit::analytics`'s event
//! tracking, trimmed down to counters only (spec.md doesn't ask for an event
//! log, only aggregate counts).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::error::ErrorKind;
use crate::model::DataPath;

/// Immutable point-in-time view of the counters.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub searches_total: u64,
    pub cache_hits_total: u64,
    pub cache_misses_total: u64,
    pub database_queries_total: u64,
    pub errors_total: HashMap<&'static str, u64>,
    pub strategy_chosen_total: HashMap<(&'static str, &'static str), u64>,
}

#[derive(Default)]
pub struct StatsAggregator {
    searches_total: AtomicU64,
    cache_hits_total: AtomicU64,
    cache_misses_total: AtomicU64,
    database_queries_total: AtomicU64,
    errors_total: DashMap<&'static str, AtomicU64>,
    strategy_chosen_total: DashMap<(&'static str, &'static str), AtomicU64>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_search(&self) {
        self.searches_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_database_query(&self) {
        self.database_queries_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, kind: ErrorKind) {
        self.errors_total
            .entry(kind.as_str())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_strategy(&self, primary: DataPath, reason: &'static str) {
        self.strategy_chosen_total
            .entry((primary.as_str(), reason))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Take an immutable snapshot of all counters.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            searches_total: self.searches_total.load(Ordering::Relaxed),
            cache_hits_total: self.cache_hits_total.load(Ordering::Relaxed),
            cache_misses_total: self.cache_misses_total.load(Ordering::Relaxed),
            database_queries_total: self.database_queries_total.load(Ordering::Relaxed),
            errors_total: self
                .errors_total
                .iter()
                .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
                .collect(),
            strategy_chosen_total: self
                .strategy_chosen_total
                .iter()
                .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = StatsAggregator::new();
        let snap = stats.snapshot();
        assert_eq!(snap.searches_total, 0);
        assert_eq!(snap.cache_hits_total, 0);
    }

    #[test]
    fn counters_increment_independently() {
        let stats = StatsAggregator::new();
        stats.record_search();
        stats.record_search();
        stats.record_cache_hit();
        stats.record_database_query();
        stats.record_error(ErrorKind::BackendTimeout);
        stats.record_strategy(DataPath::Cache, "cache-healthy");
        stats.record_strategy(DataPath::Cache, "cache-healthy");

        let snap = stats.snapshot();
        assert_eq!(snap.searches_total, 2);
        assert_eq!(snap.cache_hits_total, 1);
        assert_eq!(snap.database_queries_total, 1);
        assert_eq!(snap.errors_total.get("backend_timeout"), Some(&1));
        assert_eq!(
            snap.strategy_chosen_total.get(&("cache", "cache-healthy")),
            Some(&2)
        );
    }
}
