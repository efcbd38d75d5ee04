//! Search orchestrator (spec.md §4.6): the sole public entry point. Composes
//! the fingerprinter, circuit breakers, health cache, strategy selector, and
//! cache layer into `SmartSearch::search`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::backend::{CacheBackend, DatabaseBackend};
use crate::breaker::{self, CircuitBreaker};
use crate::cache_layer::{CacheLayer, ReadOutcome};
use crate::cancellation::CancellationToken;
use crate::config::SmartSearchConfig;
use crate::error::{ErrorKind, Result, SmartSearchError};
use crate::fingerprint::fingerprint;
use crate::health::HealthCache;
use crate::model::{
    compare_for_sort, DataPath, ErrorSummary, HealthSnapshot, Performance, ResultEnvelope,
    SearchRequest, SearchResult, Strategy,
};
use crate::stats::{Snapshot, StatsAggregator};
use crate::strategy::{select, SelectorInput};

/// Maximum number of write-through tasks allowed to be in flight at once,
/// bounding unbounded growth under cache slowness (spec.md §9 Design Notes,
/// Asynchronous write-through).
const MAX_OUTSTANDING_WRITE_THROUGHS: usize = 64;

struct CacheSide {
    backend: Arc<dyn CacheBackend>,
    breaker: Arc<CircuitBreaker>,
    layer: CacheLayer,
}

/// Combined health + breaker observation (spec.md §6, `getHealth`).
pub struct HealthReport {
    pub database: HealthSnapshot,
    pub cache: Option<HealthSnapshot>,
    pub database_breaker: breaker::BreakerState,
    pub cache_breaker: Option<breaker::BreakerState>,
}

enum DbOutcome {
    Ok(Vec<SearchResult>),
    Failed(ErrorKind, String),
    Cancelled,
}

/// The unified search facade (spec.md §1, §6 `SmartSearch`).
pub struct SmartSearch {
    config: SmartSearchConfig,
    database: Arc<dyn DatabaseBackend>,
    database_breaker: Arc<CircuitBreaker>,
    cache: Option<CacheSide>,
    health_cache: HealthCache,
    stats: StatsAggregator,
    write_through_permits: Arc<Semaphore>,
}

impl SmartSearch {
    /// Construct an orchestrator over a required database backend and an
    /// optional cache backend.
    pub fn new(
        config: SmartSearchConfig,
        database: Arc<dyn DatabaseBackend>,
        cache: Option<Arc<dyn CacheBackend>>,
    ) -> Self {
        let database_breaker = Arc::new(CircuitBreaker::new(config.database_breaker));
        let health_cache = HealthCache::new(config.health_cache_ttl, config.health_probe_deadline);

        let cache = cache.map(|backend| {
            let breaker = Arc::new(CircuitBreaker::new(config.cache_breaker));
            let layer = CacheLayer::new(
                backend.clone(),
                breaker.clone(),
                config.cache_op_deadline,
                config.max_value_bytes,
            );
            CacheSide {
                backend,
                breaker,
                layer,
            }
        });

        Self {
            config,
            database,
            database_breaker,
            cache,
            health_cache,
            stats: StatsAggregator::new(),
            write_through_permits: Arc::new(Semaphore::new(MAX_OUTSTANDING_WRITE_THROUGHS)),
        }
    }

    /// Run a search without a cancellation handle.
    pub async fn search(&self, request: SearchRequest) -> Result<ResultEnvelope> {
        self.search_with_cancellation(request, CancellationToken::none())
            .await
    }

    /// Run a search, honoring `cancel` as a cooperative abort signal.
    /// Cancellation never trips a circuit breaker (spec.md §5).
    pub async fn search_with_cancellation(
        &self,
        request: SearchRequest,
        cancel: CancellationToken,
    ) -> Result<ResultEnvelope> {
        self.stats.record_search();
        let start = Instant::now();

        match tokio::time::timeout(
            self.config.overall_deadline,
            self.run(request, &cancel, start),
        )
        .await
        {
            Ok(result) => result,
            // Exceeding the overall deadline is treated as an implicit
            // cancellation: no narrower error kind in spec.md §7 fits an
            // overall-deadline breach better than `CancellationError`.
            Err(_) => Err(SmartSearchError::Cancelled),
        }
    }

    async fn run(
        &self,
        request: SearchRequest,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<ResultEnvelope> {
        let request = self.validate(request)?;
        if self.config.log_queries {
            tracing::debug!(query = %request.query, "validated search request");
        }
        if cancel.is_cancelled() {
            return Err(SmartSearchError::Cancelled);
        }

        let key = fingerprint(&request);

        let cache_health = match &self.cache {
            Some(cache) => Some(self.health_cache.get_cache_health(&cache.backend).await),
            None => None,
        };

        let strategy = select(&SelectorInput {
            request_cache_enabled: request.options.cache_enabled,
            default_cache_enabled: self.config.cache_enabled,
            cache_configured: self.cache.is_some(),
            cache_breaker_open: self
                .cache
                .as_ref()
                .map(|c| c.breaker.state().state == breaker::State::Open)
                .unwrap_or(false),
            database_breaker_open: self.database_breaker.state().state == breaker::State::Open,
            cache_health: cache_health.as_ref(),
            default_fallback: self.config.fallback,
        });
        self.stats.record_strategy(strategy.primary, strategy.reason);

        let mut errors = Vec::new();
        let mut db_failed = false;
        let mut cache_failed = false;
        let mut tried_cache = false;
        let mut cache_hit = false;
        let mut results: Option<Vec<SearchResult>> = None;

        if strategy.primary == DataPath::Cache {
            if let Some((hit, outcome_results)) = self
                .attempt_cache_read(&key, &mut errors, &mut cache_failed)
                .await
            {
                tried_cache = true;
                cache_hit = hit;
                results = outcome_results;
            }
        }

        if results.is_none() {
            if cancel.is_cancelled() {
                return Err(SmartSearchError::Cancelled);
            }
            match self.query_database(&request, cancel).await {
                DbOutcome::Cancelled => return Err(SmartSearchError::Cancelled),
                DbOutcome::Ok(r) => {
                    self.stats.record_database_query();
                    results = Some(r);
                }
                DbOutcome::Failed(kind, message) => {
                    db_failed = true;
                    self.stats.record_error(kind);
                    errors.push(ErrorSummary {
                        backend: "database",
                        kind: kind.as_str(),
                        message,
                    });

                    if strategy.fallback == Some(DataPath::Cache) && !tried_cache {
                        if let Some((hit, outcome_results)) = self
                            .attempt_cache_read(&key, &mut errors, &mut cache_failed)
                            .await
                        {
                            cache_hit = hit;
                            results = outcome_results;
                        }
                    }
                }
            }
        }

        let results = match results {
            Some(r) => r,
            None => {
                let reason: &'static str = if db_failed && cache_failed {
                    "both-failed"
                } else {
                    "database-failed"
                };
                let mut envelope = ResultEnvelope::empty(Strategy {
                    primary: strategy.primary,
                    fallback: strategy.fallback,
                    reason,
                });
                envelope.errors = errors;
                envelope.performance.search_time_ms = start.elapsed().as_millis() as u64;
                return Ok(envelope);
            }
        };

        let results = if cache_hit {
            // Already sorted, paginated, and size-checked when it was
            // written through; re-applying would be redundant and would
            // break the "identical results on cache hit" invariant if the
            // live config (e.g. max_limit) has since changed.
            results
        } else {
            self.post_process(results, &request)
        };

        if !cache_hit {
            self.maybe_write_through(&key, &request, &results, &strategy, cache_health.as_ref());
        }

        if cache_hit {
            self.stats.record_cache_hit();
        }

        let mut envelope = ResultEnvelope::empty(strategy);
        envelope.performance.result_count = results.len();
        envelope.results = results;
        envelope.performance.cache_hit = cache_hit;
        envelope.performance.search_time_ms = start.elapsed().as_millis() as u64;
        envelope.errors = errors;
        Ok(envelope)
    }

    /// Returns `Some((hit, results))` when the cache was actually consulted.
    async fn attempt_cache_read(
        &self,
        key: &str,
        errors: &mut Vec<ErrorSummary>,
        cache_failed: &mut bool,
    ) -> Option<(bool, Option<Vec<SearchResult>>)> {
        let cache = self.cache.as_ref()?;
        match cache.layer.try_get(key).await {
            ReadOutcome::Hit(envelope) => {
                Some((true, Some(envelope.results)))
            }
            ReadOutcome::Miss => {
                self.stats.record_cache_miss();
                Some((false, None))
            }
            ReadOutcome::MissWithError { kind, message } => {
                self.stats.record_cache_miss();
                self.stats.record_error(kind);
                *cache_failed = true;
                errors.push(ErrorSummary {
                    backend: "cache",
                    kind: kind.as_str(),
                    message,
                });
                Some((false, None))
            }
        }
    }

    async fn query_database(&self, request: &SearchRequest, cancel: &CancellationToken) -> DbOutcome {
        if !self.database_breaker.allow() {
            return DbOutcome::Failed(
                ErrorKind::BackendUnavailable,
                "database circuit breaker open".to_string(),
            );
        }

        let timed = tokio::time::timeout(self.config.database_op_deadline, self.database.search(request));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => DbOutcome::Cancelled,
            outcome = timed => match outcome {
                Ok(Ok(results)) => {
                    self.database_breaker.record_success();
                    DbOutcome::Ok(results)
                }
                Ok(Err(e)) => {
                    self.database_breaker.record_failure();
                    DbOutcome::Failed(ErrorKind::BackendUnavailable, e.to_string())
                }
                Err(_) => {
                    self.database_breaker.record_failure();
                    DbOutcome::Failed(ErrorKind::BackendTimeout, "database search timed out".to_string())
                }
            }
        }
    }

    fn validate(&self, mut request: SearchRequest) -> Result<SearchRequest> {
        let trimmed = request.query.trim();
        if trimmed.is_empty() {
            return Err(SmartSearchError::Validation(
                "query must not be empty or whitespace-only".to_string(),
            ));
        }
        request.query = trimmed.to_string();

        if request.options.limit == 0 {
            return Err(SmartSearchError::Validation(
                "limit must be at least 1".to_string(),
            ));
        }
        if request.options.limit > self.config.max_limit {
            request.options.limit = self.config.max_limit;
        }

        if let Some(known) = &self.config.known_filter_fields {
            if let Some(unknown) = request.options.filters.keys().find(|k| !known.contains(*k)) {
                return Err(SmartSearchError::Validation(format!(
                    "unknown filter field: {unknown}"
                )));
            }
        }

        Ok(request)
    }

    /// Sort by relevance desc / created_at desc / id asc, then apply
    /// offset and limit (spec.md §4.6 step 7).
    fn post_process(&self, mut results: Vec<SearchResult>, request: &SearchRequest) -> Vec<SearchResult> {
        results.sort_by(compare_for_sort);
        let offset = request.options.offset as usize;
        let limit = request.options.limit as usize;
        if offset >= results.len() {
            return Vec::new();
        }
        let end = (offset + limit).min(results.len());
        results[offset..end].to_vec()
    }

    /// TTL precedence per spec.md §4.5: request override, then the
    /// configured per-type default keyed by the result set's dominant
    /// `result_type`, then the global default.
    fn cache_ttl_for(&self, request: &SearchRequest, results: &[SearchResult]) -> Duration {
        if let Some(ms) = request.options.cache_ttl_ms {
            return Duration::from_millis(ms);
        }
        if let Some(first) = results.first() {
            if let Some(ttl) = self.config.per_type_cache_ttl.get(&first.result_type) {
                return *ttl;
            }
        }
        self.config.default_cache_ttl
    }

    fn maybe_write_through(
        &self,
        key: &str,
        request: &SearchRequest,
        results: &[SearchResult],
        strategy: &Strategy,
        cache_health: Option<&HealthSnapshot>,
    ) {
        if !request.options.cache_enabled.unwrap_or(self.config.cache_enabled) {
            return;
        }
        let Some(cache) = &self.cache else { return };
        if !cache_health.map(|h| h.is_connected).unwrap_or(false) {
            return;
        }

        let ttl = self.cache_ttl_for(request, results);
        if ttl.is_zero() {
            return;
        }

        let Ok(permit) = self.write_through_permits.clone().try_acquire_owned() else {
            tracing::debug!(key, "too many outstanding write-throughs, dropping this one");
            return;
        };

        let layer_backend = cache.backend.clone();
        let layer_breaker = cache.breaker.clone();
        let op_deadline = self.config.cache_op_deadline;
        let max_value_bytes = self.config.max_value_bytes;
        let key = key.to_string();
        let envelope = ResultEnvelope {
            results: results.to_vec(),
            performance: Performance {
                search_time_ms: 0,
                cache_hit: false,
                result_count: results.len(),
            },
            strategy: strategy.clone(),
            errors: Vec::new(),
        };

        tokio::spawn(async move {
            let _permit = permit;
            let layer = CacheLayer::new(layer_backend, layer_breaker, op_deadline, max_value_bytes);
            layer.try_set(&key, &envelope, ttl).await;
        });
    }

    /// Immutable view of the in-process counters (spec.md §4.7).
    pub fn stats(&self) -> Snapshot {
        self.stats.snapshot()
    }

    /// Current health and breaker state for both backends (spec.md §6).
    pub async fn get_health(&self) -> HealthReport {
        let database = self.health_cache.get_database_health(&self.database).await;
        let cache = match &self.cache {
            Some(cache) => Some(self.health_cache.get_cache_health(&cache.backend).await),
            None => None,
        };
        HealthReport {
            database,
            cache,
            database_breaker: self.database_breaker.state(),
            cache_breaker: self.cache.as_ref().map(|c| c.breaker.state()),
        }
    }

    /// Passthrough invalidation to the cache backend, if one is configured
    /// (spec.md §6 `clearCache`).
    pub async fn clear_cache(&self, pattern: &str) -> std::result::Result<(), String> {
        match &self.cache {
            Some(cache) => cache.layer.clear(pattern).await,
            None => Ok(()),
        }
    }
}
