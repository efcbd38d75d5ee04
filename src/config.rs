//! Configuration surface for [`crate::SmartSearch`].
//!
//! Fully structural: no environment variables, no config files (spec.md §6
//! Non-goals are explicit on this). Hosts build a [`SmartSearchConfig`] in
//! process and pass it to `SmartSearch::new`, the same shape as the
//! teacher's `CacheConfig`/`GatewayConfig` builders.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::model::DataPath;

/// Per-backend circuit breaker tuning (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub threshold: u32,
    /// How long the breaker stays open before granting a half-open probe.
    pub recovery_timeout: Duration,
    /// Number of concurrent half-open probes granted after recovery.
    pub half_open_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_probes: 1,
        }
    }
}

/// Top-level configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct SmartSearchConfig {
    /// Strategy used when the primary path fails and the selector didn't
    /// already pick one (spec.md §6: "fallback: database|cache").
    pub fallback: DataPath,
    /// Default write-through TTL when neither the request nor a per-type
    /// default overrides it.
    pub default_cache_ttl: Duration,
    /// Write-through TTL overrides keyed by `SearchResult::result_type`,
    /// consulted between the request override and `default_cache_ttl`
    /// (spec.md §4.5 TTL policy: request override > per-type default >
    /// global default).
    pub per_type_cache_ttl: HashMap<String, Duration>,
    /// Hard cap on `SearchRequest.options.limit`.
    pub max_limit: u32,
    /// Cache entries serializing larger than this are not written
    /// (spec.md §4.5 step 2).
    pub max_value_bytes: usize,
    /// How long a [`crate::model::HealthSnapshot`] is reused before a fresh
    /// probe is issued.
    pub health_cache_ttl: Duration,
    /// Per-operation deadline for cache `get`/`set`/`delete`.
    pub cache_op_deadline: Duration,
    /// Per-operation deadline for the database `search` call.
    pub database_op_deadline: Duration,
    /// Per-operation deadline for health probes.
    pub health_probe_deadline: Duration,
    /// Overall deadline bounding every phase of one `search()` call.
    pub overall_deadline: Duration,
    /// Circuit breaker tuning for the database backend.
    pub database_breaker: BreakerConfig,
    /// Circuit breaker tuning for the cache backend.
    pub cache_breaker: BreakerConfig,
    /// Emit a debug-level log line for every validated query.
    pub log_queries: bool,
    /// Whether caching is attempted at all when a cache backend is
    /// configured; can still be overridden per request.
    pub cache_enabled: bool,
    /// Known filter field names a request is allowed to filter on
    /// (spec.md §4.6 step 2: "reject unknown filter fields"). `None` skips
    /// the check entirely, leaving field validity to the backend.
    pub known_filter_fields: Option<HashSet<String>>,
}

impl Default for SmartSearchConfig {
    fn default() -> Self {
        Self {
            fallback: DataPath::Database,
            default_cache_ttl: Duration::from_secs(300),
            per_type_cache_ttl: HashMap::new(),
            max_limit: 100,
            max_value_bytes: 1024 * 1024,
            health_cache_ttl: Duration::from_secs(30),
            cache_op_deadline: Duration::from_millis(500),
            database_op_deadline: Duration::from_secs(5),
            health_probe_deadline: Duration::from_secs(2),
            overall_deadline: Duration::from_secs(10),
            database_breaker: BreakerConfig::default(),
            cache_breaker: BreakerConfig::default(),
            log_queries: false,
            cache_enabled: true,
            known_filter_fields: None,
        }
    }
}

impl SmartSearchConfig {
    /// Start from defaults and override the database breaker tuning.
    pub fn with_database_breaker(mut self, cfg: BreakerConfig) -> Self {
        self.database_breaker = cfg;
        self
    }

    /// Start from defaults and override the cache breaker tuning.
    pub fn with_cache_breaker(mut self, cfg: BreakerConfig) -> Self {
        self.cache_breaker = cfg;
        self
    }

    /// Start from defaults and override the default write-through TTL.
    pub fn with_default_cache_ttl(mut self, ttl: Duration) -> Self {
        self.default_cache_ttl = ttl;
        self
    }

    /// Set the write-through TTL for a specific `result_type`, overriding
    /// `default_cache_ttl` for results of that type.
    pub fn with_type_cache_ttl(mut self, result_type: impl Into<String>, ttl: Duration) -> Self {
        self.per_type_cache_ttl.insert(result_type.into(), ttl);
        self
    }

    /// Restrict requests to filtering on the given field names.
    pub fn with_known_filter_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_filter_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}
