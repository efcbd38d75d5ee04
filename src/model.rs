//! Core data model: requests, results, envelopes, and the small value types
//! that cross the cache-serialization boundary.
//!
//! Mirrors the shapes in spec.md §3. `metadata` and `filters` use tagged
//! enums rather than a dynamic/dictionary type, per the Design Notes'
//! guidance on replacing runtime-flexible records with a statically typed
//! equivalent.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Current cache entry schema version, embedded as the 1-byte prefix on every
/// serialized [`CacheEntry`]. Bumping this makes old entries miss forward,
/// not error, on rollout (spec.md §6).
pub const CACHE_SCHEMA_VERSION: u8 = 1;

/// How results should be ordered before pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    Relevance,
    Date,
    Views,
    Name,
    CustomField,
}

impl Default for SortBy {
    fn default() -> Self {
        SortBy::Relevance
    }
}

/// Ascending or descending sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

/// A single filter value: either an allowed-value set or a date range.
///
/// `Values` is a `BTreeSet` rather than a `Vec`/`HashSet` so that the
/// Fingerprinter's canonicalization step (sort the set) is a structural
/// property of the type, not an algorithm the caller must remember to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterValue {
    Values(BTreeSet<String>),
    DateRange {
        from: Option<SystemTime>,
        to: Option<SystemTime>,
    },
}

/// Search request options (everything but the query string itself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub limit: u32,
    pub offset: u32,
    pub filters: HashMap<String, FilterValue>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// Overrides the selector's default cache participation for this
    /// request. `None` means "use the configured default".
    pub cache_enabled: Option<bool>,
    /// Overrides the write-through TTL for this request, in milliseconds.
    /// `Some(0)` disables caching for this particular write (spec.md §4.5,
    /// §9 Open Question #1).
    pub cache_ttl_ms: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            filters: HashMap::new(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            cache_enabled: None,
            cache_ttl_ms: None,
        }
    }
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub options: SearchOptions,
}

impl SearchRequest {
    /// Construct a request with default options.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            options: SearchOptions::default(),
        }
    }
}

/// How a single result matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Title,
    Author,
    Username,
    Name,
    Description,
    Category,
    Question,
    Answer,
    Custom,
}

/// A free-form metadata value. Backends promote their native rows into this
/// shape rather than the core depending on a dynamic JSON type directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
    Map(HashMap<String, MetadataValue>),
}

/// A single ranked search result, normalized across backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    /// Tag identifying the source collection (e.g. "article", "user").
    pub result_type: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub visibility: Option<String>,
    pub created_at: Option<SystemTime>,
    pub match_type: MatchType,
    /// Normalized relevance in `[0, 100]`, comparable across backends.
    pub relevance_score: u8,
    pub metadata: HashMap<String, MetadataValue>,
}

/// Total ordering spec.md §3/§8 requires: relevance desc, `created_at` desc
/// (missing values sort last), `id` asc.
pub fn compare_for_sort(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.relevance_score
        .cmp(&a.relevance_score)
        .then_with(|| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

/// Which data path was used (or attempted) for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataPath {
    Cache,
    Database,
}

impl DataPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataPath::Cache => "cache",
            DataPath::Database => "database",
        }
    }
}

/// The selected execution plan for one request (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub primary: DataPath,
    pub fallback: Option<DataPath>,
    /// Enumerated reason tag, e.g. "cache-healthy", "breaker-open".
    pub reason: &'static str,
}

/// Timing and hit/miss provenance for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub search_time_ms: u64,
    pub cache_hit: bool,
    pub result_count: usize,
}

/// A recovered, non-fatal error surfaced for observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub backend: &'static str,
    pub kind: &'static str,
    pub message: String,
}

/// The complete response returned by [`crate::SmartSearch::search`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub results: Vec<SearchResult>,
    pub performance: Performance,
    pub strategy: Strategy,
    pub errors: Vec<ErrorSummary>,
}

impl ResultEnvelope {
    pub fn empty(strategy: Strategy) -> Self {
        Self {
            results: Vec::new(),
            performance: Performance {
                search_time_ms: 0,
                cache_hit: false,
                result_count: 0,
            },
            strategy,
            errors: Vec::new(),
        }
    }
}

/// Wire format written into the cache backend: a schema-versioned envelope
/// plus the bookkeeping the read path needs to enforce TTL independent of
/// backend-native expiry (spec.md §3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub schema_version: u8,
    pub envelope: ResultEnvelope,
    pub created_at: SystemTime,
    pub expiry: SystemTime,
}

impl CacheEntry {
    pub fn new(envelope: ResultEnvelope, ttl: std::time::Duration) -> Self {
        let created_at = SystemTime::now();
        Self {
            schema_version: CACHE_SCHEMA_VERSION,
            envelope,
            created_at,
            expiry: created_at + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() > self.expiry
    }
}

/// Health probe result for one backend (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub is_connected: bool,
    pub is_search_available: bool,
    pub latency_ms: u64,
    pub errors: Vec<String>,
    pub captured_at: SystemTime,
}

impl HealthSnapshot {
    pub fn healthy(latency_ms: u64) -> Self {
        Self {
            is_connected: true,
            is_search_available: true,
            latency_ms,
            errors: Vec::new(),
            captured_at: SystemTime::now(),
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            is_connected: false,
            is_search_available: false,
            latency_ms: 0,
            errors: vec![error.into()],
            captured_at: SystemTime::now(),
        }
    }
}
