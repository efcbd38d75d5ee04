//! # smart-search
//!
//! A unified search facade that federates queries across a primary database
//! and an optional cache tier, returning ranked, typed results with
//! guarantees about correctness under partial failure.
//!
//! The value here is not any one backend integration but the orchestration
//! core: per-request cache-vs-database strategy selection, circuit-breaker
//! isolation of misbehaving backends, deterministic cache-key fingerprinting,
//! per-entry size/TTL policy enforcement, and a result envelope carrying
//! provenance (which strategy ran, whether it was a cache hit, timing, and
//! any recovered errors).
//!
//! ## Architecture
//!
//! - `model`: request/result/envelope/cache-entry/health data types
//! - `error`: the crate's typed error taxonomy
//! - `config`: structural configuration, injected at construction
//! - `backend`: the `DatabaseBackend`/`CacheBackend` traits adapters implement
//! - `fingerprint`: deterministic cache-key derivation
//! - `breaker`: per-backend circuit breaker state machine
//! - `health`: TTL-memoized backend health probes
//! - `strategy`: the pure cache-vs-database decision table
//! - `cache_layer`: breaker-guarded cache read/write with size and TTL policy
//! - `stats`: in-process counters
//! - `orchestrator`: `SmartSearch`, the public facade tying it all together
//! - `cancellation`: a minimal cooperative cancellation handle
//!
//! ## Example
//!
//! ```rust,ignore
//! use smart_search::{SmartSearch, SmartSearchConfig, SearchRequest};
//! use std::sync::Arc;
//!
//! # async fn example(db: Arc<dyn smart_search::DatabaseBackend>) {
//! let search = SmartSearch::new(SmartSearchConfig::default(), db, None);
//! let envelope = search.search(SearchRequest::new("heart disease")).await.unwrap();
//! println!("{} results in {}ms", envelope.results.len(), envelope.performance.search_time_ms);
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod breaker;
pub mod cache_layer;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod health;
pub mod model;
pub mod orchestrator;
pub mod stats;
pub mod strategy;

pub use backend::{BackendError, CacheBackend, DatabaseBackend};
pub use breaker::{BreakerState, CircuitBreaker, State as BreakerPhase};
pub use cancellation::CancellationToken;
pub use config::{BreakerConfig, SmartSearchConfig};
pub use error::{ErrorKind, Result, SmartSearchError};
pub use model::{
    CacheEntry, DataPath, ErrorSummary, FilterValue, HealthSnapshot, MatchType, MetadataValue,
    Performance, ResultEnvelope, SearchOptions, SearchRequest, SearchResult, SortBy, SortOrder,
    Strategy,
};
pub use orchestrator::{HealthReport, SmartSearch};
pub use stats::Snapshot;
