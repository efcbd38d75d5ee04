//! Backend contracts (spec.md §6): minimal abstract interfaces the core
//! exposes to pluggable database and cache adapters. The core never imports
//! adapter code — it only depends on these traits, following the
//! `BackingStore` pattern in the teacher's `enterprise::cache::strategy`
//! module.

use async_trait::async_trait;

use crate::model::{HealthSnapshot, SearchRequest, SearchResult};

/// A generic backend operation error. Adapters return their own error types
/// boxed behind this so the core never depends on a concrete driver's error
/// enum; the orchestrator only needs the `Display` text for `ErrorSummary`.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The primary, authoritative data source.
///
/// Adapters must be internally thread-safe: the orchestrator calls `search`
/// and `health_probe` concurrently from multiple in-flight requests without
/// any external synchronization.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Run the query. May return results in any order — the orchestrator
    /// re-sorts per spec.md §4.6 step 7.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, BackendError>;

    /// Probe connectivity and search availability.
    async fn health_probe(&self) -> Result<HealthSnapshot, BackendError>;
}

/// An optional read-through cache tier.
///
/// `set` must not retain references to the byte slice after it returns
/// (spec.md §6) — implementations that need to persist the bytes must copy
/// them.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch raw bytes for `key`, or `None` on a clean miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Store raw bytes for `key` with the given TTL in milliseconds.
    async fn set(&self, key: &str, value: &[u8], ttl_ms: u64) -> Result<(), BackendError>;

    /// Remove a single key.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Remove all keys matching a prefix pattern (a single trailing `*`
    /// wildcard). Backends that cannot enumerate keys natively may implement
    /// this via an internal key registry; visibility semantics (eventual vs
    /// immediate) are adapter-defined.
    async fn clear(&self, pattern: &str) -> Result<(), BackendError>;

    /// Probe connectivity.
    async fn health_probe(&self) -> Result<HealthSnapshot, BackendError>;
}
