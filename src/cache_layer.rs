//! Cache read/write layer (spec.md §4.5): guards all cache access behind the
//! circuit breaker, enforces per-op deadlines, size limits, and TTL, and
//! handles (de)serialization of [`CacheEntry`].
//!
//! Serialization uses `serde_json` behind the 1-byte schema-version prefix
//! spec.md §6 requires; unknown versions are treated as misses rather than
//! errors, matching the forward-compatible-rollout requirement.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::backend::CacheBackend;
use crate::breaker::CircuitBreaker;
use crate::error::ErrorKind;
use crate::model::{CacheEntry, ResultEnvelope, CACHE_SCHEMA_VERSION};

/// Outcome of a cache read attempt.
pub enum ReadOutcome {
    Hit(ResultEnvelope),
    Miss,
    /// Miss, but with an error worth surfacing in the response envelope.
    MissWithError { kind: ErrorKind, message: String },
}

/// Guards a [`CacheBackend`] behind a [`CircuitBreaker`] and enforces the
/// size/TTL policy spec.md §4.5 describes.
pub struct CacheLayer {
    backend: Arc<dyn CacheBackend>,
    breaker: Arc<CircuitBreaker>,
    op_deadline: Duration,
    max_value_bytes: usize,
}

impl CacheLayer {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        breaker: Arc<CircuitBreaker>,
        op_deadline: Duration,
        max_value_bytes: usize,
    ) -> Self {
        Self {
            backend,
            breaker,
            op_deadline,
            max_value_bytes,
        }
    }

    fn encode(entry: &CacheEntry) -> Result<Vec<u8>, serde_json::Error> {
        let body = serde_json::to_vec(entry)?;
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(entry.schema_version);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decode(bytes: &[u8]) -> Result<CacheEntry, &'static str> {
        let (version, body) = bytes.split_first().ok_or("empty cache entry")?;
        if *version != CACHE_SCHEMA_VERSION {
            return Err("unknown schema version");
        }
        serde_json::from_slice(body).map_err(|_| "malformed cache entry body")
    }

    /// Read path (spec.md §4.5 steps 1-5).
    pub async fn try_get(&self, key: &str) -> ReadOutcome {
        if !self.breaker.allow() {
            return ReadOutcome::Miss;
        }

        let result = timeout(self.op_deadline, self.backend.get(key)).await;

        match result {
            Err(_) => {
                self.breaker.record_failure();
                tracing::warn!(key, "cache get timed out");
                ReadOutcome::MissWithError {
                    kind: ErrorKind::BackendTimeout,
                    message: "cache get timed out".to_string(),
                }
            }
            Ok(Err(e)) => {
                self.breaker.record_failure();
                tracing::warn!(key, error = %e, "cache get failed");
                ReadOutcome::MissWithError {
                    kind: ErrorKind::BackendUnavailable,
                    message: e.to_string(),
                }
            }
            Ok(Ok(None)) => {
                self.breaker.record_success();
                ReadOutcome::Miss
            }
            Ok(Ok(Some(bytes))) => {
                self.breaker.record_success();
                match Self::decode(&bytes) {
                    // A legitimately empty result set is still a hit; the
                    // structural validation in spec.md §4.5 step 3 only
                    // rejects malformed entries, not empty-but-valid ones.
                    Ok(entry) if !entry.is_expired() => ReadOutcome::Hit(entry.envelope),
                    Ok(_) => ReadOutcome::Miss, // expired
                    Err(reason) => {
                        // Malformed or unknown-version entries are treated
                        // as misses and do NOT trip the breaker
                        // (spec.md §7: SerializationError never counts as a
                        // breaker failure).
                        tracing::debug!(key, reason, "cache entry failed to decode, treating as miss");
                        ReadOutcome::MissWithError {
                            kind: ErrorKind::SerializationError,
                            message: reason.to_string(),
                        }
                    }
                }
            }
        }
    }

    /// Write path (spec.md §4.5 steps 1-4). `ttl` of zero skips the write
    /// entirely (spec.md §9 Open Question #1).
    pub async fn try_set(&self, key: &str, envelope: &ResultEnvelope, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        if !self.breaker.allow() {
            return;
        }

        let entry = CacheEntry::new(envelope.clone(), ttl);
        let encoded = match Self::encode(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(key, error = %e, "failed to serialize cache entry, skipping write");
                return;
            }
        };

        if encoded.len() > self.max_value_bytes {
            tracing::debug!(
                key,
                size = encoded.len(),
                max = self.max_value_bytes,
                "serialized result exceeds max-value size, skipping cache write"
            );
            return;
        }

        let ttl_ms = ttl.as_millis().min(u64::MAX as u128) as u64;
        match timeout(self.op_deadline, self.backend.set(key, &encoded, ttl_ms)).await {
            Ok(Ok(())) => self.breaker.record_success(),
            Ok(Err(e)) => {
                self.breaker.record_failure();
                tracing::warn!(key, error = %e, "cache set failed");
            }
            Err(_) => {
                self.breaker.record_failure();
                tracing::warn!(key, "cache set timed out");
            }
        }
    }

    /// Invalidate keys matching a prefix pattern (spec.md §4.5 Invalidation).
    pub async fn clear(&self, pattern: &str) -> Result<(), String> {
        self.backend
            .clear(pattern)
            .await
            .map_err(|e| e.to_string())
    }
}
