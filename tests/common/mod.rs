//! Fake backends for end-to-end scenario tests, grounded on the
//! `InMemoryStore` pattern used for `BackingStore` in the teacher's
//! `enterprise::cache::strategy` module.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use smart_search::{BackendError, CacheBackend, DatabaseBackend, HealthSnapshot, SearchRequest, SearchResult};

/// A scriptable in-memory database backend.
pub struct FakeDatabase {
    pub results: Mutex<Vec<SearchResult>>,
    pub fail: AtomicBool,
    pub hang_for: Mutex<Option<Duration>>,
    pub calls: AtomicU32,
}

impl FakeDatabase {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results: Mutex::new(results),
            fail: AtomicBool::new(false),
            hang_for: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseBackend for FakeDatabase {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchResult>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = *self.hang_for.lock().unwrap() {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err("simulated database failure".into());
        }
        Ok(self.results.lock().unwrap().clone())
    }

    async fn health_probe(&self) -> Result<HealthSnapshot, BackendError> {
        if self.fail.load(Ordering::SeqCst) {
            Ok(HealthSnapshot::unhealthy("simulated outage"))
        } else {
            Ok(HealthSnapshot::healthy(1))
        }
    }
}

struct Entry {
    bytes: Vec<u8>,
}

/// A scriptable in-memory cache backend.
pub struct FakeCache {
    store: Mutex<HashMap<String, Entry>>,
    pub fail_get: AtomicBool,
    pub hang_for: Mutex<Option<Duration>>,
    pub connected: AtomicBool,
    pub get_calls: AtomicU32,
    pub set_calls: AtomicU32,
}

impl FakeCache {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            fail_get: AtomicBool::new(false),
            hang_for: Mutex::new(None),
            connected: AtomicBool::new(true),
            get_calls: AtomicU32::new(0),
            set_calls: AtomicU32::new(0),
        }
    }
}

impl Default for FakeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for FakeCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = *self.hang_for.lock().unwrap() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_get.load(Ordering::SeqCst) {
            return Err("simulated cache failure".into());
        }
        Ok(self.store.lock().unwrap().get(key).map(|e| e.bytes.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], _ttl_ms: u64) -> Result<(), BackendError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.store.lock().unwrap().insert(
            key.to_string(),
            Entry {
                bytes: value.to_vec(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.store.lock().unwrap().remove(key);
        Ok(())
    }

    async fn clear(&self, pattern: &str) -> Result<(), BackendError> {
        let prefix = pattern.trim_end_matches('*');
        self.store.lock().unwrap().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    async fn health_probe(&self) -> Result<HealthSnapshot, BackendError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(HealthSnapshot::healthy(1))
        } else {
            Ok(HealthSnapshot::unhealthy("simulated disconnect"))
        }
    }
}

pub fn sample_result(id: &str, score: u8) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        result_type: "article".to_string(),
        title: "heart disease".to_string(),
        subtitle: None,
        description: None,
        category: None,
        language: None,
        visibility: None,
        created_at: None,
        match_type: smart_search::MatchType::Title,
        relevance_score: score,
        metadata: HashMap::new(),
    }
}
