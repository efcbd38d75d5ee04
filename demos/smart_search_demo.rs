//! Minimal end-to-end usage demo: wires an in-memory database and cache
//! into [`SmartSearch`] and runs a couple of searches, printing the
//! envelope provenance and the running stats snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use smart_search::{
    BackendError, CacheBackend, DatabaseBackend, HealthSnapshot, MatchType, SearchRequest,
    SearchResult, SmartSearch, SmartSearchConfig,
};
use tokio::sync::Mutex;

struct InMemoryDatabase {
    rows: Vec<SearchResult>,
}

#[async_trait]
impl DatabaseBackend for InMemoryDatabase {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, BackendError> {
        let needle = request.query.to_lowercase();
        Ok(self
            .rows
            .iter()
            .filter(|r| r.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn health_probe(&self) -> Result<HealthSnapshot, BackendError> {
        Ok(HealthSnapshot::healthy(2))
    }
}

struct InMemoryCache {
    store: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.store.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8], _ttl_ms: u64) -> Result<(), BackendError> {
        self.store.lock().await.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.store.lock().await.remove(key);
        Ok(())
    }

    async fn clear(&self, pattern: &str) -> Result<(), BackendError> {
        let prefix = pattern.trim_end_matches('*');
        self.store.lock().await.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    async fn health_probe(&self) -> Result<HealthSnapshot, BackendError> {
        Ok(HealthSnapshot::healthy(1))
    }
}

fn article(id: &str, title: &str, score: u8) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        result_type: "article".to_string(),
        title: title.to_string(),
        subtitle: None,
        description: None,
        category: Some("health".to_string()),
        language: Some("en".to_string()),
        visibility: Some("public".to_string()),
        created_at: Some(SystemTime::now()),
        match_type: MatchType::Title,
        relevance_score: score,
        metadata: HashMap::new(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let database = Arc::new(InMemoryDatabase {
        rows: vec![
            article("1", "Heart Disease Prevention", 92),
            article("2", "Managing Heart Disease", 85),
            article("3", "Lung Cancer Screening", 40),
        ],
    });
    let cache = Arc::new(InMemoryCache {
        store: Mutex::new(HashMap::new()),
    });

    let search = SmartSearch::new(SmartSearchConfig::default(), database, Some(cache));

    let request = SearchRequest::new("heart disease");
    let first = search.search(request.clone()).await.expect("search failed");
    println!(
        "first call: {} results, cache_hit={}, strategy={:?}",
        first.results.len(),
        first.performance.cache_hit,
        first.strategy
    );

    let second = search.search(request).await.expect("search failed");
    println!(
        "second call: {} results, cache_hit={}",
        second.results.len(),
        second.performance.cache_hit
    );

    let snapshot = search.stats();
    println!(
        "stats: searches={} cache_hits={} database_queries={}",
        snapshot.searches_total, snapshot.cache_hits_total, snapshot.database_queries_total
    );
}
