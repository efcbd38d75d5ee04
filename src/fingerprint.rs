//! Deterministic cache key derivation (spec.md §4.1).
//!
//! Produces a namespaced, sanitized, length-bounded string that is identical
//! for semantically equivalent requests and distinct for any material
//! difference. Grounded on the teacher's `CacheKeyBuilder`
//! (`database::cache::CacheKeyBuilder`) for the namespacing/joining idiom,
//! generalized to hash a canonicalized request instead of joining raw parts.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::model::{FilterValue, SearchOptions, SearchRequest};

const NAMESPACE: &str = "search:v1:";
const MAX_KEY_LEN: usize = 249;

/// Normalize the query: trim, collapse internal whitespace, lower-case.
fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Render options into a canonical string: sorted filter keys, sorted filter
/// value sets, fields equal to their default omitted.
fn canonicalize_options(options: &SearchOptions) -> String {
    let defaults = SearchOptions::default();
    let mut parts = Vec::new();

    if options.limit != defaults.limit {
        parts.push(format!("limit={}", options.limit));
    }
    if options.offset != defaults.offset {
        parts.push(format!("offset={}", options.offset));
    }
    if options.sort_by != defaults.sort_by {
        parts.push(format!("sort_by={:?}", options.sort_by));
    }
    if options.sort_order != defaults.sort_order {
        parts.push(format!("sort_order={:?}", options.sort_order));
    }

    let mut filter_keys: Vec<&String> = options.filters.keys().collect();
    filter_keys.sort();
    for key in filter_keys {
        let value = &options.filters[key];
        match value {
            FilterValue::Values(set) => {
                // BTreeSet iterates in sorted order already.
                let joined = set.iter().cloned().collect::<Vec<_>>().join(",");
                parts.push(format!("filter.{}=[{}]", key, joined));
            }
            FilterValue::DateRange { from, to } => {
                parts.push(format!(
                    "filter.{}=range({:?},{:?})",
                    key,
                    from.map(system_time_secs),
                    to.map(system_time_secs)
                ));
            }
        }
    }

    parts.join("&")
}

fn system_time_secs(t: std::time::SystemTime) -> u64 {
    t.duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Extract a short result-type tag for the namespace prefix, if the request
/// filters on a single-valued `type` field — eases pattern-based
/// invalidation per spec.md §4.1 step 4.
fn type_tag(options: &SearchOptions) -> Option<String> {
    match options.filters.get("type") {
        Some(FilterValue::Values(set)) if set.len() == 1 => {
            Some(sanitize(set.iter().next().unwrap()))
        }
        _ => None,
    }
}

/// Strip whitespace, restrict to `[A-Za-z0-9:_\-.]`, used for the optional
/// type tag embedded in the key prefix.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.'))
        .collect()
}

/// Compute the deterministic cache key for a request.
///
/// `fingerprint(a) == fingerprint(b)` iff `a` and `b` normalize to the same
/// canonical form (spec.md §8 invariant 1).
pub fn fingerprint(request: &SearchRequest) -> String {
    let canonical = format!(
        "{}|{}",
        normalize_query(&request.query),
        canonicalize_options(&request.options)
    );

    let digest = Sha256::digest(canonical.as_bytes());
    let mut hex_digest = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex_digest, "{:02x}", byte);
    }

    let mut key = String::with_capacity(NAMESPACE.len() + 16 + hex_digest.len());
    key.push_str(NAMESPACE);
    if let Some(tag) = type_tag(&request.options) {
        key.push_str(&tag);
        key.push(':');
    }
    key.push_str(&hex_digest);

    truncate(&sanitize(&key))
}

fn truncate(key: &str) -> String {
    if key.len() <= MAX_KEY_LEN {
        key.to_string()
    } else {
        key.chars().take(MAX_KEY_LEN).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn req(query: &str) -> SearchRequest {
        SearchRequest::new(query)
    }

    #[test]
    fn identical_requests_fingerprint_equal() {
        assert_eq!(fingerprint(&req("heart disease")), fingerprint(&req("heart disease")));
    }

    #[test]
    fn whitespace_and_case_are_normalized() {
        let a = req("  Heart   Disease ");
        let b = req("heart disease");
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn different_queries_fingerprint_differently() {
        assert_ne!(fingerprint(&req("heart disease")), fingerprint(&req("lung disease")));
    }

    #[test]
    fn filter_set_reordering_is_stable() {
        let mut a = req("q");
        a.options.filters.insert(
            "category".into(),
            FilterValue::Values(BTreeSet::from(["b".to_string(), "a".to_string()])),
        );
        let mut b = req("q");
        b.options.filters.insert(
            "category".into(),
            FilterValue::Values(BTreeSet::from(["a".to_string(), "b".to_string()])),
        );
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn defaults_are_omitted_from_canonical_form() {
        let a = req("q");
        let mut b = req("q");
        b.options.limit = 20; // equals default
        b.options.offset = 0; // equals default
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn non_default_limit_changes_fingerprint() {
        let a = req("q");
        let mut b = req("q");
        b.options.limit = 50;
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn key_is_bounded_and_namespaced() {
        let key = fingerprint(&req("q"));
        assert!(key.starts_with("search:v1:"));
        assert!(key.len() <= 200);
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.')));
    }
}
