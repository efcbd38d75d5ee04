//! Strategy selector (spec.md §4.4): pure decision table mapping request +
//! backend health + breaker state to an execution plan. No I/O; must
//! complete in sub-millisecond time, so it only ever reads already-cached
//! state passed in by the orchestrator.

use crate::model::{DataPath, HealthSnapshot, Strategy};

/// Inputs the selector needs to decide a strategy for one request.
pub struct SelectorInput<'a> {
    /// Per-request override of cache participation (`None` = use default).
    pub request_cache_enabled: Option<bool>,
    /// The host's configured default cache participation (spec.md §6
    /// `cacheEnabled`), used when the request doesn't override it.
    pub default_cache_enabled: bool,
    /// Whether a cache backend is configured at all.
    pub cache_configured: bool,
    pub cache_breaker_open: bool,
    pub database_breaker_open: bool,
    pub cache_health: Option<&'a HealthSnapshot>,
    /// The host's configured fallback default (spec.md §6 `fallback`),
    /// used for the "Otherwise" row of the decision table.
    pub default_fallback: DataPath,
}

/// Evaluate the decision table top-down; first match wins.
pub fn select(input: &SelectorInput) -> Strategy {
    if !input.request_cache_enabled.unwrap_or(input.default_cache_enabled) {
        return Strategy {
            primary: DataPath::Database,
            fallback: None,
            reason: "forced-database",
        };
    }

    if !input.cache_configured {
        return Strategy {
            primary: DataPath::Database,
            fallback: None,
            reason: "no-cache-configured",
        };
    }

    if input.cache_breaker_open {
        return Strategy {
            primary: DataPath::Database,
            fallback: None,
            reason: "breaker-open",
        };
    }

    let cache_connected = input.cache_health.map(|h| h.is_connected).unwrap_or(false);
    if !cache_connected {
        return Strategy {
            primary: DataPath::Database,
            fallback: Some(DataPath::Cache),
            reason: "cache-unhealthy",
        };
    }

    if input.database_breaker_open {
        return Strategy {
            primary: DataPath::Cache,
            fallback: None,
            reason: "database-breaker-open",
        };
    }

    Strategy {
        primary: DataPath::Cache,
        fallback: Some(input.default_fallback),
        reason: "cache-healthy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> HealthSnapshot {
        HealthSnapshot::healthy(1)
    }

    fn unhealthy() -> HealthSnapshot {
        HealthSnapshot::unhealthy("down")
    }

    #[test]
    fn forced_database_wins_over_everything() {
        let health = healthy();
        let input = SelectorInput {
            request_cache_enabled: Some(false),
            default_cache_enabled: true,
            cache_configured: true,
            cache_breaker_open: false,
            database_breaker_open: false,
            cache_health: Some(&health),
            default_fallback: DataPath::Database,
        };
        let s = select(&input);
        assert_eq!(s.primary, DataPath::Database);
        assert_eq!(s.fallback, None);
        assert_eq!(s.reason, "forced-database");
    }

    #[test]
    fn host_default_disabled_forces_database_without_request_override() {
        let health = healthy();
        let input = SelectorInput {
            request_cache_enabled: None,
            default_cache_enabled: false,
            cache_configured: true,
            cache_breaker_open: false,
            database_breaker_open: false,
            cache_health: Some(&health),
            default_fallback: DataPath::Database,
        };
        let s = select(&input);
        assert_eq!(s.primary, DataPath::Database);
        assert_eq!(s.fallback, None);
        assert_eq!(s.reason, "forced-database");
    }

    #[test]
    fn request_override_enables_cache_despite_host_default_disabled() {
        let health = healthy();
        let input = SelectorInput {
            request_cache_enabled: Some(true),
            default_cache_enabled: false,
            cache_configured: true,
            cache_breaker_open: false,
            database_breaker_open: false,
            cache_health: Some(&health),
            default_fallback: DataPath::Database,
        };
        let s = select(&input);
        assert_eq!(s.primary, DataPath::Cache);
    }

    #[test]
    fn no_cache_configured() {
        let input = SelectorInput {
            request_cache_enabled: None,
            default_cache_enabled: true,
            cache_configured: false,
            cache_breaker_open: false,
            database_breaker_open: false,
            cache_health: None,
            default_fallback: DataPath::Database,
        };
        let s = select(&input);
        assert_eq!(s.primary, DataPath::Database);
        assert_eq!(s.reason, "no-cache-configured");
    }

    #[test]
    fn cache_breaker_open_forces_database() {
        let health = healthy();
        let input = SelectorInput {
            request_cache_enabled: None,
            default_cache_enabled: true,
            cache_configured: true,
            cache_breaker_open: true,
            database_breaker_open: false,
            cache_health: Some(&health),
            default_fallback: DataPath::Database,
        };
        let s = select(&input);
        assert_eq!(s.primary, DataPath::Database);
        assert_eq!(s.fallback, None);
        assert_eq!(s.reason, "breaker-open");
    }

    #[test]
    fn cache_unhealthy_falls_back_to_cache_on_recovery() {
        let health = unhealthy();
        let input = SelectorInput {
            request_cache_enabled: None,
            default_cache_enabled: true,
            cache_configured: true,
            cache_breaker_open: false,
            database_breaker_open: false,
            cache_health: Some(&health),
            default_fallback: DataPath::Database,
        };
        let s = select(&input);
        assert_eq!(s.primary, DataPath::Database);
        assert_eq!(s.fallback, Some(DataPath::Cache));
        assert_eq!(s.reason, "cache-unhealthy");
    }

    #[test]
    fn database_breaker_open_and_cache_healthy_prefers_cache_only() {
        let health = healthy();
        let input = SelectorInput {
            request_cache_enabled: None,
            default_cache_enabled: true,
            cache_configured: true,
            cache_breaker_open: false,
            database_breaker_open: true,
            cache_health: Some(&health),
            default_fallback: DataPath::Database,
        };
        let s = select(&input);
        assert_eq!(s.primary, DataPath::Cache);
        assert_eq!(s.fallback, None);
        assert_eq!(s.reason, "database-breaker-open");
    }

    #[test]
    fn default_case_is_cache_with_database_fallback() {
        let health = healthy();
        let input = SelectorInput {
            request_cache_enabled: None,
            default_cache_enabled: true,
            cache_configured: true,
            cache_breaker_open: false,
            database_breaker_open: false,
            cache_health: Some(&health),
            default_fallback: DataPath::Database,
        };
        let s = select(&input);
        assert_eq!(s.primary, DataPath::Cache);
        assert_eq!(s.fallback, Some(DataPath::Database));
        assert_eq!(s.reason, "cache-healthy");
    }
}
