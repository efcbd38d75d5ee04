//! Circuit breaker (spec.md §4.2).
//!
//! State machine shape — closed/open/half-open, with transition helpers
//! named `transition_to_*` — is grounded on `api::gateway::CircuitBreaker` in
//! the teacher repo. Generalized here in two ways the teacher's version
//! doesn't need: a bounded number of concurrent half-open probe tokens
//! (the teacher grants unlimited half-open traffic; spec.md §4.2 requires
//! `allow()` to atomically hand out at most `halfOpenProbes` grants), and the
//! `allow()`/`record_success()`/`record_failure()` vocabulary spec.md names.
//! The half-open success count needed to close (spec.md §4.2: "all
//! successes → closed") mirrors the `successes`/`success_threshold` counter
//! in the teacher's `CircuitBreaker`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::config::BreakerConfig;

/// Observable state of one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

/// Point-in-time observation of a breaker (spec.md §3 `BreakerState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerState {
    pub state: State,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
    pub threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_probes: u32,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Tracks one backend's health via a closed/open/half-open state machine.
///
/// Safe under concurrent callers: `allow`/`record_success`/`record_failure`
/// take a short `parking_lot::RwLock` critical section, and the open→
/// half-open token grant uses an atomic counter so at most
/// `config.half_open_probes` concurrent callers observe `true` per recovery
/// window (spec.md §4.2 concurrency requirement).
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: RwLock<Inner>,
    half_open_tokens_remaining: AtomicU32,
    half_open_successes: AtomicU32,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
            half_open_tokens_remaining: AtomicU32::new(0),
            half_open_successes: AtomicU32::new(0),
        }
    }

    /// May the caller proceed?
    ///
    /// - closed: always `true`.
    /// - open: `true` only once `recovery_timeout` has elapsed since
    ///   `opened_at`; that call atomically transitions to half-open and
    ///   grants up to `half_open_probes` tokens, only the first
    ///   `half_open_probes` concurrent callers after that instant see
    ///   `true`.
    /// - half-open: `true` while probe tokens remain.
    pub fn allow(&self) -> bool {
        let state = self.inner.read().state;
        match state {
            State::Closed => true,
            State::Open => {
                let should_transition = {
                    let inner = self.inner.read();
                    matches!(inner.opened_at, Some(t) if t.elapsed() >= self.config.recovery_timeout)
                };
                if !should_transition {
                    return false;
                }
                // Re-check under the write lock: only the caller that wins
                // the transition race grants tokens.
                let mut inner = self.inner.write();
                if inner.state != State::Open {
                    // Someone else already transitioned; fall through to the
                    // half-open token path below.
                    drop(inner);
                    return self.take_half_open_token();
                }
                let still_due = matches!(inner.opened_at, Some(t) if t.elapsed() >= self.config.recovery_timeout);
                if !still_due {
                    return false;
                }
                inner.state = State::HalfOpen;
                inner.opened_at = None;
                drop(inner);
                tracing::info!("circuit breaker transitioning to HALF-OPEN");
                self.half_open_successes.store(0, Ordering::SeqCst);
                self.half_open_tokens_remaining
                    .store(self.config.half_open_probes, Ordering::SeqCst);
                self.take_half_open_token()
            }
            State::HalfOpen => self.take_half_open_token(),
        }
    }

    fn take_half_open_token(&self) -> bool {
        loop {
            let remaining = self.half_open_tokens_remaining.load(Ordering::SeqCst);
            if remaining == 0 {
                return false;
            }
            if self
                .half_open_tokens_remaining
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Record a successful backend operation.
    pub fn record_success(&self) {
        let mut inner = self.inner.write();
        match inner.state {
            State::Closed => {
                inner.consecutive_failures = 0;
            }
            State::HalfOpen => {
                let successes = self.half_open_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.half_open_probes {
                    tracing::info!("circuit breaker transitioning to CLOSED");
                    inner.state = State::Closed;
                    inner.consecutive_failures = 0;
                    inner.opened_at = None;
                }
            }
            State::Open => {}
        }
    }

    /// Record a failed backend operation.
    pub fn record_failure(&self) {
        let mut inner = self.inner.write();
        match inner.state {
            State::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.threshold {
                    tracing::warn!(
                        threshold = self.config.threshold,
                        "circuit breaker transitioning to OPEN"
                    );
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            State::HalfOpen => {
                tracing::warn!("half-open probe failed, circuit breaker transitioning to OPEN");
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
                inner.consecutive_failures = self.config.threshold;
                self.half_open_tokens_remaining.store(0, Ordering::SeqCst);
                self.half_open_successes.store(0, Ordering::SeqCst);
            }
            State::Open => {}
        }
    }

    /// Observation snapshot of current state.
    pub fn state(&self) -> BreakerState {
        let inner = self.inner.read();
        BreakerState {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            opened_at: inner.opened_at,
            threshold: self.config.threshold,
            recovery_timeout: self.config.recovery_timeout,
            half_open_probes: self.config.half_open_probes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn breaker(threshold: u32, recovery: Duration, probes: u32) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            threshold,
            recovery_timeout: recovery,
            half_open_probes: probes,
        })
    }

    #[test]
    fn starts_closed_and_allows() {
        let cb = breaker(3, Duration::from_millis(10), 1);
        assert_eq!(cb.state().state, State::Closed);
        assert!(cb.allow());
    }

    #[test]
    fn opens_after_threshold_failures() {
        let cb = breaker(3, Duration::from_secs(60), 1);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state().state, State::Closed);
        cb.record_failure();
        assert_eq!(cb.state().state, State::Open);
        assert!(!cb.allow());
    }

    #[test]
    fn success_resets_failure_count_in_closed_state() {
        let cb = breaker(3, Duration::from_secs(60), 1);
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.state().consecutive_failures, 0);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state().state, State::Closed);
    }

    #[test]
    fn transitions_to_half_open_after_recovery_timeout() {
        let cb = breaker(1, Duration::from_millis(20), 1);
        cb.record_failure();
        assert_eq!(cb.state().state, State::Open);
        assert!(!cb.allow());
        thread::sleep(Duration::from_millis(30));
        assert!(cb.allow());
        assert_eq!(cb.state().state, State::HalfOpen);
    }

    #[test]
    fn half_open_probe_tokens_are_bounded() {
        let cb = breaker(1, Duration::from_millis(10), 2);
        cb.record_failure();
        thread::sleep(Duration::from_millis(15));
        assert!(cb.allow()); // token 1
        assert!(cb.allow()); // token 2
        assert!(!cb.allow()); // exhausted
    }

    #[test]
    fn half_open_success_closes_breaker() {
        let cb = breaker(1, Duration::from_millis(10), 1);
        cb.record_failure();
        thread::sleep(Duration::from_millis(15));
        assert!(cb.allow());
        cb.record_success();
        assert_eq!(cb.state().state, State::Closed);
        assert!(cb.allow());
    }

    #[test]
    fn half_open_stays_open_until_all_probes_succeed() {
        let cb = breaker(1, Duration::from_millis(10), 2);
        cb.record_failure();
        thread::sleep(Duration::from_millis(15));
        assert!(cb.allow()); // token 1
        assert!(cb.allow()); // token 2
        cb.record_success();
        assert_eq!(cb.state().state, State::HalfOpen, "one of two probes succeeded, not yet closed");
        cb.record_success();
        assert_eq!(cb.state().state, State::Closed);
    }

    #[test]
    fn half_open_failure_reopens_breaker() {
        let cb = breaker(1, Duration::from_millis(10), 1);
        cb.record_failure();
        thread::sleep(Duration::from_millis(15));
        assert!(cb.allow());
        cb.record_failure();
        assert_eq!(cb.state().state, State::Open);
        assert!(!cb.allow());
    }
}
