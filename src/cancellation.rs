//! Minimal cancellation handle for in-flight `search()` calls (spec.md §5).
//!
//! The teacher's dependency table has no existing cancellation-token crate to
//! ground this on (no `tokio-util`), so rather than pull in an ungrounded
//! dependency this crate defines its own handle: an `Arc<AtomicBool>` flag
//! plus a `tokio::sync::Notify` so callers can both poll and `await` it. See
//! DESIGN.md for the open-question resolution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cooperative cancellation signal. Cloning shares the same underlying
/// flag; cancelling any clone cancels all of them.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// A token that never cancels, for callers that don't need the feature.
    pub fn none() -> Self {
        Self::new()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel()` is called. A no-op future if already
    /// cancelled.
    ///
    /// The `Notified` future is constructed before the flag is checked, not
    /// after: `Notify::notified()` captures the current notification
    /// sequence at construction time, so a `cancel()` racing in between the
    /// construction and the `is_cancelled()` check is still observed by the
    /// subsequent `.await` instead of being missed.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_observable_via_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        token.cancel();
        handle.await.unwrap();
    }
}
