//! Cooperative cancellation token.
//!
//! The original design keyed pending cancellation requests off a process-wide
//! table indexed by thread id, with an object per thread registering and
//! unregistering itself in a critical section. §9 calls that idiomatic only
//! in a language without an explicit cancellation value to thread through a
//! call chain; here cancellation is a `CancelToken` passed into whichever
//! stream or pipeline stage needs to check it, avoiding any need for a
//! global table or thread-local registration.
//!
//! A token can be cloned cheaply (it is a thin handle over a shared atomic)
//! and shared across the worker threads of the parallel compressor; any
//! clone observes a request raised through any other clone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::{CancelKind, Error, Result};

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    immediate: AtomicBool,
    user_requested: AtomicBool,
    flag: AtomicU64,
    block_delayed: AtomicBool,
}

/// A cloneable handle to a single operation's cancellation state.
///
/// Call [`CancelToken::check`] at the tight-loop checkpoints a long-running
/// operation defines (per compressed block, per slice, per directory entry);
/// it returns `Err(Error::ThreadCancel { .. })` once a request is pending and
/// not currently blocked.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<Inner>);

impl CancelToken {
    /// Create a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// `immediate` mirrors the source distinction between a request that
    /// must interrupt the very next checkpoint and one that may be deferred
    /// while [`CancelToken::block_delayed`] is in effect. `flag` is an
    /// opaque caller-defined tag surfaced back on the resulting error,
    /// mirroring the flag the source attaches to a cancellation request.
    pub fn cancel(&self, immediate: bool, user_requested: bool, flag: u64) {
        self.0.requested.store(true, Ordering::SeqCst);
        self.0.immediate.store(immediate, Ordering::SeqCst);
        self.0.user_requested.store(user_requested, Ordering::SeqCst);
        self.0.flag.store(flag, Ordering::SeqCst);
    }

    /// Suppress delayed (non-immediate) cancellation while `mode` is `true`.
    ///
    /// An immediate cancellation request still takes effect at the next
    /// [`CancelToken::check`] regardless of this setting, matching the
    /// source's treatment of `block_delayed`.
    pub fn block_delayed(&self, mode: bool) {
        self.0.block_delayed.store(mode, Ordering::SeqCst);
    }

    /// Whether a cancellation request is currently pending, delayed or not.
    pub fn is_pending(&self) -> bool {
        self.0.requested.load(Ordering::SeqCst)
    }

    /// Check for a pending, not-currently-blocked cancellation request and
    /// clear it if one fires, mirroring `clear_pending_request` in the
    /// source: once consumed, a request does not fire a second time.
    pub fn check(&self) -> Result<()> {
        if !self.0.requested.load(Ordering::SeqCst) {
            return Ok(());
        }
        let immediate = self.0.immediate.load(Ordering::SeqCst);
        let blocked = self.0.block_delayed.load(Ordering::SeqCst);
        if immediate || !blocked {
            self.0.requested.store(false, Ordering::SeqCst);
            let kind = if immediate { CancelKind::Immediate } else { CancelKind::Delayed };
            let user_requested = self.0.user_requested.load(Ordering::SeqCst);
            let flag = self.0.flag.load(Ordering::SeqCst);
            return Err(Error::thread_cancel(kind, user_requested, format!("cancellation flag {flag}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_does_not_fire() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn immediate_cancel_fires_once() {
        let token = CancelToken::new();
        token.cancel(true, true, 42);
        assert!(token.check().is_err());
        assert!(token.check().is_ok());
    }

    #[test]
    fn delayed_cancel_is_blocked_until_unblocked() {
        let token = CancelToken::new();
        token.block_delayed(true);
        token.cancel(false, false, 0);
        assert!(token.check().is_ok());
        token.block_delayed(false);
        assert!(token.check().is_err());
    }

    #[test]
    fn clone_shares_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel(true, true, 7);
        assert!(token.check().is_err());
    }
}
