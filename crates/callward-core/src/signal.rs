//! Cancellable, deadline-bearing call signals.
//!
//! A [`CallSignal`] is the per-call handle every stage of the pipeline
//! consults. Signals form a tree: killing a signal kills every signal
//! derived from it, and a derived signal never outlives its parent's
//! deadline.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why a signal stopped being live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SignalError {
    /// The signal, or one of its ancestors, was cancelled explicitly.
    #[error("context canceled")]
    Cancelled,
    /// The signal's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellable handle with an optional deadline.
///
/// Cloning is cheap and every clone observes the same state. Use
/// [`child`](Self::child), [`with_timeout`](Self::with_timeout) or
/// [`with_deadline`](Self::with_deadline) to derive a new node in the tree.
#[derive(Clone)]
pub struct CallSignal {
    inner: Arc<Inner>,
}

struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    reason: OnceLock<SignalError>,
    parent: Option<CallSignal>,
}

impl CallSignal {
    /// Creates a live root signal with no deadline.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                deadline: None,
                reason: OnceLock::new(),
                parent: None,
            }),
        }
    }

    /// Derives a signal that shares this signal's deadline.
    pub fn child(&self) -> Self {
        self.derive(self.inner.deadline)
    }

    /// Derives a signal that expires `timeout` from now, or at the parent's
    /// deadline if that comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// Derives a signal that expires at `deadline`, or at the parent's
    /// deadline if that comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        self.derive(Some(deadline))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: self.inner.token.child_token(),
                deadline,
                reason: OnceLock::new(),
                parent: Some(self.clone()),
            }),
        }
    }

    /// The instant at which this signal expires, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns `true` while the signal has been neither cancelled nor expired.
    pub fn is_live(&self) -> bool {
        self.error().is_none()
    }

    /// The recorded reason this signal is dead, or `None` while it is live.
    ///
    /// Never blocks.
    pub fn error(&self) -> Option<SignalError> {
        if let Some(reason) = self.inner.reason.get() {
            return Some(*reason);
        }
        if self.inner.token.is_cancelled() {
            let inherited = self.inner.parent.as_ref().and_then(CallSignal::error);
            return Some(inherited.unwrap_or(SignalError::Cancelled));
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(SignalError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Cancels this signal and everything derived from it.
    ///
    /// Idempotent. A signal that already died keeps its original reason.
    pub fn cancel(&self) {
        self.kill(SignalError::Cancelled);
    }

    /// Marks this signal as expired, regardless of its deadline.
    pub fn expire(&self) {
        self.kill(SignalError::DeadlineExceeded);
    }

    fn kill(&self, reason: SignalError) {
        let reason = self.error().unwrap_or(reason);
        let _ = self.inner.reason.set(reason);
        self.inner.token.cancel();
    }

    /// Resolves once the signal is dead and yields the reason.
    ///
    /// Reaching the deadline records [`SignalError::DeadlineExceeded`] and
    /// propagates to derived signals.
    pub async fn dead(&self) -> SignalError {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.inner.token.cancelled() => {}
                    _ = sleep_until(deadline) => self.expire(),
                }
            }
            None => self.inner.token.cancelled().await,
        }
        self.error().unwrap_or(SignalError::Cancelled)
    }

    /// Returns a guard that cancels this signal when dropped.
    pub fn guard(&self) -> SignalGuard {
        SignalGuard {
            signal: self.clone(),
        }
    }

    /// The underlying cancellation token, for handing to code that only
    /// understands `tokio-util` tokens.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }
}

impl Default for CallSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSignal")
            .field("deadline", &self.inner.deadline)
            .field("error", &self.error())
            .finish()
    }
}

/// Cancels its signal on drop.
///
/// Held by whoever derived a signal, so the derived signal is released on
/// every exit path.
#[derive(Debug)]
#[must_use = "the signal is cancelled as soon as the guard is dropped"]
pub struct SignalGuard {
    signal: CallSignal,
}

impl SignalGuard {
    /// The guarded signal.
    pub fn signal(&self) -> &CallSignal {
        &self.signal
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.signal.cancel();
    }
}
