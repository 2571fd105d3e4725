//! Cooperative cancellation signal.
//!
//! [`CancelSignal`] is the cancellation source consumed by delay strategies
//! and periodic workers. Waits react to it; running code polls
//! [`CancelSignal::is_triggered`]. Triggering never interrupts code that is
//! already running.
//!
//! Signals form a tree: a [`child`](CancelSignal::child) fires when its parent
//! fires, but triggering the child leaves the parent untouched. A worker uses
//! this to stop itself without cancelling the external source it was given.

use std::fmt;

use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFutureOwned};

/// A cloneable, thread-safe cancellation signal.
///
/// All clones observe and control the same signal.
///
/// # Examples
///
/// ```rust
/// use cadence::cancel::CancelSignal;
///
/// let parent = CancelSignal::new();
/// let child = parent.child();
///
/// child.trigger();
/// assert!(child.is_triggered());
/// assert!(!parent.is_triggered());
///
/// let other_child = parent.child();
/// parent.trigger();
/// assert!(other_child.is_triggered());
/// ```
#[derive(Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers the signal and every child derived from it. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the signal (or any ancestor) has been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Creates a signal that is triggered together with `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Completes once the signal is triggered.
    pub fn cancelled(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }

    /// Returns a guard that triggers the signal when dropped.
    #[must_use]
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}

impl From<CancellationToken> for CancelSignal {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl fmt::Debug for CancelSignal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CancelSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}
