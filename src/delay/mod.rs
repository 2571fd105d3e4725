//! Cancellable waits.
//!
//! A [`DelayStrategy`] waits for a duration but returns early when a
//! [`CancelSignal`] is triggered, reporting how long it actually waited.
//! Three interchangeable strategies are provided:
//!
//! - [`BlockingSleep`]: OS-level sleep in short slices, polling the signal
//!   between slices.
//! - [`CooperativeDelay`]: a tokio timer raced against the signal; usable as a
//!   future ([`CooperativeDelay::delay`]) without tying up a thread.
//! - [`PooledTimer`]: a timer task on the shared runtime fires a wait handle
//!   the caller blocks on.
//!
//! Shared guarantees:
//!
//! - an already triggered signal returns at once with `cancelled = true`;
//! - without cancellation the measured elapsed time is at least the request;
//! - after a trigger the wait returns promptly, not at the end of the period.
//!
//! # Examples
//!
//! ```rust
//! use cadence::cancel::CancelSignal;
//! use cadence::delay::{DelayKind, DelayRequest};
//! use std::time::Duration;
//!
//! let outcome = DelayRequest::new(Duration::from_millis(2), CancelSignal::new())
//!     .with_kind(DelayKind::PooledTimer)
//!     .run();
//!
//! assert!(outcome.completed());
//! assert!(outcome.elapsed() >= Duration::from_millis(2));
//! ```

mod blocking;
mod cooperative;
mod pooled;

use std::fmt;
use std::time::{Duration, Instant};

use crate::cancel::CancelSignal;

pub use blocking::BlockingSleep;
pub use cooperative::{CooperativeDelay, Delay};
pub use pooled::PooledTimer;

/// Selects one of the provided [`DelayStrategy`] implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DelayKind {
    /// [`BlockingSleep`].
    #[default]
    BlockingSleep,
    /// [`CooperativeDelay`].
    CooperativeDelay,
    /// [`PooledTimer`].
    PooledTimer,
}

impl DelayKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 3] = [Self::BlockingSleep, Self::CooperativeDelay, Self::PooledTimer];

    /// Builds a fresh strategy of this kind with default settings.
    #[must_use]
    pub fn strategy(self) -> Box<dyn DelayStrategy> {
        match self {
            Self::BlockingSleep => Box::new(BlockingSleep::new()),
            Self::CooperativeDelay => Box::new(CooperativeDelay::new()),
            Self::PooledTimer => Box::new(PooledTimer::new()),
        }
    }
}

impl fmt::Display for DelayKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BlockingSleep => "blocking_sleep",
            Self::CooperativeDelay => "cooperative_delay",
            Self::PooledTimer => "pooled_timer",
        };
        formatter.write_str(name)
    }
}

/// Result of one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayOutcome {
    elapsed: Duration,
    cancelled: bool,
}

impl DelayOutcome {
    pub(crate) fn since(started: Instant, cancelled: bool) -> Self {
        Self {
            elapsed: started.elapsed(),
            cancelled,
        }
    }

    /// Time actually spent waiting, measured with a monotonic clock.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// `true` if the wait ended because the signal was triggered.
    #[must_use]
    pub const fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// `true` if the full duration elapsed without cancellation.
    #[must_use]
    pub const fn completed(&self) -> bool {
        !self.cancelled
    }
}

/// Waits for a duration unless cancelled first.
pub trait DelayStrategy: Send + Sync + fmt::Debug {
    /// The kind this strategy implements.
    fn kind(&self) -> DelayKind;

    /// Blocks the caller until `duration` has elapsed or `signal` fires.
    fn wait(&self, duration: Duration, signal: &CancelSignal) -> DelayOutcome;
}

impl<S: DelayStrategy + ?Sized> DelayStrategy for Box<S> {
    fn kind(&self) -> DelayKind {
        (**self).kind()
    }

    fn wait(&self, duration: Duration, signal: &CancelSignal) -> DelayOutcome {
        (**self).wait(duration, signal)
    }
}

/// One wait call: a duration, the signal that may cut it short and the
/// strategy to wait with.
#[derive(Debug, Clone)]
pub struct DelayRequest {
    duration: Duration,
    signal: CancelSignal,
    kind: DelayKind,
}

impl DelayRequest {
    /// Creates a request using the default [`DelayKind`].
    #[must_use]
    pub fn new(duration: Duration, signal: CancelSignal) -> Self {
        Self {
            duration,
            signal,
            kind: DelayKind::default(),
        }
    }

    /// Selects the strategy.
    #[must_use]
    pub const fn with_kind(mut self, kind: DelayKind) -> Self {
        self.kind = kind;
        self
    }

    /// The requested duration.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// The selected strategy kind.
    #[must_use]
    pub const fn kind(&self) -> DelayKind {
        self.kind
    }

    /// Performs the wait with a strategy built for this request alone.
    pub fn run(self) -> DelayOutcome {
        let strategy = self.kind.strategy();
        strategy.wait(self.duration, &self.signal)
    }
}
