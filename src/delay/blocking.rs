use std::thread;
use std::time::{Duration, Instant};

use super::{DelayKind, DelayOutcome, DelayStrategy};
use crate::cancel::CancelSignal;

/// Suspends the calling thread with `std::thread::sleep`.
///
/// The sleep is cut into slices no longer than the granularity and the signal
/// is checked between slices, so cancellation is noticed within one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingSleep {
    granularity: Duration,
}

impl BlockingSleep {
    /// Slice length used by [`BlockingSleep::new`].
    pub const DEFAULT_GRANULARITY: Duration = Duration::from_millis(10);

    /// Creates a strategy with [`Self::DEFAULT_GRANULARITY`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            granularity: Self::DEFAULT_GRANULARITY,
        }
    }

    /// Creates a strategy with the given slice length (at least 1ms).
    #[must_use]
    pub fn with_granularity(granularity: Duration) -> Self {
        Self {
            granularity: granularity.max(Duration::from_millis(1)),
        }
    }

    /// The upper bound on cancellation latency.
    #[must_use]
    pub const fn granularity(&self) -> Duration {
        self.granularity
    }
}

impl Default for BlockingSleep {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayStrategy for BlockingSleep {
    fn kind(&self) -> DelayKind {
        DelayKind::BlockingSleep
    }

    fn wait(&self, duration: Duration, signal: &CancelSignal) -> DelayOutcome {
        let started = Instant::now();
        loop {
            if signal.is_triggered() {
                return DelayOutcome::since(started, true);
            }
            let elapsed = started.elapsed();
            if elapsed >= duration {
                return DelayOutcome::since(started, false);
            }
            thread::sleep((duration - elapsed).min(self.granularity));
        }
    }
}
