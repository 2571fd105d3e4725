use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use pin_project_lite::pin_project;
use tokio::time::Sleep;
use tokio_util::sync::WaitForCancellationFutureOwned;

use super::{BlockingSleep, DelayKind, DelayOutcome, DelayStrategy};
use crate::cancel::CancelSignal;
use crate::runtime;

/// Suspends without holding a thread, on the tokio timer.
///
/// Async callers await [`CooperativeDelay::delay`] directly. The synchronous
/// [`DelayStrategy::wait`] drives the same future through
/// [`runtime::try_run_blocking`]; from inside a current-thread runtime, where
/// that is impossible, it degrades to [`BlockingSleep`].
///
/// # Examples
///
/// ```rust
/// use cadence::cancel::CancelSignal;
/// use cadence::delay::CooperativeDelay;
/// use std::time::Duration;
///
/// # cadence::runtime::global().block_on(async {
/// let signal = CancelSignal::new();
/// let outcome = CooperativeDelay::delay(Duration::from_millis(2), &signal).await;
/// assert!(outcome.elapsed() >= Duration::from_millis(2));
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CooperativeDelay {
    fallback: BlockingSleep,
}

impl CooperativeDelay {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fallback: BlockingSleep::new(),
        }
    }

    /// Returns a future resolving after `duration` or when `signal` fires.
    ///
    /// # Panics
    ///
    /// Must be called within a tokio runtime with the time driver enabled.
    pub fn delay(duration: Duration, signal: &CancelSignal) -> Delay {
        Delay {
            started: Instant::now(),
            cancelled: signal.cancelled(),
            sleep: tokio::time::sleep(duration),
        }
    }
}

impl DelayStrategy for CooperativeDelay {
    fn kind(&self) -> DelayKind {
        DelayKind::CooperativeDelay
    }

    fn wait(&self, duration: Duration, signal: &CancelSignal) -> DelayOutcome {
        let started = Instant::now();
        if signal.is_triggered() {
            return DelayOutcome::since(started, true);
        }

        match runtime::try_run_blocking(async { Self::delay(duration, signal).await }) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::debug!(%error, "cooperative delay falling back to blocking sleep");
                let rest = self.fallback.wait(duration.saturating_sub(started.elapsed()), signal);
                DelayOutcome::since(started, rest.was_cancelled())
            }
        }
    }
}

pin_project! {
    /// Future returned by [`CooperativeDelay::delay`].
    #[must_use = "futures do nothing unless polled"]
    pub struct Delay {
        started: Instant,
        #[pin]
        cancelled: WaitForCancellationFutureOwned,
        #[pin]
        sleep: Sleep,
    }
}

impl Future for Delay {
    type Output = DelayOutcome;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if this.cancelled.poll(context).is_ready() {
            return Poll::Ready(DelayOutcome::since(*this.started, true));
        }
        if this.sleep.poll(context).is_ready() {
            return Poll::Ready(DelayOutcome::since(*this.started, false));
        }
        Poll::Pending
    }
}
