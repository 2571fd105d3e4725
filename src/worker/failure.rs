use std::sync::Arc;

use crate::error::{BoxError, PanicError, SharedError};
use crate::sink::LogSink;

/// A cycle that returned an error or panicked.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cycle {cycle} failed: {error}")]
pub struct CycleFailure {
    cycle: u64,
    consecutive: u32,
    panicked: bool,
    #[source]
    error: SharedError,
}

impl CycleFailure {
    pub(crate) fn returned(cycle: u64, consecutive: u32, error: BoxError) -> Self {
        Self {
            cycle,
            consecutive,
            panicked: false,
            error: Arc::from(error),
        }
    }

    pub(crate) fn panicked(cycle: u64, consecutive: u32, error: PanicError) -> Self {
        Self {
            cycle,
            consecutive,
            panicked: true,
            error: Arc::new(error),
        }
    }

    /// Number of the failed cycle, counting attempts from 1.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Failures in a row, including this one.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }

    /// `true` if the cycle logic panicked rather than returning an error.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        self.panicked
    }

    /// The underlying error.
    #[must_use]
    pub fn error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.error.as_ref()
    }
}

/// What the cycle loop does after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Recoverable: carry on with the next cycle.
    Continue,
    /// Fatal: record the failure and stop the worker.
    Stop,
}

/// Classifies cycle failures.
///
/// Runs synchronously on the worker's execution context, right after the
/// failing cycle and before the next delay. Closures taking a
/// `&CycleFailure` implement it too.
pub trait FailureHook: Send {
    /// Decides whether `failure` is recoverable.
    fn on_failure(&mut self, failure: &CycleFailure, sink: &dyn LogSink) -> FailureAction;
}

impl<F> FailureHook for F
where
    F: FnMut(&CycleFailure) -> FailureAction + Send,
{
    fn on_failure(&mut self, failure: &CycleFailure, _sink: &dyn LogSink) -> FailureAction {
        self(failure)
    }
}

/// Logs every failure and keeps going. The default hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAndContinue;

impl FailureHook for LogAndContinue {
    fn on_failure(&mut self, failure: &CycleFailure, sink: &dyn LogSink) -> FailureAction {
        sink.error("cycle failed, continuing", failure);
        FailureAction::Continue
    }
}

/// Treats the first failure as fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOnFailure;

impl FailureHook for StopOnFailure {
    fn on_failure(&mut self, failure: &CycleFailure, sink: &dyn LogSink) -> FailureAction {
        sink.error("cycle failed, stopping", failure);
        FailureAction::Stop
    }
}

/// Tolerates up to `limit - 1` failures in a row; the `limit`th is fatal.
#[derive(Debug, Clone, Copy)]
pub struct StopAfterConsecutive {
    limit: u32,
}

impl StopAfterConsecutive {
    /// Creates the hook; a `limit` of zero behaves like one.
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self { limit }
    }
}

impl FailureHook for StopAfterConsecutive {
    fn on_failure(&mut self, failure: &CycleFailure, sink: &dyn LogSink) -> FailureAction {
        if failure.consecutive_failures() >= self.limit {
            sink.error("consecutive failure limit reached, stopping", failure);
            FailureAction::Stop
        } else {
            sink.error("cycle failed, continuing", failure);
            FailureAction::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use rstest::rstest;

    fn failure(consecutive: u32) -> CycleFailure {
        CycleFailure::returned(7, consecutive, "backend unavailable".into())
    }

    #[rstest]
    fn failure_accessors() {
        let failure = failure(2);
        assert_eq!(failure.cycle(), 7);
        assert_eq!(failure.consecutive_failures(), 2);
        assert!(!failure.is_panic());
        assert_eq!(failure.error().to_string(), "backend unavailable");
        assert_eq!(failure.to_string(), "cycle 7 failed: backend unavailable");
    }

    #[rstest]
    fn panic_failure() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("index out of bounds");
        let failure = CycleFailure::panicked(1, 1, PanicError::from_payload(payload.as_ref()));
        assert!(failure.is_panic());
        assert!(failure.to_string().contains("index out of bounds"));
    }

    #[rstest]
    fn provided_hooks() {
        assert_eq!(LogAndContinue.on_failure(&failure(9), &NullSink), FailureAction::Continue);
        assert_eq!(StopOnFailure.on_failure(&failure(1), &NullSink), FailureAction::Stop);
    }

    #[rstest]
    #[case(1, FailureAction::Continue)]
    #[case(2, FailureAction::Continue)]
    #[case(3, FailureAction::Stop)]
    #[case(4, FailureAction::Stop)]
    fn stop_after_consecutive(#[case] consecutive: u32, #[case] expected: FailureAction) {
        let mut hook = StopAfterConsecutive::new(3);
        assert_eq!(hook.on_failure(&failure(consecutive), &NullSink), expected);
    }

    #[rstest]
    fn closures_are_hooks() {
        let mut seen = Vec::new();
        let mut hook = |failure: &CycleFailure| {
            seen.push(failure.cycle());
            FailureAction::Continue
        };
        assert_eq!(hook.on_failure(&failure(1), &NullSink), FailureAction::Continue);
        assert_eq!(seen, vec![7]);
    }
}
