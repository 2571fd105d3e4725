//! Periodic background workers.
//!
//! A [`PeriodicWorker`] owns one dedicated execution context that repeatedly
//! runs user-supplied cycle logic and then waits, via a
//! [`DelayStrategy`], until the next period starts.
//!
//! # Lifecycle
//!
//! See [`WorkerState`]. [`start`](PeriodicWorker::start) is valid only once,
//! from `Created`; calling it again is a usage error.
//! [`stop`](PeriodicWorker::stop) is idempotent and a no-op before `start`.
//!
//! # Cycle loop
//!
//! - The first cycle runs as soon as the worker starts.
//! - After each cycle the loop waits out the rest of the period, so the
//!   period is measured from the start of one cycle to the start of the next.
//!   A cycle that overruns the period is followed immediately by the next.
//! - Cycles never overlap, and a stop request never interrupts a running
//!   cycle; it cuts the current wait short and prevents the next cycle.
//! - Errors and panics from the cycle logic go to the [`FailureHook`], which
//!   decides whether the worker continues or stops.
//!
//! # Examples
//!
//! ```rust
//! use cadence::worker::{PeriodicWorker, WorkerConfig, WorkerState};
//! use std::time::Duration;
//!
//! let worker = PeriodicWorker::new(
//!     WorkerConfig::new("heartbeat", Duration::from_millis(10)),
//!     |context| {
//!         assert!(context.cycle() >= 1);
//!         Ok(())
//!     },
//! )?;
//!
//! worker.start()?;
//! std::thread::sleep(Duration::from_millis(50));
//! worker.stop()?;
//!
//! assert_eq!(worker.state(), WorkerState::Stopped);
//! assert!(worker.cycles() > 0);
//! # Ok::<(), cadence::Error>(())
//! ```

mod config;
mod context;
mod failure;
mod state;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::atomic::AtomicValue;
use crate::cancel::CancelSignal;
use crate::delay::DelayStrategy;
use crate::error::{BoxError, Error, PanicError, Result};
use crate::sink::{LogSink, TracingSink};

pub use config::{WorkerConfig, WorkerPriority};
pub use context::{ContextBody, ExecutionContext, ThreadContext};
pub use failure::{
    CycleFailure, FailureAction, FailureHook, LogAndContinue, StopAfterConsecutive, StopOnFailure,
};
pub use state::WorkerState;

use state::StateCell;

type CycleFn = Box<dyn FnMut(&CycleContext<'_>) -> Result<(), BoxError> + Send>;

/// What the cycle logic can see about the cycle it is running.
#[derive(Debug)]
pub struct CycleContext<'a> {
    name: &'a str,
    cycle: u64,
    signal: &'a CancelSignal,
}

impl CycleContext<'_> {
    /// Name of the worker.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name
    }

    /// Number of this cycle attempt, starting at 1.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// `true` once the worker has been asked to stop. Long cycles may poll it.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.signal.is_triggered()
    }

    /// Asks the worker to stop after this cycle.
    pub fn request_stop(&self) {
        self.signal.trigger();
    }

    /// The worker's cancellation signal.
    #[must_use]
    pub const fn signal(&self) -> &CancelSignal {
        self.signal
    }
}

/// State shared between the worker handle, its cycle loop and observers.
#[derive(Debug)]
struct Shared {
    name: String,
    state: StateCell,
    cycles: AtomicValue<u64>,
    failures: AtomicValue<u64>,
    last_failure: Mutex<Option<CycleFailure>>,
    exited: Mutex<bool>,
    exited_condvar: Condvar,
}

impl Shared {
    fn mark_exited(&self) {
        let mut exited = self.exited.lock();
        *exited = true;
        self.exited_condvar.notify_all();
    }

    /// Waits for the cycle loop to exit. A timeout too large to express as a
    /// deadline waits without one.
    fn wait_exited(&self, timeout: Duration) -> bool {
        let mut exited = self.exited.lock();
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            while !*exited {
                self.exited_condvar.wait(&mut exited);
            }
            return true;
        };
        while !*exited {
            if self
                .exited_condvar
                .wait_until(&mut exited, deadline)
                .timed_out()
            {
                return *exited;
            }
        }
        true
    }
}

/// Parts handed over to the cycle loop when the worker starts.
struct Parts {
    cycle: CycleFn,
    delay: Box<dyn DelayStrategy>,
    hook: Box<dyn FailureHook>,
}

/// A background worker running cycle logic once per period.
///
/// All lifecycle methods take `&self`, so a worker can be shared behind an
/// [`Arc`]. Dropping a running worker requests a stop without waiting.
pub struct PeriodicWorker {
    config: WorkerConfig,
    shared: Arc<Shared>,
    signal: CancelSignal,
    sink: Arc<dyn LogSink>,
    context: Arc<dyn ExecutionContext>,
    parts: Mutex<Option<Parts>>,
}

impl PeriodicWorker {
    /// Creates a worker in the `Created` state.
    ///
    /// Defaults: the delay strategy named by `config.delay`, the
    /// [`LogAndContinue`] hook, the [`TracingSink`] and a [`ThreadContext`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new<F>(config: WorkerConfig, cycle: F) -> Result<Self>
    where
        F: FnMut(&CycleContext<'_>) -> Result<(), BoxError> + Send + 'static,
    {
        config.validate()?;
        let shared = Arc::new(Shared {
            name: config.name.clone(),
            state: StateCell::new(WorkerState::Created),
            cycles: AtomicValue::new(0),
            failures: AtomicValue::new(0),
            last_failure: Mutex::new(None),
            exited: Mutex::new(false),
            exited_condvar: Condvar::new(),
        });
        let parts = Parts {
            cycle: Box::new(cycle),
            delay: config.delay.strategy(),
            hook: Box::new(LogAndContinue),
        };

        Ok(Self {
            config,
            shared,
            signal: CancelSignal::new(),
            sink: Arc::new(TracingSink),
            context: Arc::new(ThreadContext::new()),
            parts: Mutex::new(Some(parts)),
        })
    }

    /// Links the worker to an external cancellation source: triggering
    /// `source` stops the worker, while stopping the worker leaves `source`
    /// untouched.
    #[must_use]
    pub fn with_cancel_source(mut self, source: &CancelSignal) -> Self {
        self.signal = source.child();
        self
    }

    /// Replaces the failure hook.
    #[must_use]
    pub fn with_failure_hook(self, hook: impl FailureHook + 'static) -> Self {
        if let Some(parts) = self.parts.lock().as_mut() {
            parts.hook = Box::new(hook);
        }
        self
    }

    /// Replaces the delay strategy chosen by the configuration.
    #[must_use]
    pub fn with_delay_strategy(self, strategy: impl DelayStrategy + 'static) -> Self {
        if let Some(parts) = self.parts.lock().as_mut() {
            parts.delay = Box::new(strategy);
        }
        self
    }

    /// Replaces the logging sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the execution context.
    #[must_use]
    pub fn with_context(mut self, context: Arc<dyn ExecutionContext>) -> Self {
        self.context = context;
        self
    }

    /// Starts the cycle loop on a dedicated execution context and returns
    /// without waiting for any cycle.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidStateTransition`] unless the worker is `Created`.
    /// - [`Error::Spawn`] if the execution context could not be created; the
    ///   worker is then `Stopped`.
    pub fn start(&self) -> Result<()> {
        if !self
            .shared
            .state
            .transition(WorkerState::Created, WorkerState::Running)
        {
            return Err(self.invalid_transition("start"));
        }
        let parts = self
            .parts
            .lock()
            .take()
            .ok_or_else(|| self.invalid_transition("start"))?;

        let cycle_loop = CycleLoop {
            shared: Arc::clone(&self.shared),
            signal: self.signal.clone(),
            sink: Arc::clone(&self.sink),
            period: self.config.period,
            parts,
        };

        match self.context.spawn(
            &self.config.name,
            self.config.priority,
            Box::new(move || cycle_loop.run()),
        ) {
            Ok(()) => {
                tracing::debug!(
                    worker = %self.config.name,
                    period_ms = self.config.period.as_millis(),
                    delay = %self.config.delay,
                    priority = %self.config.priority,
                    "worker started"
                );
                Ok(())
            }
            Err(source) => {
                self.shared.state.set(WorkerState::Stopped);
                self.shared.mark_exited();
                Err(Error::Spawn {
                    worker: self.config.name.clone(),
                    source: Arc::new(source),
                })
            }
        }
    }

    /// Stops the worker and waits, up to the configured stop timeout, for
    /// the in-flight cycle to finish.
    ///
    /// A no-op if the worker was never started or has already stopped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StopTimedOut`] if the cycle did not finish in time.
    /// The worker still reaches `Stopped` once that cycle returns.
    pub fn stop(&self) -> Result<()> {
        loop {
            let current = self.shared.state.get();
            match current {
                WorkerState::Created | WorkerState::Stopped => return Ok(()),
                WorkerState::Stopping => break,
                WorkerState::Running | WorkerState::Paused => {
                    if self
                        .shared
                        .state
                        .transition(current, WorkerState::Stopping)
                    {
                        break;
                    }
                }
            }
        }

        self.signal.trigger();
        if self.shared.wait_exited(self.config.stop_timeout) {
            Ok(())
        } else {
            Err(Error::StopTimedOut {
                worker: self.config.name.clone(),
                timeout: self.config.stop_timeout,
            })
        }
    }

    /// Suspends cycle logic while keeping the worker's cadence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] unless the worker is `Running`.
    pub fn pause(&self) -> Result<()> {
        if self
            .shared
            .state
            .transition(WorkerState::Running, WorkerState::Paused)
        {
            Ok(())
        } else {
            Err(self.invalid_transition("pause"))
        }
    }

    /// Resumes a paused worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] unless the worker is `Paused`.
    pub fn resume(&self) -> Result<()> {
        if self
            .shared
            .state
            .transition(WorkerState::Paused, WorkerState::Running)
        {
            Ok(())
        } else {
            Err(self.invalid_transition("resume"))
        }
    }

    /// Blocks until the cycle loop has exited or `timeout` elapses.
    ///
    /// Returns `true` if the worker is stopped. Never-started workers
    /// return `false` after the timeout.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        self.shared.wait_exited(timeout)
    }

    /// Name of the worker.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configuration the worker was built with.
    pub const fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.shared.state.get()
    }

    /// Number of cycles that completed successfully.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.get()
    }

    /// Number of cycles that failed.
    pub fn failures(&self) -> u64 {
        self.shared.failures.get()
    }

    /// The most recent cycle failure, recoverable or fatal.
    pub fn last_failure(&self) -> Option<CycleFailure> {
        self.shared.last_failure.lock().clone()
    }

    /// A read-only view usable from any thread.
    pub fn observer(&self) -> WorkerObserver {
        WorkerObserver {
            shared: Arc::clone(&self.shared),
        }
    }

    fn invalid_transition(&self, action: &'static str) -> Error {
        Error::InvalidStateTransition {
            worker: self.config.name.clone(),
            from: self.shared.state.get().as_str(),
            action,
        }
    }
}

impl std::fmt::Debug for PeriodicWorker {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PeriodicWorker")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("cycles", &self.cycles())
            .field("failures", &self.failures())
            .finish_non_exhaustive()
    }
}

impl Drop for PeriodicWorker {
    fn drop(&mut self) {
        let current = self.shared.state.get();
        if matches!(current, WorkerState::Running | WorkerState::Paused) {
            self.shared.state.transition(current, WorkerState::Stopping);
            self.signal.trigger();
        }
    }
}

/// Read-only view of a worker, cheap to clone and share.
#[derive(Debug, Clone)]
pub struct WorkerObserver {
    shared: Arc<Shared>,
}

impl WorkerObserver {
    /// Name of the worker.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.shared.state.get()
    }

    /// Number of cycles that completed successfully.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.get()
    }

    /// Number of cycles that failed.
    pub fn failures(&self) -> u64 {
        self.shared.failures.get()
    }

    /// The most recent cycle failure.
    pub fn last_failure(&self) -> Option<CycleFailure> {
        self.shared.last_failure.lock().clone()
    }

    /// Blocks until the worker has stopped or `timeout` elapses.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        self.shared.wait_exited(timeout)
    }
}

/// The loop body moved onto the worker's execution context.
struct CycleLoop {
    shared: Arc<Shared>,
    signal: CancelSignal,
    sink: Arc<dyn LogSink>,
    period: Duration,
    parts: Parts,
}

impl CycleLoop {
    fn run(mut self) {
        let name = self.shared.name.clone();
        self.sink.info(&format!("worker `{name}` running"));

        let mut attempts: u64 = 0;
        let mut consecutive: u32 = 0;

        loop {
            if self.signal.is_triggered() {
                break;
            }
            let started = Instant::now();
            match self.shared.state.get() {
                WorkerState::Running => {
                    attempts += 1;
                    if self.run_cycle(&name, attempts, &mut consecutive) == FailureAction::Stop {
                        break;
                    }
                }
                WorkerState::Paused => {}
                _ => break,
            }

            if self.signal.is_triggered() {
                break;
            }
            let remaining = self.period.saturating_sub(started.elapsed());
            self.parts.delay.wait(remaining, &self.signal);
        }

        self.shared.state.set(WorkerState::Stopped);
        self.shared.mark_exited();
        self.sink.info(&format!(
            "worker `{name}` stopped after {} cycles",
            self.shared.cycles.get()
        ));
    }

    fn run_cycle(&mut self, name: &str, attempt: u64, consecutive: &mut u32) -> FailureAction {
        let context = CycleContext {
            name,
            cycle: attempt,
            signal: &self.signal,
        };
        let cycle = &mut self.parts.cycle;

        let failure = match catch_unwind(AssertUnwindSafe(|| cycle(&context))) {
            Ok(Ok(())) => {
                self.shared.cycles.increment();
                *consecutive = 0;
                return FailureAction::Continue;
            }
            Ok(Err(error)) => {
                *consecutive = consecutive.saturating_add(1);
                CycleFailure::returned(attempt, *consecutive, error)
            }
            Err(payload) => {
                *consecutive = consecutive.saturating_add(1);
                CycleFailure::panicked(
                    attempt,
                    *consecutive,
                    PanicError::from_payload(payload.as_ref()),
                )
            }
        };

        self.shared.failures.increment();
        let action = self.parts.hook.on_failure(&failure, self.sink.as_ref());
        if action == FailureAction::Stop {
            self.sink
                .error(&format!("worker `{name}` stopping on fatal failure"), &failure);
        }
        *self.shared.last_failure.lock() = Some(failure);
        action
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::delay::DelayKind;
    use crate::sink::NullSink;
    use rstest::rstest;
    use std::thread;

    static_assertions::assert_impl_all!(PeriodicWorker: Send, Sync);
    static_assertions::assert_impl_all!(WorkerObserver: Send, Sync, Clone);

    fn config(period_ms: u64) -> WorkerConfig {
        WorkerConfig::new("unit", Duration::from_millis(period_ms))
    }

    #[rstest]
    fn new_rejects_invalid_config() {
        let error = PeriodicWorker::new(WorkerConfig::new("", Duration::ZERO), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(error, Error::InvalidConfig(_)));
    }

    #[rstest]
    fn created_worker_is_idle() {
        let worker = PeriodicWorker::new(config(10), |_| Ok(())).unwrap();
        assert_eq!(worker.state(), WorkerState::Created);
        assert_eq!(worker.cycles(), 0);
        assert!(worker.last_failure().is_none());
        assert_eq!(worker.name(), "unit");
    }

    #[rstest]
    fn stop_before_start_is_a_no_op() {
        let worker = PeriodicWorker::new(config(10), |_| Ok(())).unwrap();
        worker.stop().unwrap();
        assert_eq!(worker.state(), WorkerState::Created);

        worker.start().unwrap();
        worker.stop().unwrap();
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[rstest]
    fn first_cycle_runs_immediately() {
        let worker = PeriodicWorker::new(config(60_000), |_| Ok(())).unwrap();
        worker.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(worker.cycles(), 1);
        worker.stop().unwrap();
    }

    #[rstest]
    fn cycle_context_reports_numbers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let worker = PeriodicWorker::new(config(1), move |context| {
            record.lock().push((context.name().to_string(), context.cycle()));
            if context.cycle() == 3 {
                context.request_stop();
            }
            Ok(())
        })
        .unwrap()
        .with_sink(Arc::new(NullSink));

        worker.start().unwrap();
        assert!(worker.wait_stopped(Duration::from_secs(5)));

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![
                ("unit".to_string(), 1),
                ("unit".to_string(), 2),
                ("unit".to_string(), 3)
            ]
        );
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[rstest]
    fn pause_skips_cycle_logic() {
        let worker = PeriodicWorker::new(config(5), |_| Ok(()))
            .unwrap()
            .with_sink(Arc::new(NullSink));
        assert!(worker.pause().is_err());

        worker.start().unwrap();
        thread::sleep(Duration::from_millis(30));
        worker.pause().unwrap();
        thread::sleep(Duration::from_millis(20));

        let paused_at = worker.cycles();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(worker.cycles(), paused_at);
        assert_eq!(worker.state(), WorkerState::Paused);

        worker.resume().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(worker.cycles() > paused_at);

        worker.stop().unwrap();
        assert!(worker.resume().is_err());
    }

    #[rstest]
    #[case(DelayKind::BlockingSleep)]
    #[case(DelayKind::CooperativeDelay)]
    #[case(DelayKind::PooledTimer)]
    fn runs_with_every_delay_kind(#[case] kind: DelayKind) {
        let worker = PeriodicWorker::new(config(5).with_delay(kind), |_| Ok(()))
            .unwrap()
            .with_sink(Arc::new(NullSink));
        worker.start().unwrap();
        thread::sleep(Duration::from_millis(60));
        worker.stop().unwrap();
        assert!(worker.cycles() >= 2, "{kind}: {} cycles", worker.cycles());
    }

    #[rstest]
    fn drop_requests_stop() {
        let worker = PeriodicWorker::new(config(5), |_| Ok(()))
            .unwrap()
            .with_sink(Arc::new(NullSink));
        let observer = worker.observer();
        worker.start().unwrap();
        drop(worker);

        assert!(observer.wait_stopped(Duration::from_secs(5)));
        assert_eq!(observer.state(), WorkerState::Stopped);
    }
}
