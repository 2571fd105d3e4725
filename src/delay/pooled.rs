use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{DelayKind, DelayOutcome, DelayStrategy};
use crate::cancel::CancelSignal;
use crate::runtime;

/// Schedules a callback on a shared timer facility and blocks on a wait
/// handle until it fires.
///
/// Each wait spawns one timer task on the facility (by default the crate's
/// shared runtime). The task races the timer against the signal and fires the
/// handle either way. The task is aborted when the wait returns, so no timer
/// outlives its wait.
#[derive(Debug, Clone)]
pub struct PooledTimer {
    timers: Handle,
}

impl PooledTimer {
    /// Creates a strategy backed by the shared runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_handle(runtime::global().handle().clone())
    }

    /// Creates a strategy backed by the given runtime.
    ///
    /// Waits block the calling thread, so the runtime must not be a
    /// current-thread runtime driven by that same thread.
    #[must_use]
    pub const fn with_handle(timers: Handle) -> Self {
        Self { timers }
    }
}

impl Default for PooledTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayStrategy for PooledTimer {
    fn kind(&self) -> DelayKind {
        DelayKind::PooledTimer
    }

    fn wait(&self, duration: Duration, signal: &CancelSignal) -> DelayOutcome {
        let started = Instant::now();
        if signal.is_triggered() {
            return DelayOutcome::since(started, true);
        }
        if duration.is_zero() {
            return DelayOutcome::since(started, false);
        }

        let timer = ScheduledTimer::schedule(&self.timers, duration, signal.clone());
        let cancelled = timer.block();
        DelayOutcome::since(started, cancelled)
    }
}

/// Fired once by the timer task; `Some(cancelled)` after firing.
#[derive(Debug, Default)]
struct WaitHandle {
    fired: Mutex<Option<bool>>,
    condvar: Condvar,
}

impl WaitHandle {
    fn fire(&self, cancelled: bool) {
        let mut fired = self.fired.lock();
        if fired.is_none() {
            *fired = Some(cancelled);
        }
        self.condvar.notify_all();
    }
}

/// A timer task paired with the handle it fires. Dropping it aborts the task.
struct ScheduledTimer {
    handle: Arc<WaitHandle>,
    task: JoinHandle<()>,
}

impl ScheduledTimer {
    fn schedule(timers: &Handle, duration: Duration, signal: CancelSignal) -> Self {
        let handle = Arc::new(WaitHandle::default());
        let fired = Arc::clone(&handle);
        let task = timers.spawn(async move {
            let cancelled = tokio::select! {
                biased;
                () = signal.cancelled() => true,
                () = tokio::time::sleep(duration) => false,
            };
            fired.fire(cancelled);
        });
        Self { handle, task }
    }

    fn block(&self) -> bool {
        let mut fired = self.handle.fired.lock();
        loop {
            if let Some(cancelled) = *fired {
                return cancelled;
            }
            self.handle.condvar.wait(&mut fired);
        }
    }
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::thread;

    #[rstest]
    fn waits_at_least_the_requested_duration() {
        let outcome = PooledTimer::new().wait(Duration::from_millis(5), &CancelSignal::new());
        assert!(outcome.completed());
        assert!(outcome.elapsed() >= Duration::from_millis(5));
    }

    #[rstest]
    fn trigger_fires_the_handle_early() {
        let signal = CancelSignal::new();
        let trigger = signal.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.trigger();
        });

        let outcome = PooledTimer::new().wait(Duration::from_secs(10), &signal);
        canceller.join().unwrap();

        assert!(outcome.was_cancelled());
        assert!(outcome.elapsed() < Duration::from_secs(2));
    }

    #[rstest]
    fn concurrent_waits_on_one_strategy() {
        let strategy = Arc::new(PooledTimer::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let strategy = Arc::clone(&strategy);
                thread::spawn(move || strategy.wait(Duration::from_millis(5), &CancelSignal::new()))
            })
            .collect();

        for handle in handles {
            let outcome = handle.join().unwrap();
            assert!(outcome.completed());
            assert!(outcome.elapsed() >= Duration::from_millis(5));
        }
    }

    #[rstest]
    fn sequential_waits_leave_no_tasks_behind() {
        let timers = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap();
        let strategy = PooledTimer::with_handle(timers.handle().clone());

        assert!(strategy.wait(Duration::from_millis(2), &CancelSignal::new()).completed());
        let signal = CancelSignal::new();
        signal.trigger();
        assert!(strategy.wait(Duration::from_secs(60), &signal).was_cancelled());
        assert!(strategy.wait(Duration::from_millis(2), &CancelSignal::new()).completed());

        let deadline = Instant::now() + Duration::from_secs(5);
        while timers.metrics().num_alive_tasks() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(timers.metrics().num_alive_tasks(), 0);
    }

    #[rstest]
    fn dropping_the_timer_aborts_its_task() {
        let timer = ScheduledTimer::schedule(
            runtime::global().handle(),
            Duration::from_secs(60),
            CancelSignal::new(),
        );
        let handle = Arc::clone(&timer.handle);
        drop(timer);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(Arc::strong_count(&handle), 1);
        assert!(handle.fired.lock().is_none());
    }
}
