//! Exactly-once asynchronous lazy values.
//!
//! [`LazyAsyncValue<T>`] defers an expensive asynchronous computation until
//! the first caller asks for it, then shares that single computation with
//! every other caller, concurrent or later.
//!
//! # State machine
//!
//! ```text
//! NotStarted --first get_value_async--> InProgress --Ok--> Completed
//!                                                 \--Err/panic--> Faulted
//! Completed | Faulted --reset--> NotStarted
//! ```
//!
//! The first caller installs a [`Shared`] future wrapping the factory; every
//! caller (including the first) awaits a clone of it. Whoever polls drives it,
//! so dropping any single waiter never restarts or cancels the factory for
//! the others.
//!
//! # Failure policy
//!
//! A failed attempt is permanent: the error is cached and returned, as
//! [`Error::LazyInitialization`], to every waiter of the attempt and every
//! later caller. Call [`LazyAsyncValue::reset`] to allow a fresh attempt.
//! A panic inside the factory is caught and treated as a failure.
//!
//! # Sharing
//!
//! The handle is cheap to clone and all clones refer to the same value. Hand
//! clones to whatever needs the value instead of storing it in a static.
//!
//! # Examples
//!
//! ```rust
//! use cadence::lazy::LazyAsyncValue;
//! use std::time::Duration;
//!
//! # cadence::runtime::global().block_on(async {
//! let config = LazyAsyncValue::new(|| async {
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!     String::from("loaded")
//! });
//!
//! assert!(!config.is_value_created());
//! assert_eq!(config.get_value_async().await.unwrap(), "loaded");
//! assert!(config.is_value_created());
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::atomic::AtomicValue;
use crate::error::{BoxError, Error, PanicError, Result};
use crate::runtime;

type BoxedFactory<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync>;

type Attempt<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Observable state of a [`LazyAsyncValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyState {
    /// The factory has not been invoked.
    NotStarted,
    /// The factory is running.
    InProgress,
    /// A value was produced.
    Completed,
    /// The factory failed; the error is cached.
    Faulted,
}

enum Slot<T> {
    NotStarted,
    InProgress(Attempt<T>),
    Completed(T),
    Faulted(Error),
}

struct Cell<T> {
    slot: Slot<T>,
    /// Bumped by `reset`; late settlements of older attempts are ignored.
    generation: u64,
}

struct Inner<T> {
    factory: BoxedFactory<T>,
    cell: Mutex<Cell<T>>,
    invocations: Arc<AtomicValue<u64>>,
}

/// A value computed at most once by an asynchronous factory.
///
/// See the [module documentation](self) for the failure policy.
pub struct LazyAsyncValue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for LazyAsyncValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> LazyAsyncValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a lazy value from an infallible asynchronous factory.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let factory: BoxedFactory<T> =
            Arc::new(move || factory().map(Ok::<T, BoxError>).boxed());
        Self::from_factory(factory, Slot::NotStarted)
    }

    /// Creates a lazy value from a fallible asynchronous factory.
    pub fn try_new<F, Fut, E>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let factory: BoxedFactory<T> = Arc::new(move || {
            factory()
                .map(|result| result.map_err(Into::<BoxError>::into))
                .boxed()
        });
        Self::from_factory(factory, Slot::NotStarted)
    }

    /// Creates a lazy value that is already created.
    ///
    /// After a [`reset`](Self::reset) the same value is produced again.
    pub fn from_value(value: T) -> Self {
        let stored = value.clone();
        let factory: BoxedFactory<T> = Arc::new(move || {
            let value = stored.clone();
            async move { Ok::<T, BoxError>(value) }.boxed()
        });
        Self::from_factory(factory, Slot::Completed(value))
    }

    fn from_factory(factory: BoxedFactory<T>, slot: Slot<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                cell: Mutex::new(Cell {
                    slot,
                    generation: 0,
                }),
                invocations: Arc::new(AtomicValue::new(0)),
            }),
        }
    }

    /// Returns the value, starting the factory if nobody has yet.
    ///
    /// Concurrent callers share one factory run and all observe its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LazyInitialization`] if the factory failed, now or in
    /// an earlier attempt that has not been [`reset`](Self::reset).
    pub async fn get_value_async(&self) -> Result<T> {
        let (generation, attempt) = {
            let mut cell = self.inner.cell.lock();
            match &cell.slot {
                Slot::Completed(value) => return Ok(value.clone()),
                Slot::Faulted(error) => return Err(error.clone()),
                Slot::InProgress(attempt) => (cell.generation, attempt.clone()),
                Slot::NotStarted => {
                    let attempt = self.inner.begin_attempt();
                    cell.slot = Slot::InProgress(attempt.clone());
                    (cell.generation, attempt)
                }
            }
        };

        let outcome = attempt.await;
        self.inner.settle(generation, &outcome);
        outcome
    }

    /// Blocking form of [`get_value_async`](Self::get_value_async) for
    /// synchronous callers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Blocking`] when called from a current-thread runtime,
    /// otherwise the same errors as `get_value_async`.
    pub fn get_value_blocking(&self) -> Result<T> {
        runtime::run_blocking(self.get_value_async())?
    }

    /// Returns the value if it has been created, without starting the factory.
    pub fn get(&self) -> Option<T> {
        let cell = self.inner.cell.lock();
        match &cell.slot {
            Slot::Completed(value) => Some(value.clone()),
            Slot::InProgress(attempt) => match attempt.peek() {
                Some(Ok(value)) => Some(value.clone()),
                _ => None,
            },
            Slot::NotStarted | Slot::Faulted(_) => None,
        }
    }
}

impl<T> LazyAsyncValue<T>
where
    T: Clone,
{
    /// `true` once a value exists. Never blocks; `false` while in flight.
    pub fn is_value_created(&self) -> bool {
        self.state() == LazyState::Completed
    }

    /// `true` if the last attempt failed.
    pub fn is_faulted(&self) -> bool {
        self.state() == LazyState::Faulted
    }

    /// Current state.
    pub fn state(&self) -> LazyState {
        let cell = self.inner.cell.lock();
        match &cell.slot {
            Slot::NotStarted => LazyState::NotStarted,
            Slot::Completed(_) => LazyState::Completed,
            Slot::Faulted(_) => LazyState::Faulted,
            Slot::InProgress(attempt) => match attempt.peek() {
                None => LazyState::InProgress,
                Some(Ok(_)) => LazyState::Completed,
                Some(Err(_)) => LazyState::Faulted,
            },
        }
    }

    /// How many times the factory has actually started running.
    pub fn factory_invocations(&self) -> u64 {
        self.inner.invocations.get()
    }

    /// Discards a completed value or cached failure so the next call runs
    /// the factory again.
    ///
    /// Returns `false`, changing nothing, when there is nothing to discard or
    /// an attempt is still in flight.
    pub fn reset(&self) -> bool {
        let mut cell = self.inner.cell.lock();
        let discard = match &cell.slot {
            Slot::NotStarted => false,
            Slot::Completed(_) | Slot::Faulted(_) => true,
            Slot::InProgress(attempt) => attempt.peek().is_some(),
        };
        if discard {
            cell.slot = Slot::NotStarted;
            cell.generation += 1;
            tracing::debug!(generation = cell.generation, "lazy value reset");
        }
        discard
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn begin_attempt(&self) -> Attempt<T> {
        let factory = Arc::clone(&self.factory);
        let invocations = Arc::clone(&self.invocations);
        let run = async move {
            let invocation = invocations.increment();
            tracing::debug!(invocation, "lazy factory started");
            factory().await
        };

        AssertUnwindSafe(run)
            .catch_unwind()
            .map(|result| match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(Error::lazy_initialization(error)),
                Err(payload) => Err(Error::lazy_initialization(PanicError::from_payload(
                    payload.as_ref(),
                ))),
            })
            .boxed()
            .shared()
    }
}

impl<T: Clone> Inner<T> {
    fn settle(&self, generation: u64, outcome: &Result<T>) {
        let mut cell = self.cell.lock();
        if cell.generation != generation || !matches!(cell.slot, Slot::InProgress(_)) {
            return;
        }
        cell.slot = match outcome {
            Ok(value) => Slot::Completed(value.clone()),
            Err(error) => {
                tracing::warn!(%error, "lazy factory failed");
                Slot::Faulted(error.clone())
            }
        };
    }
}

impl<T: Clone> fmt::Debug for LazyAsyncValue<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LazyAsyncValue")
            .field("state", &self.state())
            .field("factory_invocations", &self.factory_invocations())
            .finish_non_exhaustive()
    }
}
