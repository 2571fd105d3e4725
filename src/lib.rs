//! # cadence
//!
//! Concurrency primitives for building background services.
//!
//! ## Overview
//!
//! - **Atomic values**: [`AtomicValue`](atomic::AtomicValue), a lock-free cell
//!   for primitive values with read-modify-write helpers.
//! - **Cancellation**: [`CancelSignal`](cancel::CancelSignal), a cloneable
//!   signal with linked child signals.
//! - **Delay strategies**: interchangeable cancellable waits, from plain
//!   thread sleeps to timers on a shared runtime.
//! - **Lazy async values**: [`LazyAsyncValue`](lazy::LazyAsyncValue), which
//!   runs an async factory at most once, on first demand.
//! - **Periodic workers**: [`PeriodicWorker`](worker::PeriodicWorker), a
//!   background loop running user logic once per period.
//!
//! ## Feature Flags
//!
//! - `atomic`: atomic values
//! - `runtime`: shared tokio runtime and blocking bridges
//! - `cancel`: cancellation signals
//! - `delay`: delay strategies
//! - `lazy`: lazy async values
//! - `worker`: periodic workers
//! - `serde`: `Serialize`/`Deserialize` for configuration types
//! - `loom`: model-checked atomics for `loom` tests
//! - `full`: everything except `loom`
//!
//! ## Example
//!
//! ```rust
//! use cadence::prelude::*;
//! use std::time::Duration;
//!
//! let ticks = std::sync::Arc::new(AtomicValue::new(0_u64));
//! let counter = std::sync::Arc::clone(&ticks);
//!
//! let worker = PeriodicWorker::new(
//!     WorkerConfig::new("ticker", Duration::from_millis(5)),
//!     move |_| {
//!         counter.increment();
//!         Ok(())
//!     },
//! )?;
//! worker.start()?;
//! std::thread::sleep(Duration::from_millis(30));
//! worker.stop()?;
//!
//! assert_eq!(ticks.get(), worker.cycles());
//! # Ok::<(), cadence::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// ```rust
/// use cadence::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{BoxError, Error, Result};
    pub use crate::sink::{LogSink, TracingSink};

    #[cfg(feature = "atomic")]
    pub use crate::atomic::AtomicValue;

    #[cfg(feature = "cancel")]
    pub use crate::cancel::CancelSignal;

    #[cfg(feature = "delay")]
    pub use crate::delay::{DelayKind, DelayOutcome, DelayStrategy};

    #[cfg(feature = "lazy")]
    pub use crate::lazy::{LazyAsyncValue, LazyState};

    #[cfg(feature = "worker")]
    pub use crate::worker::{
        CycleContext, FailureAction, PeriodicWorker, WorkerConfig, WorkerObserver, WorkerState,
    };
}

pub mod error;
pub mod sink;

pub use error::{BoxError, Error, PanicError, Result, SharedError};

#[cfg(feature = "atomic")]
pub mod atomic;

#[cfg(feature = "runtime")]
pub mod runtime;

#[cfg(feature = "cancel")]
pub mod cancel;

#[cfg(feature = "delay")]
pub mod delay;

#[cfg(feature = "lazy")]
pub mod lazy;

#[cfg(feature = "worker")]
pub mod worker;
