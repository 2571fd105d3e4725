//! Error types shared by every component of the crate.
//!
//! Errors fall into three groups:
//!
//! - **Usage errors** ([`Error::InvalidStateTransition`], [`Error::InvalidConfig`]):
//!   reported synchronously to the call site that misused a component.
//! - **Runtime failures** ([`Error::LazyInitialization`], [`Error::Spawn`],
//!   [`Error::StopTimedOut`]): something went wrong while doing real work.
//! - **Bridge failures** ([`Error::Blocking`]): a blocking call was made from a
//!   context that cannot block.
//!
//! Cancellation is never an error; waits report it through
//! [`DelayOutcome::was_cancelled`](crate::delay::DelayOutcome::was_cancelled).
//!
//! Every variant is `Clone` so a single failure can be handed to many
//! observers (all waiters of a lazy value, every reader of a worker's last
//! failure). Foreign error sources are shared behind an [`Arc`].

use std::sync::Arc;
use std::time::Duration;

/// Boxed error produced by user-supplied code (cycle logic, lazy factories).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared, cloneable form of [`BoxError`].
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by the components of this crate.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A lifecycle operation was requested from a state that does not allow it.
    #[error("worker `{worker}` cannot {action} while {from}")]
    InvalidStateTransition {
        /// Name of the worker.
        worker: String,
        /// State the worker was in when the call was made.
        from: &'static str,
        /// The rejected operation.
        action: &'static str,
    },

    /// A configuration value was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `stop` gave up waiting for the in-flight cycle to finish.
    #[error("worker `{worker}` did not stop within {timeout:?}")]
    StopTimedOut {
        /// Name of the worker.
        worker: String,
        /// How long `stop` waited.
        timeout: Duration,
    },

    /// The execution context for a worker could not be created.
    #[error("failed to spawn execution context for `{worker}`")]
    Spawn {
        /// Name of the worker.
        worker: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A lazy value's factory failed; every caller of the attempt sees this.
    #[error("lazy initialization failed: {source}")]
    LazyInitialization {
        /// The factory's error.
        #[source]
        source: SharedError,
    },

    /// A blocking bridge was called where blocking is not possible.
    #[cfg(feature = "runtime")]
    #[error(transparent)]
    Blocking(#[from] crate::runtime::BlockingError),
}

impl Error {
    #[cfg_attr(not(feature = "lazy"), allow(dead_code))]
    pub(crate) fn lazy_initialization(source: impl Into<BoxError>) -> Self {
        Self::LazyInitialization {
            source: Arc::from(source.into()),
        }
    }

    /// Returns `true` for misuse of a component's lifecycle or configuration.
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidStateTransition { .. } | Self::InvalidConfig(_)
        )
    }
}

/// Error used when a panic is converted into a regular failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("panicked: {message}")]
pub struct PanicError {
    message: String,
}

impl PanicError {
    #[cfg_attr(not(any(feature = "lazy", feature = "worker")), allow(dead_code))]
    pub(crate) fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self { message }
    }

    /// The panic message, when the payload was a string.
    pub fn message(&self) -> &str {
        &self.message
    }
}
