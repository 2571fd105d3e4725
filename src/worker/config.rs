use std::fmt;
use std::time::Duration;

use crate::delay::DelayKind;
use crate::error::{Error, Result};

/// Advisory scheduling priority for a worker's execution context.
///
/// Contexts that cannot apply priorities ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WorkerPriority {
    /// Below normal.
    Low,
    /// Platform default.
    #[default]
    Normal,
    /// Above normal.
    High,
    /// As high as the platform allows without special privileges.
    Highest,
}

impl fmt::Display for WorkerPriority {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Highest => "highest",
        };
        formatter.write_str(name)
    }
}

/// Construction parameters for a [`PeriodicWorker`](super::PeriodicWorker).
///
/// # Examples
///
/// ```rust
/// use cadence::delay::DelayKind;
/// use cadence::worker::{WorkerConfig, WorkerPriority};
/// use std::time::Duration;
///
/// let config = WorkerConfig::new("metrics-flush", Duration::from_millis(250))
///     .with_priority(WorkerPriority::Low)
///     .with_delay(DelayKind::PooledTimer);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorkerConfig {
    /// Name of the worker; also used for its thread.
    pub name: String,
    /// Scheduling hint for the execution context.
    pub priority: WorkerPriority,
    /// Target time between the starts of consecutive cycles.
    pub period: Duration,
    /// Strategy used to wait between cycles.
    pub delay: DelayKind,
    /// How long `stop` waits for an in-flight cycle to finish.
    pub stop_timeout: Duration,
}

impl WorkerConfig {
    /// Default for [`WorkerConfig::period`].
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    /// Default for [`WorkerConfig::stop_timeout`].
    pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration with the given name and period and defaults
    /// for everything else.
    #[must_use]
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            period,
            ..Self::default()
        }
    }

    /// Sets the priority hint.
    #[must_use]
    pub const fn with_priority(mut self, priority: WorkerPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the delay strategy.
    #[must_use]
    pub const fn with_delay(mut self, delay: DelayKind) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the stop timeout.
    #[must_use]
    pub const fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty name or a zero period.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig("worker name must not be empty".into()));
        }
        if self.period.is_zero() {
            return Err(Error::InvalidConfig(format!(
                "worker `{}` period must be greater than zero",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "worker".to_string(),
            priority: WorkerPriority::default(),
            period: Self::DEFAULT_PERIOD,
            delay: DelayKind::default(),
            stop_timeout: Self::DEFAULT_STOP_TIMEOUT,
        }
    }
}
