use std::fmt;

use crate::atomic::AtomicValue;

/// Lifecycle of a [`PeriodicWorker`](super::PeriodicWorker).
///
/// ```text
/// Created --start--> Running --stop--> Stopping --cycle drains--> Stopped
///                    Running <--pause/resume--> Paused
///                    Running --fatal failure / external cancel--> Stopped
/// ```
///
/// `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Constructed, not started.
    Created = 0,
    /// Executing cycles.
    Running = 1,
    /// Keeping its cadence but skipping cycle logic.
    Paused = 2,
    /// Stop requested; the in-flight cycle is draining.
    Stopping = 3,
    /// Finished.
    Stopped = 4,
}

impl WorkerState {
    /// Lowercase name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    /// `true` while the cycle loop is alive.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused | Self::Stopping)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A [`WorkerState`] held in an [`AtomicValue`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicValue<u8>);

impl StateCell {
    pub(crate) fn new(state: WorkerState) -> Self {
        Self(AtomicValue::new(state as u8))
    }

    pub(crate) fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.get())
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.0.set(state as u8);
    }

    /// Moves `from -> to`; `false` if the state was not `from`.
    pub(crate) fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        self.0.compare_exchange(from as u8, to as u8)
    }
}
