//! Logging sink consumed by workers.
//!
//! Components never depend on a concrete logger, only on [`LogSink`].
//! [`TracingSink`], the default, forwards to `tracing` events so the host
//! application decides where they go by installing a subscriber.

use std::error::Error;
use std::fmt;

/// Minimal logging capability.
pub trait LogSink: Send + Sync + fmt::Debug {
    /// Records an informational message.
    fn info(&self, message: &str);

    /// Records a failure together with the error that caused it.
    fn error(&self, message: &str, error: &(dyn Error + 'static));
}

/// Forwards to `tracing` at `INFO` and `ERROR` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str, error: &(dyn Error + 'static)) {
        tracing::error!(error = %error, "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn info(&self, _message: &str) {}

    fn error(&self, _message: &str, _error: &(dyn Error + 'static)) {}
}
