use std::fmt;
use std::io;
use std::thread;

use super::WorkerPriority;

/// Body run by an execution context: one worker's whole cycle loop.
pub type ContextBody = Box<dyn FnOnce() + Send + 'static>;

/// Something that can host a worker's cycle loop in parallel with its caller.
pub trait ExecutionContext: Send + Sync + fmt::Debug {
    /// Starts `body` on a new, dedicated context and returns immediately.
    ///
    /// `priority` is advisory. Implementations that cannot honour it must
    /// ignore it rather than fail.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the context could not be created.
    fn spawn(&self, name: &str, priority: WorkerPriority, body: ContextBody) -> io::Result<()>;
}

/// Runs each worker on its own named OS thread.
///
/// The standard library exposes no thread priority control, so the priority
/// hint is only recorded in the worker's logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContext {
    stack_size: Option<usize>,
}

impl ThreadContext {
    /// Creates a context using the platform's default stack size.
    #[must_use]
    pub const fn new() -> Self {
        Self { stack_size: None }
    }

    /// Sets the stack size, in bytes, of spawned threads.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }
}

impl ExecutionContext for ThreadContext {
    fn spawn(&self, name: &str, priority: WorkerPriority, body: ContextBody) -> io::Result<()> {
        let mut builder = thread::Builder::new().name(name.to_string());
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        if priority != WorkerPriority::Normal {
            tracing::debug!(worker = name, %priority, "priority hint ignored by thread context");
        }
        builder.spawn(body).map(drop)
    }
}
