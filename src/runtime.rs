//! Shared execution facility.
//!
//! The pooled timer strategy and the blocking bridges of the cooperative
//! delay and the lazy value all need an async executor even when the caller
//! is plain synchronous code. This module owns one lazily created
//! multi-thread tokio runtime for that purpose and provides:
//!
//! 1. [`global`]: the shared runtime (created on first use, never dropped).
//! 2. [`handle`]: the caller's current runtime handle if there is one,
//!    otherwise a thread-locally cached handle to the shared runtime.
//! 3. [`try_run_blocking`]: drives a future to completion from synchronous
//!    code, using `block_in_place` when already inside a multi-thread runtime.
//!
//! # Runtime flavors
//!
//! A current-thread runtime cannot host `block_in_place`; blocking from
//! inside one reports [`BlockingError::CurrentThreadRuntime`] instead of
//! panicking, and callers choose a fallback.

use std::cell::RefCell;
use std::future::Future;
use std::sync::LazyLock;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

static GLOBAL_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("cadence-timer")
        .enable_all()
        .build()
        .expect("failed to create the shared cadence runtime")
});

/// Returns the shared runtime, creating it on first call.
#[inline]
#[must_use]
pub fn global() -> &'static Runtime {
    &GLOBAL_RUNTIME
}

thread_local! {
    static CACHED_HANDLE: RefCell<Option<Handle>> = const { RefCell::new(None) };
}

/// Returns a handle to the current runtime, or to the shared one.
///
/// Inside a tokio runtime the current handle wins so that spawned work keeps
/// the caller's tracing context.
#[must_use]
pub fn handle() -> Handle {
    if let Ok(current) = Handle::try_current() {
        return current;
    }

    CACHED_HANDLE.with(|cached| {
        cached
            .borrow_mut()
            .get_or_insert_with(|| global().handle().clone())
            .clone()
    })
}

/// Why a future could not be driven synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlockingError {
    /// `block_in_place` is only available on multi-thread runtimes.
    #[error(
        "cannot block inside a current-thread runtime: \
         block_in_place is only supported in multi-thread runtimes"
    )]
    CurrentThreadRuntime,

    /// The caller's runtime flavor is unknown to this crate.
    #[error("cannot block: the runtime flavor is not supported")]
    UnsupportedRuntimeFlavor,
}

/// Drives `future` to completion on the calling thread.
///
/// - Outside any runtime: `block_on` on the shared runtime.
/// - Inside a multi-thread runtime: `block_in_place` + `block_on` on the
///   current handle.
/// - Inside a current-thread runtime: refuses.
///
/// # Errors
///
/// Returns [`BlockingError::CurrentThreadRuntime`] when called from a
/// current-thread runtime, and [`BlockingError::UnsupportedRuntimeFlavor`]
/// for runtime flavors this crate does not know.
pub fn try_run_blocking<F, T>(future: F) -> Result<T, BlockingError>
where
    F: Future<Output = T>,
{
    match Handle::try_current() {
        Ok(current) => match current.runtime_flavor() {
            RuntimeFlavor::MultiThread => {
                Ok(tokio::task::block_in_place(|| current.block_on(future)))
            }
            RuntimeFlavor::CurrentThread => Err(BlockingError::CurrentThreadRuntime),
            _ => Err(BlockingError::UnsupportedRuntimeFlavor),
        },
        Err(_) => Ok(global().block_on(future)),
    }
}

/// [`try_run_blocking`] with the error converted into the crate error.
///
/// # Errors
///
/// Returns [`Error::Blocking`](crate::Error::Blocking) where
/// [`try_run_blocking`] would fail.
pub fn run_blocking<F, T>(future: F) -> crate::Result<T>
where
    F: Future<Output = T>,
{
    Ok(try_run_blocking(future)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::ptr;
    use std::thread;

    #[rstest]
    fn global_returns_same_instance() {
        assert!(ptr::eq(global(), global()));
    }

    #[rstest]
    fn global_is_shared_between_threads() {
        let addresses: Vec<usize> = (0..4)
            .map(|_| thread::spawn(|| ptr::from_ref(global()) as usize))
            .map(|handle| handle.join().unwrap())
            .collect();

        assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[rstest]
    fn handle_outside_runtime_targets_global() {
        let obtained = handle();
        assert_eq!(obtained.block_on(async { 21 * 2 }), 42);
    }

    #[rstest]
    #[tokio::test]
    async fn handle_inside_runtime_is_current() {
        let obtained = handle();
        assert_eq!(obtained.runtime_flavor(), RuntimeFlavor::CurrentThread);
        assert_eq!(obtained.spawn(async { 42 }).await.unwrap(), 42);
    }

    #[rstest]
    fn try_run_blocking_outside_runtime() {
        let result = try_run_blocking(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            7
        });
        assert_eq!(result, Ok(7));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn try_run_blocking_inside_multi_thread_runtime() {
        assert_eq!(try_run_blocking(async { 1 }), Ok(1));
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn try_run_blocking_inside_current_thread_runtime() {
        assert_eq!(
            try_run_blocking(async { 1 }),
            Err(BlockingError::CurrentThreadRuntime)
        );
    }

    #[rstest]
    fn blocking_error_display() {
        let message = BlockingError::CurrentThreadRuntime.to_string();
        assert!(message.contains("current-thread runtime"));
        assert!(message.contains("block_in_place"));
    }
}
