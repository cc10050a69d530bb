//! Run blocking HTTP work off the cooperative executor.
//!
//! The control loop and its side-effect tasks share one thread.  Network
//! calls are made with blocking clients, so each one runs on a short-lived
//! worker thread and hands its result back through a [`Signal`].  The
//! awaiting task yields until the worker finishes; everything else on the
//! executor keeps running.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Why an offloaded job produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffloadError {
    /// The OS refused to start the worker thread.
    Spawn(String),
    /// The job panicked on the worker thread.
    Panicked,
}

impl core::fmt::Display for OffloadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "worker spawn failed: {e}"),
            Self::Panicked => write!(f, "worker panicked"),
        }
    }
}

/// Run `job` on a named worker thread and await its result.
pub async fn run_blocking<T, F>(name: &str, job: F) -> Result<T, OffloadError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let done: Arc<Signal<CriticalSectionRawMutex, Option<T>>> = Arc::new(Signal::new());
    let tx = Arc::clone(&done);

    std::thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            // A panicking job must still wake the waiter.
            let out = panic::catch_unwind(AssertUnwindSafe(job)).ok();
            tx.signal(out);
        })
        .map_err(|e| OffloadError::Spawn(e.to_string()))?;

    done.wait().await.ok_or(OffloadError::Panicked)
}
