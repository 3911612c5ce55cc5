//! Bounded-latency result race
//!
//! Runs a single-attempt fallible operation concurrently with a timer and
//! returns whichever finishes first. The loser is cancelled and its
//! cancellation is awaited before returning, so no provider work leaks past
//! the call. Exactly one of {value, error} is ever surfaced.
//!
//! Every bounded operation in the crate (geocoding, one-shot position
//! requests) goes through this primitive; see `constants::timeouts` for the
//! per-class defaults.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Race `op` against `timeout`
///
/// If the operation completes first, its value or error is propagated. If
/// the timer fires first, the operation task is aborted, the abort is
/// awaited, and `Error::Timeout` is returned regardless of what the
/// operation would eventually have produced.
pub async fn run<T, F>(op: F, timeout: Duration) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    // The guard also covers the caller being dropped mid-race: the spawned
    // operation is aborted rather than left running detached.
    let mut guard = AbortOnDrop(tokio::spawn(op));

    tokio::select! {
        joined = &mut guard.0 => match joined {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::Unknown(format!("raced task failed: {}", e))),
        },
        _ = sleep(timeout) => {
            guard.0.abort();
            // Wait for the abort to be acknowledged; the task must be gone
            // before we report the timeout.
            let _ = (&mut guard.0).await;
            debug!(timeout_ms = timeout.as_millis() as u64, "raced operation timed out");
            Err(Error::Timeout)
        }
    }
}

/// Aborts the held task when dropped; a no-op if it already finished
struct AbortOnDrop<T>(tokio::task::JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
