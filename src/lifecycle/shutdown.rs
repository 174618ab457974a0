//! Shutdown coordination for the server.
//!
//! Graceful first: the serve task is given the grace period to drain. Any
//! failure to do so (deadline, a second signal, or the task dying) is
//! reported as a [`ShutdownError`] and the caller falls back to a forced close.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use super::signals::TerminationSignal;

/// Reasons a graceful shutdown did not complete.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("connections still open after grace period of {0:?}")]
    Timeout(Duration),

    #[error("shutdown forced by {0}")]
    Forced(TerminationSignal),

    #[error("serve task failed during shutdown: {0}")]
    Task(#[from] JoinError),
}

/// Wait for `serve` to finish within `grace`.
///
/// A signal arriving on `signals` while waiting cuts the wait short. The
/// grace timer lives only as long as this call.
pub(crate) async fn wait_for_drain(
    serve: &mut JoinHandle<()>,
    grace: Duration,
    signals: &mut mpsc::Receiver<TerminationSignal>,
) -> Result<(), ShutdownError> {
    tokio::select! {
        drained = tokio::time::timeout(grace, &mut *serve) => match drained {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ShutdownError::Task(e)),
            Err(_) => Err(ShutdownError::Timeout(grace)),
        },
        Some(signal) = signals.recv() => Err(ShutdownError::Forced(signal)),
    }
}

/// Abort `serve` and wait for it to unwind.
///
/// Errors are logged; a forced close never fails the run.
pub(crate) async fn force_close(serve: &mut JoinHandle<()>) {
    if serve.is_finished() {
        return;
    }

    serve.abort();
    match serve.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => {}
        Err(e) => tracing::error!(error = %e, "Serve task failed while forcing shutdown"),
    }
}
