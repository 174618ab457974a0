//! Server lifecycle orchestration.
//!
//! A [`ServerHandle`] owns one listener for one run. The run binds, serves on
//! a background task and races that task's completion against termination
//! signals. Whichever comes first triggers a graceful shutdown bounded by the
//! grace period, escalating to a forced close when the deadline passes or the
//! operator signals again.

use std::fmt;
use std::net::SocketAddr;

use axum::Router;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::Instrument;

use super::phase::{LifecyclePhase, PhaseTracker, PhaseWatch};
use super::shutdown;
use super::signals::{Signals, TerminationSignal};
use crate::config::{ServiceConfig, TimeoutConfig};
use crate::http::{HttpServer, ServeError};
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

/// Error type for a server run.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to start server: {0}")]
    Bind(#[source] ListenerError),
}

/// How a run that got past startup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Every connection drained within the grace period.
    Clean,
    /// In-flight work was abandoned.
    Forced,
}

impl ExitOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, ExitOutcome::Clean)
    }
}

/// What ended the serving phase.
#[derive(Debug)]
pub enum TerminationEvent {
    Signal(TerminationSignal),
    ServeFailure(ServeError),
    ListenerClosed,
}

impl TerminationEvent {
    /// Metric label for the event.
    pub fn trigger(&self) -> &'static str {
        match self {
            TerminationEvent::Signal(_) => "signal",
            TerminationEvent::ServeFailure(_) => "serve_failure",
            TerminationEvent::ListenerClosed => "listener_closed",
        }
    }
}

impl fmt::Display for TerminationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationEvent::Signal(signal) => write!(f, "received {signal}"),
            TerminationEvent::ServeFailure(e) => write!(f, "{e}"),
            TerminationEvent::ListenerClosed => f.write_str("listener closed"),
        }
    }
}

/// One listener bound to one address, consumed by [`ServerHandle::run`]
/// or [`ServerHandle::run_on`].
#[derive(Debug)]
pub struct ServerHandle {
    display_name: String,
    service_name: String,
    bind_address: String,
    public_url: String,
    max_connections: usize,
    timeouts: TimeoutConfig,
    server: HttpServer,
    phase: PhaseTracker,
}

impl ServerHandle {
    /// Prepare a run of `app` with the settings of `config`.
    pub fn new(config: &ServiceConfig, app: Router) -> Self {
        Self {
            display_name: config.display_name(),
            service_name: config.app.name.clone(),
            bind_address: config.bind_address(),
            public_url: config.public_url(),
            max_connections: config.listener.max_connections,
            timeouts: config.timeouts,
            server: HttpServer::new(app, config),
            phase: PhaseTracker::new(config.app.name.clone()),
        }
    }

    /// Observe phase changes of this handle's run.
    pub fn phase_watch(&self) -> PhaseWatch {
        self.phase.watch()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase.current()
    }

    /// Serve until a termination event, then shut down.
    ///
    /// Returns `Err` only when the listener cannot be started. Once serving,
    /// every run ends in `Stopped`, cleanly or forced.
    pub async fn run(self, signals: Signals) -> Result<ExitOutcome, LifecycleError> {
        let span = tracing::info_span!("server", service = %self.display_name);
        async move {
            self.phase.enter(LifecyclePhase::Starting);
            let listener = match Listener::bind(&self.bind_address, self.max_connections).await {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        address = %self.bind_address,
                        "Failed to start server"
                    );
                    self.phase.enter(LifecyclePhase::Failed);
                    metrics::emit_startup_failed(&self.service_name);
                    return Err(LifecycleError::Bind(e));
                }
            };
            Ok(self.serve_until_terminated(listener, signals).await)
        }
        .instrument(span)
        .await
    }

    /// Like [`run`](Self::run), on a listener the caller already bound.
    pub async fn run_on(self, listener: Listener, signals: Signals) -> ExitOutcome {
        let span = tracing::info_span!("server", service = %self.display_name);
        async move {
            self.phase.enter(LifecyclePhase::Starting);
            self.serve_until_terminated(listener, signals).await
        }
        .instrument(span)
        .await
    }

    async fn serve_until_terminated(self, listener: Listener, signals: Signals) -> ExitOutcome {
        let ServerHandle {
            service_name,
            public_url,
            timeouts,
            server,
            phase,
            ..
        } = self;

        let local_addr: Option<SocketAddr> = listener.local_addr().ok();
        phase.enter_serving(local_addr);
        tracing::info!(
            url = %public_url,
            local_addr = ?local_addr,
            "Server started"
        );

        let token = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel();
        let mut serve_task = tokio::spawn(server.serve(listener, token.clone(), done_tx));

        // Room for the trigger and one escalation.
        let (signal_tx, mut signal_rx) = mpsc::channel(2);
        let _watcher = AbortOnDropHandle::new(tokio::spawn(forward_signals(signals, signal_tx)));

        let event = tokio::select! {
            Some(signal) = signal_rx.recv() => TerminationEvent::Signal(signal),
            reported = done_rx => match reported {
                Ok(Ok(())) | Err(_) => TerminationEvent::ListenerClosed,
                Ok(Err(e)) => TerminationEvent::ServeFailure(e),
            },
        };

        match &event {
            TerminationEvent::Signal(_) => tracing::info!(event = %event, "Shutting down server"),
            TerminationEvent::ServeFailure(_) => {
                tracing::error!(event = %event, "Server failed, shutting down")
            }
            TerminationEvent::ListenerClosed => {
                tracing::warn!(event = %event, "Listener closed, shutting down")
            }
        }
        metrics::emit_shutdown_initiated(&service_name, event.trigger());

        phase.enter(LifecyclePhase::GracefulShutdown);
        token.cancel();

        let outcome = match shutdown::wait_for_drain(
            &mut serve_task,
            timeouts.shutdown_grace,
            &mut signal_rx,
        )
        .await
        {
            Ok(()) => {
                tracing::info!("Server stopped gracefully");
                ExitOutcome::Clean
            }
            Err(e) => {
                tracing::error!(error = %e, "Graceful shutdown failed");
                phase.enter(LifecyclePhase::ForcedClose);
                shutdown::force_close(&mut serve_task).await;
                tracing::warn!("Server forced to shutdown");
                ExitOutcome::Forced
            }
        };

        phase.enter(LifecyclePhase::Stopped);
        metrics::emit_shutdown_completed(&service_name, outcome.is_clean());
        outcome
    }
}

async fn forward_signals(mut signals: Signals, tx: mpsc::Sender<TerminationSignal>) {
    while let Some(signal) = signals.recv().await {
        tracing::info!(signal = %signal, "Received termination signal");
        if tx.send(signal).await.is_err() {
            break;
        }
    }
}
