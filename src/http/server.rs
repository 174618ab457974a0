//! HTTP server setup and connection serving.
//!
//! # Responsibilities
//! - Apply per-request deadlines (body read, response)
//! - Accept connections from the bounded listener, backing off on exhaustion
//! - Serve each connection with HTTP/1.1 or HTTP/2
//! - Close idle keep-alive connections
//! - Report the accept loop outcome once, then drain on shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::ConnectInfo, Router};
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::config::{ServiceConfig, TimeoutConfig};
use crate::net::{
    Activity, ActivityIo, ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener,
    ListenerError,
};
use crate::security::limits;

/// Pause before accepting again after running out of descriptors or buffers.
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Error that ends the accept loop while the server should still be serving.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("accept loop failed: {0}")]
    Accept(#[from] ListenerError),
}

/// HTTP server bound to one application router.
#[derive(Debug, Clone)]
pub struct HttpServer {
    router: Router,
    timeouts: TimeoutConfig,
}

impl HttpServer {
    /// Wrap `app` with the configured request deadlines.
    pub fn new(app: Router, config: &ServiceConfig) -> Self {
        let timeouts = config.timeouts;
        let router = app
            .layer(limits::response_timeout_layer(timeouts.write))
            .layer(limits::body_read_timeout_layer(timeouts.read));

        Self { router, timeouts }
    }

    /// Run the accept loop on `listener` until `shutdown` is cancelled.
    ///
    /// The accept loop outcome is sent on `done` as soon as the loop exits and
    /// the listening socket is closed. Cancellation counts as success. After
    /// that the task waits for `shutdown` and drains open connections;
    /// aborting the task aborts every connection with it.
    pub async fn serve(
        self,
        listener: Listener,
        shutdown: CancellationToken,
        done: oneshot::Sender<Result<(), ServeError>>,
    ) {
        let mut connections = ConnectionTracker::new();

        let outcome = loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break Ok(()),

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = connections.track();
                        tracing::trace!(connection_id = %guard.id(), peer = %peer, "Serving connection");
                        connections.spawn(serve_connection(
                            self.router.clone(),
                            self.timeouts,
                            stream,
                            peer,
                            shutdown.clone(),
                            guard,
                            permit,
                        ));
                    }
                    Err(e) if e.is_connection_error() => {
                        tracing::debug!(error = %e, "Dropped connection during accept");
                    }
                    Err(e) if e.is_transient() => {
                        tracing::warn!(
                            error = %e,
                            open_connections = connections.active_count(),
                            "Accept failed, retrying"
                        );
                        tokio::select! {
                            _ = shutdown.cancelled() => break Ok(()),
                            _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                        }
                    }
                    Err(e) => break Err(ServeError::Accept(e)),
                },

                Some(()) = connections.reap(), if !connections.is_empty() => {}
            }
        };

        drop(listener);
        if let Err(e) = &outcome {
            tracing::error!(error = %e, "Listener stopped unexpectedly");
        }
        let _ = done.send(outcome);

        shutdown.cancelled().await;
        tracing::info!(
            open_connections = connections.active_count(),
            "Draining connections"
        );
        connections.drain().await;
        tracing::info!("HTTP server stopped");
    }
}

async fn serve_connection(
    router: Router,
    timeouts: TimeoutConfig,
    stream: TcpStream,
    peer: SocketAddr,
    shutdown: CancellationToken,
    guard: ConnectionGuard,
    _permit: ConnectionPermit,
) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!(error = %e, "Failed to set TCP_NODELAY");
    }

    let activity = Activity::new();
    let io = TokioIo::new(ActivityIo::new(stream, activity.clone()));

    let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        router.clone().oneshot(request)
    });

    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read_header);

    let conn = builder.serve_connection_with_upgrades(io, service);
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(connection_id = %guard.id(), error = %e, "Connection error");
                }
                break;
            }
            _ = shutdown.cancelled(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
            _ = activity.idle_for(timeouts.idle), if !draining => {
                tracing::debug!(connection_id = %guard.id(), "Closing idle connection");
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}
