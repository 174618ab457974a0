//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use any_business::config::{Environment, ServiceConfig};
use any_business::http;
use any_business::lifecycle::{
    signals, ExitOutcome, LifecycleError, LifecyclePhase, PhaseWatch, ServerHandle, SignalSender,
};
use axum::{routing::get, Router};
use tokio::task::JoinHandle;

/// Config for a server on an ephemeral loopback port.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.environment = Environment::Testing;
    config.app.name = "test-service".into();
    config.app.version = "0.0.1".into();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config
}

/// The full application plus a `/slow` route that sleeps for `delay`.
pub fn app_with_slow_route(config: &ServiceConfig, delay: Duration) -> Router {
    let slow = Router::new().route(
        "/slow",
        get(move || async move {
            tokio::time::sleep(delay).await;
            "done"
        }),
    );
    http::app(config, None).merge(slow)
}

/// A server run in the background, driven by an in-process signal source.
pub struct RunningServer {
    pub signals: SignalSender,
    pub phase: PhaseWatch,
    pub addr: SocketAddr,
    pub task: JoinHandle<Result<ExitOutcome, LifecycleError>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start `app` and wait until it is serving.
pub async fn start(config: &ServiceConfig, app: Router) -> RunningServer {
    let handle = ServerHandle::new(config, app);
    let mut phase = handle.phase_watch();
    let (tx, rx) = signals::channel();
    let task = tokio::spawn(handle.run(rx));

    let state = tokio::time::timeout(Duration::from_secs(5), phase.wait_for(LifecyclePhase::Serving))
        .await
        .expect("server did not start in time")
        .expect("server failed to start");

    RunningServer {
        signals: tx,
        phase,
        addr: state.local_addr.expect("serving without a local address"),
        task,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
