//! Built-in routes.
//!
//! - `GET /`        greeting with service name and version
//! - `GET /ping`    `pong`
//! - `GET /alive`   liveness, always `204 No Content`
//! - `GET /ready`   readiness, always `204 No Content`
//! - `GET /metrics` Prometheus text, only when a recorder handle is supplied
//!
//! Everything except `/metrics` is served as `text/html; charset=utf-8`.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::ServiceConfig;

/// Build the route table for `config`.
pub fn router(config: &ServiceConfig, metrics: Option<PrometheusHandle>) -> Router {
    let welcome = format!("Welcome to {} V{}", config.app.name, config.app.version);

    let router = Router::new()
        .route("/", get(move || std::future::ready(Html(welcome.clone()))))
        .route("/ping", get(ping))
        .route("/alive", get(alive))
        .route("/ready", get(ready));

    match metrics {
        Some(handle) => router.route(
            "/metrics",
            get(move || std::future::ready(handle.render())),
        ),
        None => router,
    }
}

const TEXT_HTML: &str = "text/html; charset=utf-8";

async fn ping() -> Html<&'static str> {
    Html("pong")
}

async fn alive() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, [(header::CONTENT_TYPE, TEXT_HTML)])
}

// Dependency checks are not wired in yet; a started process is ready.
async fn ready() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, [(header::CONTENT_TYPE, TEXT_HTML)])
}
