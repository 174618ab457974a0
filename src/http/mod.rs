//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (hyper auto builder, body and response deadlines)
//!     → app(): panic recovery → request.rs (request ID) → trace span
//!              → client IP → CORS
//!     → router level: body limit → request metrics
//!     → routes.rs (greeting, probes, metrics)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - The route table knows nothing about connections or shutdown
//! - Middleware is applied once here so the orchestrator receives a finished handler

pub mod request;
pub mod routes;
pub mod server;

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
    middleware, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::observability::{metrics::track_metrics, tracing::make_request_span};
use crate::security::{cors_layer, limits, proxies::client_ip_middleware};

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{HttpServer, ServeError};

/// Build the complete application handler for `config`.
///
/// `metrics` enables the `/metrics` route when present.
pub fn app(config: &ServiceConfig, metrics: Option<PrometheusHandle>) -> Router {
    let trusted = Arc::new(config.listener.trusted_proxies.clone());

    let layers = ServiceBuilder::new()
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(request::set_request_id_layer())
        .layer(request::propagate_request_id_layer())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(middleware::from_fn_with_state(trusted, client_ip_middleware))
        .layer(cors_layer(config));

    // The body limit changes the response body type, so it wraps the router
    // directly instead of sitting inside the stack above.
    routes::router(config, metrics)
        .layer(middleware::from_fn(track_metrics))
        .layer(limits::body_limit_layer(config.security.max_body_size))
        .layer(layers)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %details, "Handler panicked");

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from("Internal Server Error"))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_becomes_internal_server_error() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = handle_panic(Box::new(String::from("boom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
