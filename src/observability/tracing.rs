//! Request spans.
//!
//! Every request gets one `http_request` span carrying the request ID
//! assigned by the request ID layer. The client IP field starts empty and is
//! filled in by the client IP middleware once proxies have been resolved.

use axum::{body::Body, http::Request};
use tracing::Span;

use crate::http::request::X_REQUEST_ID;

/// Span factory for `tower_http::trace::TraceLayer::make_span_with`.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
        client_ip = tracing::field::Empty,
    )
}
