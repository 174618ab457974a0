//! Request limits.
//!
//! # Responsibilities
//! - Enforce maximum request body size
//! - Bound the time spent reading a request body
//! - Bound the time spent producing a response
//!
//! # Design Decisions
//! - Oversized bodies are rejected with 413 Payload Too Large
//! - Slow handlers are cut off with 408 Request Timeout

use std::time::Duration;

use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};

pub fn body_limit_layer(max_body_size: usize) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(max_body_size)
}

pub fn body_read_timeout_layer(read: Duration) -> RequestBodyTimeoutLayer {
    RequestBodyTimeoutLayer::new(read)
}

#[allow(deprecated)]
pub fn response_timeout_layer(write: Duration) -> TimeoutLayer {
    TimeoutLayer::new(write)
}
