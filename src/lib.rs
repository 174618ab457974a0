//! Any Business service runtime.
//!
//! Runs one HTTP listener from an environment-driven configuration and shuts
//! it down safely on operator signal or listener failure.
//!
//! # Architecture Overview
//!
//! ```text
//!   env / .env ──▶ config ──▶ ConfigRegistry ──▶ Arc<ServiceConfig>
//!                                                      │
//!                        ┌─────────────────────────────┤
//!                        ▼                             ▼
//!                  http::app()                lifecycle::ServerHandle
//!          (routes + middleware stack)          │          ▲
//!                        │                      │          │ signals
//!                        └──────────▶ net::Listener ──▶ http::HttpServer
//!
//!   Cross-cutting: observability (logging, metrics, spans), security
//!   (trusted proxies, CORS, limits)
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{ConfigRegistry, ServiceConfig};
pub use lifecycle::{ExitOutcome, ServerHandle};
