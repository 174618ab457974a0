//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing.rs (request spans with correlation IDs)
//!
//! Consumers:
//!     → stdout (console locally, JSON lines when deployed)
//!     → /metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all request spans
//! - Metrics are cheap (atomic increments) and no-ops when not installed

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use logging::{init_logging, parse_log_level, LoggingError};
