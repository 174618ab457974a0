//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → proxies.rs (resolve client IP from trusted proxies)
//!     → cors.rs (origin policy, preflight)
//!     → limits.rs (body size, read and response deadlines)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - No trust in client input: forwarding headers only count from trusted peers
//! - Reject early: limits apply before handlers touch the body

pub mod cors;
pub mod limits;
pub mod proxies;

pub use cors::cors_layer;
pub use proxies::{parse_proxy_list, ClientIp, InvalidProxyError, TrustedProxy};
