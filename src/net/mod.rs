//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → connection.rs (task ownership, idle tracking)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     Accepted → Active → Draining → Closed
//!                       ↘ Aborted (forced close)
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection task is owned by a tracker so shutdown can drain or abort it
//! - Accept errors for a single peer never stop the listener

pub mod connection;
pub mod listener;

pub use connection::{Activity, ActivityIo, ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
