//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Register → Init logging → Build app → Install signals
//!
//! Run (orchestrator.rs):
//!     Bind ─┬─ fail → Failed
//!           └─ ok → Serving ── first of (signal | listener error) ──┐
//!                                                                  ▼
//! Shutdown (shutdown.rs):
//!     Stop accepting → Drain within grace → Stopped
//!                    ↘ deadline / second signal → ForcedClose → Stopped
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGHUP/SIGQUIT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: forced close after deadline

pub mod orchestrator;
pub mod phase;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use orchestrator::{ExitOutcome, LifecycleError, ServerHandle, TerminationEvent};
pub use phase::{LifecyclePhase, PhaseState, PhaseWatch};
pub use shutdown::ShutdownError;
pub use signals::{SignalSender, Signals, TerminationSignal};
pub use startup::{StartupError, StartupOptions};
