//! Lifecycle phases of a server run.
//!
//! ```text
//! Idle → Starting → Serving → GracefulShutdown → Stopped
//!           ↓                        ↓              ↑
//!         Failed                ForcedClose ────────┘
//! ```
//!
//! The coordinating task is the only writer; everyone else observes the
//! phase through a [`PhaseWatch`].

use std::fmt;
use std::net::SocketAddr;

use tokio::sync::watch;

use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Idle,
    Starting,
    Serving,
    GracefulShutdown,
    ForcedClose,
    Stopped,
    Failed,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Idle => "idle",
            LifecyclePhase::Starting => "starting",
            LifecyclePhase::Serving => "serving",
            LifecyclePhase::GracefulShutdown => "graceful_shutdown",
            LifecyclePhase::ForcedClose => "forced_close",
            LifecyclePhase::Stopped => "stopped",
            LifecyclePhase::Failed => "failed",
        }
    }

    /// `Stopped` and `Failed` end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecyclePhase::Stopped | LifecyclePhase::Failed)
    }

    pub fn can_transition_to(&self, next: LifecyclePhase) -> bool {
        use LifecyclePhase::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Serving)
                | (Starting, Failed)
                | (Serving, GracefulShutdown)
                | (GracefulShutdown, Stopped)
                | (GracefulShutdown, ForcedClose)
                | (ForcedClose, Stopped)
        )
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase plus the address actually bound, once known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseState {
    pub phase: LifecyclePhase,
    pub local_addr: Option<SocketAddr>,
}

/// Read side of the phase channel.
#[derive(Debug, Clone)]
pub struct PhaseWatch {
    rx: watch::Receiver<PhaseState>,
}

impl PhaseWatch {
    pub fn phase(&self) -> LifecyclePhase {
        self.rx.borrow().phase
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.rx.borrow().local_addr
    }

    /// Wait until `phase` is reached.
    ///
    /// Returns `None` if the run ended without ever entering `phase`.
    pub async fn wait_for(&mut self, phase: LifecyclePhase) -> Option<PhaseState> {
        self.rx.wait_for(|state| state.phase == phase).await.ok().map(|s| *s)
    }

    /// Wait for the next phase change.
    ///
    /// Changes that happen faster than the caller polls are coalesced.
    /// Returns `None` once the run is over and the last phase was seen.
    pub async fn changed(&mut self) -> Option<LifecyclePhase> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().phase)
    }

    /// Wait until the run reaches `Stopped` or `Failed`.
    pub async fn wait_terminal(&mut self) -> Option<PhaseState> {
        self.rx
            .wait_for(|state| state.phase.is_terminal())
            .await
            .ok()
            .map(|s| *s)
    }
}

/// Write side of the phase channel, owned by the coordinating task.
#[derive(Debug)]
pub(crate) struct PhaseTracker {
    tx: watch::Sender<PhaseState>,
    service_name: String,
}

impl PhaseTracker {
    pub(crate) fn new(service_name: String) -> Self {
        let (tx, _) = watch::channel(PhaseState {
            phase: LifecyclePhase::Idle,
            local_addr: None,
        });
        Self { tx, service_name }
    }

    pub(crate) fn watch(&self) -> PhaseWatch {
        PhaseWatch {
            rx: self.tx.subscribe(),
        }
    }

    pub(crate) fn current(&self) -> LifecyclePhase {
        self.tx.borrow().phase
    }

    pub(crate) fn enter(&self, next: LifecyclePhase) {
        let previous = self.current();
        if !previous.can_transition_to(next) {
            tracing::warn!(from = %previous, to = %next, "Unexpected lifecycle transition");
        }

        self.tx.send_modify(|state| state.phase = next);
        metrics::emit_phase_transition(&self.service_name, next.as_str());
        tracing::debug!(from = %previous, to = %next, "Lifecycle phase changed");
    }

    pub(crate) fn enter_serving(&self, local_addr: Option<SocketAddr>) {
        self.tx.send_modify(|state| state.local_addr = local_addr);
        self.enter(LifecyclePhase::Serving);
    }
}
