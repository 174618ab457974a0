//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT, SIGTERM, SIGHUP, SIGQUIT)
//! - Translate signals to internal events
//! - Provide an in-process source so tests can "send" signals
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Every recognized signal requests shutdown; a second one forces it
//! - Handlers are installed before the listener binds

use std::fmt;
use std::io;

use tokio::sync::mpsc;

/// Termination signals the server reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
    HangUp,
    Quit,
}

impl TerminationSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::HangUp => "SIGHUP",
            TerminationSignal::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stream of termination signals.
#[derive(Debug)]
pub struct Signals {
    source: Source,
}

#[derive(Debug)]
enum Source {
    #[cfg(unix)]
    Os {
        interrupt: tokio::signal::unix::Signal,
        terminate: tokio::signal::unix::Signal,
        hang_up: tokio::signal::unix::Signal,
        quit: tokio::signal::unix::Signal,
    },
    #[cfg(not(unix))]
    CtrlC,
    Channel(mpsc::UnboundedReceiver<TerminationSignal>),
}

impl Signals {
    /// Install handlers for the process signals.
    #[cfg(unix)]
    pub fn os() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            source: Source::Os {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
                hang_up: signal(SignalKind::hangup())?,
                quit: signal(SignalKind::quit())?,
            },
        })
    }

    /// Install handlers for the process signals.
    #[cfg(not(unix))]
    pub fn os() -> io::Result<Self> {
        Ok(Self {
            source: Source::CtrlC,
        })
    }

    /// Wait for the next signal. `None` once the source can produce no more.
    pub async fn recv(&mut self) -> Option<TerminationSignal> {
        match &mut self.source {
            #[cfg(unix)]
            Source::Os {
                interrupt,
                terminate,
                hang_up,
                quit,
            } => tokio::select! {
                Some(()) = interrupt.recv() => Some(TerminationSignal::Interrupt),
                Some(()) = terminate.recv() => Some(TerminationSignal::Terminate),
                Some(()) = hang_up.recv() => Some(TerminationSignal::HangUp),
                Some(()) = quit.recv() => Some(TerminationSignal::Quit),
                else => None,
            },
            #[cfg(not(unix))]
            Source::CtrlC => tokio::signal::ctrl_c()
                .await
                .ok()
                .map(|()| TerminationSignal::Interrupt),
            Source::Channel(rx) => rx.recv().await,
        }
    }
}

/// Sending half of an in-process signal source.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<TerminationSignal>,
}

impl SignalSender {
    /// Deliver `signal`. Returns `false` once the receiving side is gone.
    pub fn send(&self, signal: TerminationSignal) -> bool {
        self.tx.send(signal).is_ok()
    }

    /// Resolves once the receiving side has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Create an in-process signal source.
pub fn channel() -> (SignalSender, Signals) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        SignalSender { tx },
        Signals {
            source: Source::Channel(rx),
        },
    )
}
