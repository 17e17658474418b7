//! Signal-driven control plane
//!
//! SIGUSR1 reopens every output file (for rotation tools that do not
//! support copytruncate). SIGINT and SIGTERM stop the collectors: loops
//! finish their current window, then the plane waits for all of them.
//!
//! ```text
//! Running --shutdown--> Draining --all loops joined--> Stopped
//! Running --reopen----> Running
//! ```

use crate::collector::{Collector, CollectorError};
use crate::scheduler;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Internal events produced from signals or injected through a [`ControlHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Reopen,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Running,
    Draining,
    Stopped,
}

impl std::fmt::Display for ControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlState::Running => write!(f, "running"),
            ControlState::Draining => write!(f, "draining"),
            ControlState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Sends events to a running control plane
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlEvent>,
}

impl ControlHandle {
    /// Queue an event; returns false once the plane has stopped listening
    pub fn send(&self, event: ControlEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn reopen(&self) -> bool {
        self.send(ControlEvent::Reopen)
    }

    pub fn shutdown(&self) -> bool {
        self.send(ControlEvent::Shutdown)
    }
}

/// A collector whose output file could not be reopened
#[derive(Debug)]
pub struct ReopenFailure {
    pub collector: String,
    pub error: CollectorError,
}

/// Reopen every collector's output file, in order
///
/// A failure does not stop the remaining collectors from being reopened.
pub async fn reopen_all(collectors: &[Arc<Collector>]) -> Vec<ReopenFailure> {
    let mut failures = Vec::new();
    for collector in collectors {
        if let Err(e) = collector.reopen().await {
            error!(collector = %collector.name(), error = %e, "Error reopening log file");
            failures.push(ReopenFailure {
                collector: collector.name().to_string(),
                error: e,
            });
        }
    }
    failures
}

pub struct ControlPlane {
    tx: mpsc::UnboundedSender<ControlEvent>,
    rx: mpsc::UnboundedReceiver<ControlEvent>,
    state: watch::Sender<ControlState>,
    token: CancellationToken,
    signals: Option<OsSignals>,
}

impl ControlPlane {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ControlState::Running);
        Self {
            tx,
            rx,
            state,
            token: CancellationToken::new(),
            signals: None,
        }
    }

    /// Also listen for SIGUSR1, SIGINT and SIGTERM
    pub fn with_os_signals(mut self) -> std::io::Result<Self> {
        self.signals = Some(OsSignals::install()?);
        Ok(self)
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn state(&self) -> watch::Receiver<ControlState> {
        self.state.subscribe()
    }

    /// Token observed by every collector loop
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run the collectors until a shutdown event, then wait for them to stop
    pub async fn run(mut self, collectors: Vec<Arc<Collector>>) {
        let scheduler = tokio::spawn(scheduler::run_all(collectors.clone(), self.token.clone()));
        info!(collectors = collectors.len(), "Control plane running");

        loop {
            let event = tokio::select! {
                _ = self.token.cancelled() => break,
                event = self.rx.recv() => match event {
                    Some(event) => event,
                    // The plane holds a sender itself, so this is unreachable while it lives
                    None => ControlEvent::Shutdown,
                },
                event = next_signal(&mut self.signals) => event,
            };
            debug!(?event, "Control event");

            match event {
                ControlEvent::Reopen => {
                    let failures = reopen_all(&collectors).await;
                    if failures.is_empty() {
                        info!("Reopened log files");
                    } else {
                        warn!(failed = failures.len(), "Some log files could not be reopened");
                    }
                }
                ControlEvent::Shutdown => {
                    self.token.cancel();
                    break;
                }
            }
        }

        self.transition(ControlState::Draining);
        if let Err(e) = scheduler.await {
            error!(error = %e, "Scheduler task ended abnormally");
        }
        self.transition(ControlState::Stopped);
    }

    fn transition(&self, next: ControlState) {
        info!(state = %next, "Control plane state changed");
        self.state.send_replace(next);
    }
}

impl Default for ControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

async fn next_signal(signals: &mut Option<OsSignals>) -> ControlEvent {
    match signals {
        Some(signals) => signals.recv().await,
        None => std::future::pending().await,
    }
}

/// Process signals mapped to control events
#[cfg(unix)]
pub struct OsSignals {
    reopen: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignals {
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            reopen: signal(SignalKind::user_defined1())?,
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    pub async fn recv(&mut self) -> ControlEvent {
        tokio::select! {
            Some(()) = self.reopen.recv() => {
                info!("Received SIGUSR1");
                ControlEvent::Reopen
            }
            Some(()) = self.interrupt.recv() => {
                info!("Received SIGINT");
                ControlEvent::Shutdown
            }
            Some(()) = self.terminate.recv() => {
                info!("Received SIGTERM");
                ControlEvent::Shutdown
            }
            // All three streams closed; nothing left to wait for
            else => std::future::pending().await,
        }
    }
}

/// Only Ctrl+C is available off unix
#[cfg(not(unix))]
pub struct OsSignals;

#[cfg(not(unix))]
impl OsSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> ControlEvent {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C");
        ControlEvent::Shutdown
    }
}
