//! The collector agent process
//!
//! Builds one collector per configured spec, writes the PID file, and hands
//! the collectors to the control plane until shutdown.

use crate::clock::{Clock, SystemClock};
use crate::collector::{Collector, CollectorError};
use crate::config::{first_duplicate_name, CollectorSpec, Config};
use crate::control::{ControlHandle, ControlPlane, ControlState};
use crate::pidfile::{self, PidFileError};
use crate::source::{LogShow, LogSource};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("duplicate collector name: {0}")]
    DuplicateCollector(String),
    #[error("error creating collector {name:?}: {source}")]
    Collector {
        name: String,
        #[source]
        source: CollectorError,
    },
    #[error(transparent)]
    PidFile(#[from] PidFileError),
    #[error("error installing signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

pub struct Agent {
    config: Config,
    collectors: Vec<Arc<Collector>>,
    control: ControlPlane,
}

impl Agent {
    /// Agent reading from `log show` with the system clock
    pub fn from_config(config: Config) -> Result<Self, AgentError> {
        let source: Arc<dyn LogSource> = Arc::new(LogShow::new());
        Self::new(config, |_| Arc::clone(&source), Arc::new(SystemClock))
    }

    /// Build every collector, in configuration order
    ///
    /// Nothing is opened if two collectors share a name; any collector that
    /// fails to load its position or open its output aborts construction.
    pub fn new<F>(config: Config, mut source_for: F, clock: Arc<dyn Clock>) -> Result<Self, AgentError>
    where
        F: FnMut(&CollectorSpec) -> Arc<dyn LogSource>,
    {
        if let Some(name) = first_duplicate_name(&config.collectors) {
            return Err(AgentError::DuplicateCollector(name.to_string()));
        }

        let collectors = config
            .collectors
            .iter()
            .map(|spec| {
                Collector::new(spec.clone(), source_for(spec), Arc::clone(&clock))
                    .map(Arc::new)
                    .map_err(|source| AgentError::Collector {
                        name: spec.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            collectors,
            control: ControlPlane::new(),
        })
    }

    /// Translate SIGUSR1 / SIGINT / SIGTERM into control events
    pub fn with_os_signals(mut self) -> Result<Self, AgentError> {
        self.control = self.control.with_os_signals().map_err(AgentError::Signals)?;
        Ok(self)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn collectors(&self) -> &[Arc<Collector>] {
        &self.collectors
    }

    pub fn handle(&self) -> ControlHandle {
        self.control.handle()
    }

    pub fn state(&self) -> watch::Receiver<ControlState> {
        self.control.state()
    }

    /// Run until a shutdown event and every collector loop has exited
    pub async fn run(self) -> Result<(), AgentError> {
        let pid_file = self.config.pid_file.clone();
        if let Some(ref path) = pid_file {
            pidfile::write(path)?;
        }

        let _guard = scopeguard::guard(pid_file, |pid_file| {
            if let Some(path) = pid_file {
                if let Err(e) = pidfile::remove(&path) {
                    error!(error = %e, "Error removing PID file");
                }
            }
        });

        info!(pid = std::process::id(), collectors = self.collectors.len(), "oslog-collector agent started");
        self.control.run(self.collectors).await;
        info!("oslog-collector agent stopped");

        Ok(())
    }
}
