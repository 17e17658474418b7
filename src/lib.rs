//! oslog-collector
//!
//! Periodically extracts entries from the macOS unified log for a set of
//! independently configured collectors, appends them to per-collector
//! files, and records how far each collector got so a restart resumes
//! where the last run stopped.

pub mod agent;
pub mod clock;
pub mod collector;
pub mod config;
pub mod control;
pub mod pidfile;
pub mod position;
pub mod scheduler;
pub mod sink;
pub mod source;

pub use agent::{Agent, AgentError};
pub use clock::{Clock, ManualClock, SystemClock, TIMESTAMP_FORMAT};
pub use collector::{Collector, CollectorError};
pub use config::{CollectorSpec, Config, ConfigError};
pub use control::{ControlEvent, ControlHandle, ControlPlane, ControlState};
pub use position::Position;
pub use sink::OutputSink;
pub use source::{LogQuery, LogShow, LogSource, OutputStyle, SourceError, StaticSource};
