//! Log sources
//!
//! A source answers one question: which log entries matching a predicate
//! were recorded between two timestamps. The collector never looks inside
//! the returned bytes.

pub mod log_show;

pub use log_show::{LogCommandBuilder, LogShow};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDateTime;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("error launching log command {program:?}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("error executing log command: {status}, output: {output}")]
    Failed { status: ExitStatus, output: String },
}

/// Encoding requested from `log show --style`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStyle {
    Default,
    Compact,
    Json,
    /// One JSON record per line
    #[default]
    Ndjson,
    Syslog,
}

impl OutputStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStyle::Default => "default",
            OutputStyle::Compact => "compact",
            OutputStyle::Json => "json",
            OutputStyle::Ndjson => "ndjson",
            OutputStyle::Syslog => "syslog",
        }
    }
}

impl std::fmt::Display for OutputStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One collection window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub predicate: String,
    /// Inclusive start
    pub start: NaiveDateTime,
    /// Exclusive end
    pub end: NaiveDateTime,
    pub style: OutputStyle,
    /// Include info-level entries
    pub info_level: bool,
}

/// Trait for log sources
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch the raw records for `query`
    async fn collect(&self, query: &LogQuery) -> Result<Bytes, SourceError>;
}

/// Returns the same bytes for every window
#[derive(Debug, Clone)]
pub struct StaticSource {
    output: Bytes,
}

impl StaticSource {
    pub fn new(output: impl Into<Bytes>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

#[async_trait]
impl LogSource for StaticSource {
    async fn collect(&self, _query: &LogQuery) -> Result<Bytes, SourceError> {
        Ok(self.output.clone())
    }
}
