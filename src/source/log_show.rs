//! `log show` source (macOS unified logging)
//!
//! Builds `log show --predicate P --start S --end E --style ndjson [--info]`
//! and runs it once per window.

use super::{LogQuery, LogSource, OutputStyle, SourceError};
use crate::clock::format_timestamp;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDateTime;
use tokio::process::Command;
use tracing::{debug, warn};

const DEFAULT_PROGRAM: &str = "log";

/// Ordered argument list for the `log` command
#[derive(Debug, Clone)]
pub struct LogCommandBuilder {
    command: Vec<String>,
}

impl LogCommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            command: vec![program.into(), "show".to_string()],
        }
    }

    pub fn predicate(mut self, predicate: &str) -> Self {
        self.push("--predicate", predicate.to_string());
        self
    }

    pub fn start(mut self, start: &NaiveDateTime) -> Self {
        self.push("--start", format_timestamp(start));
        self
    }

    pub fn end(mut self, end: &NaiveDateTime) -> Self {
        self.push("--end", format_timestamp(end));
        self
    }

    pub fn style(mut self, style: OutputStyle) -> Self {
        self.push("--style", style.to_string());
        self
    }

    pub fn info_level(mut self, enable: bool) -> Self {
        if enable {
            self.command.push("--info".to_string());
        }
        self
    }

    /// Arguments for one window, in the order the collector uses
    pub fn for_query(self, query: &LogQuery) -> Self {
        self.predicate(&query.predicate)
            .start(&query.start)
            .end(&query.end)
            .style(query.style)
            .info_level(query.info_level)
    }

    pub fn build(self) -> Vec<String> {
        self.command
    }

    fn push(&mut self, flag: &str, value: String) {
        self.command.push(flag.to_string());
        self.command.push(value);
    }
}

impl Default for LogCommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

/// Runs the `log` command for each window
#[derive(Debug, Clone)]
pub struct LogShow {
    program: String,
}

impl LogShow {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for LogShow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogSource for LogShow {
    async fn collect(&self, query: &LogQuery) -> Result<Bytes, SourceError> {
        let args = LogCommandBuilder::new(self.program.clone())
            .for_query(query)
            .build();
        debug!(command = ?args, "Running log command");

        let output = Command::new(&args[0])
            .args(&args[1..])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| SourceError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut combined = output.stdout;
            combined.extend_from_slice(&output.stderr);
            return Err(SourceError::Failed {
                status: output.status,
                output: String::from_utf8_lossy(&combined).into_owned(),
            });
        }

        if !output.stderr.is_empty() {
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "log command wrote to stderr"
            );
        }

        Ok(Bytes::from(output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 29)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn query(info_level: bool) -> LogQuery {
        LogQuery {
            predicate: "subsystem == 'com.apple.mdns'".to_string(),
            start: at(0, 0, 0),
            end: at(0, 1, 0),
            style: OutputStyle::Ndjson,
            info_level,
        }
    }

    #[test]
    fn test_builder_simple() {
        assert_eq!(LogCommandBuilder::default().build(), vec!["log", "show"]);
    }

    #[test]
    fn test_builder_with_predicate() {
        assert_eq!(
            LogCommandBuilder::default()
                .predicate("subsystem == 'com.apple.mdns'")
                .build(),
            vec!["log", "show", "--predicate", "subsystem == 'com.apple.mdns'"]
        );
    }

    #[test]
    fn test_builder_with_predicate_and_level() {
        assert_eq!(
            LogCommandBuilder::default()
                .predicate("subsystem == 'com.apple.mdns'")
                .info_level(true)
                .build(),
            vec![
                "log",
                "show",
                "--predicate",
                "subsystem == 'com.apple.mdns'",
                "--info"
            ]
        );
    }

    #[test]
    fn test_builder_for_query() {
        assert_eq!(
            LogCommandBuilder::default().for_query(&query(false)).build(),
            vec![
                "log",
                "show",
                "--predicate",
                "subsystem == 'com.apple.mdns'",
                "--start",
                "2025-01-29 00:00:00",
                "--end",
                "2025-01-29 00:01:00",
                "--style",
                "ndjson",
            ]
        );
        assert_eq!(
            LogCommandBuilder::default()
                .for_query(&query(true))
                .build()
                .last()
                .map(String::as_str),
            Some("--info")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_program_and_returns_stdout() {
        // echo prints its arguments, which stands in for the log tool
        let out = LogShow::with_program("echo")
            .collect(&query(true))
            .await
            .unwrap();
        assert_eq!(
            out,
            "show --predicate subsystem == 'com.apple.mdns' --start 2025-01-29 00:00:00 \
             --end 2025-01-29 00:01:00 --style ndjson --info\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let err = LogShow::with_program("false")
            .collect(&query(false))
            .await
            .unwrap_err();
        match err {
            SourceError::Failed { status, .. } => assert!(!status.success()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let err = LogShow::with_program("/nonexistent/oslog-collector-log")
            .collect(&query(false))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Launch { .. }));
    }
}
