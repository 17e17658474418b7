//! A single named collector
//!
//! Each cycle asks the source for `[last_timestamp, now)`, appends the
//! output, and only then moves the cursor to `now`. A failed cycle leaves
//! the cursor alone, so the next cycle requests the same start again.

use crate::clock::Clock;
use crate::config::CollectorSpec;
use crate::position::{Position, PositionError};
use crate::sink::{OutputSink, SinkError};
use crate::source::{LogQuery, LogSource, OutputStyle, SourceError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Style requested from the source for every window
pub const DEFAULT_STYLE: OutputStyle = OutputStyle::Ndjson;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

pub struct Collector {
    spec: CollectorSpec,
    position: Mutex<Position>,
    sink: OutputSink,
    source: Arc<dyn LogSource>,
    clock: Arc<dyn Clock>,
}

impl Collector {
    /// Restore the position and open the output file
    pub fn new(
        spec: CollectorSpec,
        source: Arc<dyn LogSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CollectorError> {
        let position = Position::load(&spec.position_file, clock.as_ref())?;
        let sink = OutputSink::open(&spec.output_file)?;

        debug!(
            collector = %spec.name,
            start = %position.last_timestamp,
            output = %spec.output_file.display(),
            "Collector ready"
        );

        Ok(Self {
            spec,
            position: Mutex::new(position),
            sink,
            source,
            clock,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &CollectorSpec {
        &self.spec
    }

    /// Current in-memory position
    pub async fn position(&self) -> Position {
        *self.position.lock().await
    }

    /// Collect one window and append it to the output file
    pub async fn collect_once(&self) -> Result<(), CollectorError> {
        let mut position = self.position.lock().await;
        let query = LogQuery {
            predicate: self.spec.predicate.clone(),
            start: position.last_timestamp,
            end: self.clock.now(),
            style: DEFAULT_STYLE,
            info_level: self.spec.with_info_level,
        };

        let output = self.source.collect(&query).await?;
        self.sink.write(&output).await?;

        position.advance_to(query.end);
        position.save(&self.spec.position_file)?;

        debug!(
            collector = %self.spec.name,
            start = %query.start,
            end = %query.end,
            bytes = output.len(),
            "Collected window"
        );
        Ok(())
    }

    /// Reopen the output file at its configured path
    pub async fn reopen(&self) -> Result<(), CollectorError> {
        self.sink.reopen().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("spec", &self.spec)
            .field("sink", &self.sink.path())
            .finish_non_exhaustive()
    }
}
