//! Append-only output file for one collector
//!
//! Rotation tools such as newsyslog rename the file without copytruncate,
//! so the old handle keeps writing to the renamed file until it is
//! reopened. `reopen` and `write` share one lock: a write lands entirely
//! in the old file or entirely in the new one.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("error opening file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file is not open: {path}")]
    NotOpen { path: PathBuf },
    #[error("error writing to file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct OutputSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl OutputSink {
    /// Open `path` for append, creating it if needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the current handle and open a fresh one at the same path
    ///
    /// If opening fails the sink is left without a handle and writes fail
    /// with [`SinkError::NotOpen`] until a later reopen succeeds.
    pub async fn reopen(&self) -> Result<(), SinkError> {
        let mut guard = self.file.lock().await;
        // Dropping the old handle closes it; close errors are not observable here.
        drop(guard.take());
        *guard = Some(open_append(&self.path)?);
        debug!(path = %self.path.display(), "Reopened output file");
        Ok(())
    }

    /// Append `data` in full
    pub async fn write(&self, data: &[u8]) -> Result<(), SinkError> {
        let mut guard = self.file.lock().await;
        let file = guard.as_mut().ok_or_else(|| SinkError::NotOpen {
            path: self.path.clone(),
        })?;

        let write_err = |source| SinkError::Write {
            path: self.path.clone(),
            source,
        };
        file.write_all(data).map_err(write_err)?;
        file.sync_data().map_err(write_err)
    }

    pub async fn is_open(&self) -> bool {
        self.file.lock().await.is_some()
    }
}

fn open_append(path: &Path) -> Result<File, SinkError> {
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })
}
