//! Durable collection cursor
//!
//! One small JSON record per collector:
//! `{"last_timestamp":"2025-01-29 00:00:00"}`. The timestamp is the
//! inclusive start of the next collection window.

use crate::clock::{Clock, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("error reading position file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing position file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("error marshaling position: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("error writing position file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(with = "timestamp")]
    pub last_timestamp: NaiveDateTime,
}

impl Position {
    pub fn new(last_timestamp: NaiveDateTime) -> Self {
        Self { last_timestamp }
    }

    /// Restore the position at `path`, or start from "now" when there is none yet
    pub fn load(path: &Path, clock: &dyn Clock) -> Result<Self, PositionError> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let position = Self::new(clock.now());
                debug!(path = %path.display(), start = %position.last_timestamp, "No position file, starting from now");
                return Ok(position);
            }
            Err(source) => {
                return Err(PositionError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&data).map_err(|source| PositionError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace the record at `path`
    ///
    /// The record is written to a sibling file first and renamed into place,
    /// so readers see either the old or the new record, never a torn one.
    pub fn save(&self, path: &Path) -> Result<(), PositionError> {
        let data = serde_json::to_vec(self).map_err(PositionError::Encode)?;
        let tmp = staging_path(path);
        let write_err = |source| PositionError::Write {
            path: path.to_path_buf(),
            source,
        };

        std::fs::write(&tmp, &data).map_err(write_err)?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            write_err(e)
        })
    }

    /// Move the cursor to `end`; an older `end` leaves it where it is
    pub fn advance_to(&mut self, end: NaiveDateTime) {
        if end > self.last_timestamp {
            self.last_timestamp = end;
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 29)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_missing_file_starts_from_now() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(t0());

        let pos = Position::load(&tmp.path().join("foo.pos"), &clock).unwrap();
        assert_eq!(pos.last_timestamp, t0());
    }

    #[test]
    fn test_save_writes_single_field_record() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("foo.pos");

        Position::new(t0()).save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"last_timestamp":"2025-01-29 00:00:00"}"#);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("foo.pos");
        let later = t0() + Duration::seconds(3600);

        Position::new(later).save(&path).unwrap();
        let clock = ManualClock::new(t0());
        assert_eq!(Position::load(&path, &clock).unwrap().last_timestamp, later);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("foo.pos");
        std::fs::write(&path, "{\"last_timestamp\":\"yesterday\"}").unwrap();

        let err = Position::load(&path, &ManualClock::new(t0())).unwrap_err();
        assert!(matches!(err, PositionError::Parse { .. }));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing").join("foo.pos");
        assert!(matches!(
            Position::new(t0()).save(&path),
            Err(PositionError::Write { .. })
        ));
    }

    #[test]
    fn test_advance_never_goes_backwards() {
        let mut pos = Position::new(t0());
        pos.advance_to(t0() + Duration::seconds(60));
        pos.advance_to(t0());
        assert_eq!(pos.last_timestamp, t0() + Duration::seconds(60));
    }
}
