//! Agent configuration
//!
//! ```yaml
//! pid_file: /var/run/oslog-collector.pid
//! collectors:
//!   - name: foo
//!     predicate: "process == 'foo'"
//!     output_file: /var/log/foo.log
//!     position_file: /var/lib/oslog-collector/foo.pos
//!     interval: 60
//!     with_info_level: true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: no collectors defined")]
    NoCollectors,
    #[error("invalid config: duplicate collector name: {0}")]
    DuplicateName(String),
    #[error("invalid config: collector {collector:?}: {field} is required")]
    MissingField {
        collector: String,
        field: &'static str,
    },
    #[error("invalid config: collector {collector:?}: interval must be greater than 0")]
    InvalidInterval { collector: String },
}

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Collectors, run in the order listed
    #[serde(default)]
    pub collectors: Vec<CollectorSpec>,
    /// File to write the process ID to
    #[serde(default)]
    pub pid_file: Option<PathBuf>,
}

/// One independently scheduled collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorSpec {
    pub name: String,
    /// Passed verbatim to `log show --predicate`
    pub predicate: String,
    /// File the collected entries are appended to
    pub output_file: PathBuf,
    /// File recording where the next window starts
    pub position_file: PathBuf,
    /// Seconds between collection cycles
    pub interval: u64,
    /// Include info-level entries (`log show --info`)
    #[serde(default)]
    pub with_info_level: bool,
}

impl CollectorSpec {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

impl Config {
    /// Read and validate a YAML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collectors.is_empty() {
            return Err(ConfigError::NoCollectors);
        }

        if let Some(name) = first_duplicate_name(&self.collectors) {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }

        for c in &self.collectors {
            let missing = |field| ConfigError::MissingField {
                collector: c.name.clone(),
                field,
            };

            if c.output_file.as_os_str().is_empty() {
                return Err(missing("output_file"));
            }
            if c.position_file.as_os_str().is_empty() {
                return Err(missing("position_file"));
            }
            if c.interval == 0 {
                return Err(ConfigError::InvalidInterval {
                    collector: c.name.clone(),
                });
            }
            if c.predicate.is_empty() {
                return Err(missing("predicate"));
            }
        }

        Ok(())
    }
}

/// First name that appears more than once, in configuration order
pub fn first_duplicate_name(specs: &[CollectorSpec]) -> Option<&str> {
    let mut seen = HashSet::new();
    specs
        .iter()
        .map(|s| s.name.as_str())
        .find(|name| !seen.insert(*name))
}
