//! PID file bookkeeping

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("failed to access pid file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pid file {path} does not contain a process id: {content:?}")]
    Invalid { path: PathBuf, content: String },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PidFileError {
    let path = path.to_path_buf();
    move |source| PidFileError::Io { path, source }
}

/// Record the current process ID at `path`
pub fn write(path: &Path) -> Result<(), PidFileError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(io_err(path))?;
    write!(file, "{}", std::process::id()).map_err(io_err(path))
}

pub fn read(path: &Path) -> Result<i32, PidFileError> {
    let content = fs::read_to_string(path).map_err(io_err(path))?;
    content.trim().parse().map_err(|_| PidFileError::Invalid {
        path: path.to_path_buf(),
        content,
    })
}

pub fn remove(path: &Path) -> Result<(), PidFileError> {
    fs::remove_file(path).map_err(io_err(path))
}

/// Whether a process with `pid` exists
pub fn is_alive(pid: i32) -> bool {
    // Signal 0 performs the permission and existence checks only
    unsafe { libc::kill(pid, 0) == 0 }
}

/// Send `signal` to `pid`
pub fn send_signal(pid: i32, signal: libc::c_int) -> std::io::Result<()> {
    if unsafe { libc::kill(pid, signal) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_write_read_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("agent.pid");

        write(&path).unwrap();
        assert_eq!(read(&path).unwrap(), std::process::id() as i32);
        assert_eq!(
            fs::metadata(&path).unwrap().permissions().mode() & 0o777,
            0o600
        );

        remove(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_write_truncates_previous_pid() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("agent.pid");
        fs::write(&path, "99999999999").unwrap();

        write(&path).unwrap();
        assert_eq!(read(&path).unwrap(), std::process::id() as i32);
    }

    #[test]
    fn test_garbage_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("agent.pid");
        fs::write(&path, "not-a-pid\n").unwrap();

        assert!(matches!(read(&path), Err(PidFileError::Invalid { .. })));
    }

    #[test]
    fn test_current_process_is_alive() {
        assert!(is_alive(std::process::id() as i32));
        // Signal 0 to ourselves is always permitted
        send_signal(std::process::id() as i32, 0).unwrap();
    }
}
