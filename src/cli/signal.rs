//! Reopen and stop commands - signal the running agent

use oslog_collector::pidfile;
use std::path::Path;
use tracing::info;

pub fn reopen(config_path: &Path) -> anyhow::Result<()> {
    let pid = send(config_path, libc::SIGUSR1)?;
    info!(pid, "Asked oslog-collector to reopen its log files");
    Ok(())
}

pub fn stop(config_path: &Path) -> anyhow::Result<()> {
    let pid = send(config_path, libc::SIGTERM)?;
    info!(pid, "Asked oslog-collector to stop");
    Ok(())
}

fn send(config_path: &Path, signal: libc::c_int) -> anyhow::Result<i32> {
    let config = super::load_config(config_path)?;
    let pid = pidfile::read(super::pid_file(&config)?)?;

    if !pidfile::is_alive(pid) {
        anyhow::bail!("oslog-collector is not running (stale PID {pid})");
    }
    pidfile::send_signal(pid, signal)?;
    Ok(pid)
}
