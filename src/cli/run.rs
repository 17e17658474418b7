//! Run command - the agent in the foreground

use oslog_collector::{pidfile, Agent};
use std::path::Path;
use tracing::info;

pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if let Some(pid) = running_pid(&config) {
        anyhow::bail!("oslog-collector is already running (PID: {pid})");
    }

    for c in &config.collectors {
        info!(
            collector = %c.name,
            interval_secs = c.interval,
            output = %c.output_file.display(),
            "Configured collector"
        );
    }

    let agent = Agent::from_config(config)?.with_os_signals()?;
    agent.run().await?;
    Ok(())
}

/// PID of another live agent recorded in the config's pid file
fn running_pid(config: &oslog_collector::Config) -> Option<i32> {
    let pid = pidfile::read(config.pid_file.as_deref()?).ok()?;
    (pid != std::process::id() as i32 && pidfile::is_alive(pid)).then_some(pid)
}
