//! Status command - shows agent status

use oslog_collector::{pidfile, Position, SystemClock};
use std::path::Path;

pub fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let pid_file = super::pid_file(&config)?;

    println!("oslog-collector status");
    println!("──────────────────────");

    match pidfile::read(pid_file) {
        Ok(pid) if pidfile::is_alive(pid) => println!("Status: running (PID {pid})"),
        Ok(pid) => println!("Status: stopped (stale PID {pid} in {})", pid_file.display()),
        Err(_) => println!("Status: stopped"),
    }

    println!();
    for c in &config.collectors {
        let position = if c.position_file.exists() {
            match Position::load(&c.position_file, &SystemClock) {
                Ok(p) => p.last_timestamp.to_string(),
                Err(e) => format!("unreadable ({e})"),
            }
        } else {
            "not started".to_string()
        };
        println!("  {:<20} last collected up to: {}", c.name, position);
    }

    Ok(())
}
