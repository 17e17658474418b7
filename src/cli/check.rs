//! Check command - validates a config file

use std::path::Path;

pub fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    println!("{}: OK", config_path.display());
    if let Some(ref pid_file) = config.pid_file {
        println!("pid_file: {}", pid_file.display());
    }
    println!("{} collector(s):", config.collectors.len());
    for c in &config.collectors {
        println!(
            "  {} every {}s{} -> {}",
            c.name,
            c.interval,
            if c.with_info_level { " (info)" } else { "" },
            c.output_file.display()
        );
        println!("    predicate: {}", c.predicate);
    }

    Ok(())
}
