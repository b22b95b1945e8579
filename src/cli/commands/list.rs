//! List command - show registered volumes

use crate::cli::args::OutputFormat;
use crate::config::Config;
use crate::error::VolumeResult;
use crate::registry::{MountRecord, VolumeRegistry};
use console::style;

/// Execute the list command
pub async fn execute(format: OutputFormat, config: &Config) -> VolumeResult<()> {
    let registry = VolumeRegistry::open(config.state_file()).await;
    let volumes = registry.list().await;

    if volumes.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("No registered volumes"),
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(&volumes),
        OutputFormat::Json => print_json(&volumes)?,
        OutputFormat::Plain => print_plain(&volumes),
    }

    Ok(())
}

fn print_table(volumes: &[MountRecord]) {
    println!(
        "{:<32} {:<8} {}",
        style("VOLUME").bold(),
        style("MOUNTS").bold(),
        style("PATH").bold()
    );
    println!("{}", "-".repeat(72));

    for volume in volumes {
        let mounts = match volume.reference_count {
            n if n > 0 => style(n.to_string()).green(),
            0 => style("0".to_string()).dim(),
            n => style(n.to_string()).red(),
        };
        println!(
            "{:<32} {:<8} {}",
            volume.volume_name,
            mounts,
            volume.path.display()
        );
    }

    println!();
    println!("{} volume(s)", volumes.len());
}

fn print_json(volumes: &[MountRecord]) -> VolumeResult<()> {
    let json = serde_json::to_string_pretty(volumes)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(volumes: &[MountRecord]) {
    for volume in volumes {
        println!("{}", volume.volume_name);
    }
}
