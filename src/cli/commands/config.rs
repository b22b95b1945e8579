//! Config command - show configuration

use crate::cli::args::ConfigAction;
use crate::config::{Config, ConfigManager};
use crate::error::VolumeResult;

/// Execute the config command
pub fn execute(
    action: Option<ConfigAction>,
    config: &Config,
    manager: &ConfigManager,
) -> VolumeResult<()> {
    match action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
    }
    Ok(())
}

fn show_config(config: &Config) -> VolumeResult<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}
