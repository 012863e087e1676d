//! Init command implementation

use std::path::PathBuf;

use anyhow::{bail, Result};

use motiva::config::{global_dir, DEFAULT_CONFIG};

/// Initialize a new motiva configuration
/// By default creates the global config at ~/.motiva/config.toml
/// Use --config to specify a custom path
pub async fn init_command(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = config_path.unwrap_or_else(|| global_dir().join("config.toml"));

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    println!("Created: {}", config_path.display());

    Ok(())
}
