//! CLI command implementations

pub mod board;
pub mod init;
pub mod maintain;
pub mod simulate;
pub mod status;

use std::path::PathBuf;

use anyhow::Result;

use motiva::config::EngineConfig;
use motiva::Engine;

/// Build an engine from the global CLI options.
pub fn open_engine(db: Option<PathBuf>, config: Option<PathBuf>) -> Result<Engine> {
    let config = match config {
        Some(path) => EngineConfig::from_file(&path)?,
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            EngineConfig::from_dir(&cwd)?
        }
    };

    match db {
        Some(path) => Engine::with_path(&path, config),
        None => Engine::open(config),
    }
}
