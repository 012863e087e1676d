//! The engagement engine: hearts, streaks, leaderboards, achievements and
//! daily challenges over one SQLite database
//!
//! `Engine` wires the shared database handle and the definition catalogue
//! into one manager per subsystem. Managers are cheap clones over the same
//! connection; all cross-record consistency rules live inside their
//! transactions, not in this facade.

pub mod achievements;
pub mod activity;
pub mod catalog;
pub mod challenges;
pub mod dates;
pub mod db;
pub mod error;
pub mod hearts;
pub mod leaderboard;
pub mod levels;
pub mod maintenance;
pub mod models;
pub mod profile;
pub mod streaks;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::EngineConfig;
pub use error::{EngineError, EngineResult};

pub struct Engine {
    db: db::GameDb,
    config: EngineConfig,
    catalog: Arc<catalog::Catalog>,
    hearts: hearts::Hearts,
    streaks: streaks::Streaks,
    leaderboards: leaderboard::Leaderboards,
    achievements: achievements::Achievements,
    challenges: challenges::Challenges,
    activity: activity::ActivityLog,
    profiles: profile::Profiles,
}

impl Engine {
    /// Open the engine at the default location, with catalogue overlays
    /// from the global config directory.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let db = db::GameDb::open_default()?;
        let catalog = catalog::Catalog::from_dir(&crate::config::global_dir())
            .context("loading catalogue overlays")?;
        Ok(Self::assemble(db, catalog, config))
    }

    /// Open against a specific database file with the built-in catalogue.
    pub fn with_path(path: &Path, config: EngineConfig) -> Result<Self> {
        let db = db::GameDb::open(path)?;
        Ok(Self::assemble(db, catalog::Catalog::built_in(), config))
    }

    /// Throwaway in-memory engine for tests and simulations.
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        let db = db::GameDb::open_in_memory()?;
        Ok(Self::assemble(db, catalog::Catalog::built_in(), config))
    }

    fn assemble(db: db::GameDb, catalog: catalog::Catalog, config: EngineConfig) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            hearts: hearts::Hearts::new(db.clone(), config.hearts.clone()),
            streaks: streaks::Streaks::new(db.clone(), config.streak.clone()),
            leaderboards: leaderboard::Leaderboards::new(db.clone(), config.leaderboard.clone()),
            achievements: achievements::Achievements::new(db.clone(), catalog.clone()),
            challenges: challenges::Challenges::new(
                db.clone(),
                catalog.clone(),
                config.challenges.clone(),
            ),
            activity: activity::ActivityLog::new(db.clone()),
            profiles: profile::Profiles::new(db.clone()),
            db,
            config,
            catalog,
        }
    }

    pub fn hearts(&self) -> &hearts::Hearts {
        &self.hearts
    }

    pub fn streaks(&self) -> &streaks::Streaks {
        &self.streaks
    }

    pub fn leaderboards(&self) -> &leaderboard::Leaderboards {
        &self.leaderboards
    }

    pub fn achievements(&self) -> &achievements::Achievements {
        &self.achievements
    }

    pub fn challenges(&self) -> &challenges::Challenges {
        &self.challenges
    }

    pub fn activity(&self) -> &activity::ActivityLog {
        &self.activity
    }

    pub fn profiles(&self) -> &profile::Profiles {
        &self.profiles
    }

    pub fn catalog(&self) -> &catalog::Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn db(&self) -> &db::GameDb {
        &self.db
    }
}
