//! Shared test utilities for engine integration tests

use std::path::PathBuf;

use tempfile::TempDir;

use motiva::config::EngineConfig;
use motiva::Engine;

pub const MS_PER_MINUTE: i64 = 60 * 1000;
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Creates an engine backed by a database file in a temp directory.
/// The directory handle must outlive the engine.
pub fn create_test_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let engine = open_at(&temp_dir);
    (temp_dir, engine)
}

/// Opens (or reopens) an engine on the database inside the temp directory.
pub fn open_at(temp_dir: &TempDir) -> Engine {
    Engine::with_path(&db_path(temp_dir), EngineConfig::default())
        .expect("Failed to open engine")
}

pub fn db_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("motiva.db")
}

/// Registers a small class of users with known placement.
pub fn seed_class(engine: &Engine, class_id: &str, grade: i64, users: &[&str]) {
    for user_id in users {
        engine
            .profiles()
            .register(user_id, Some(class_id), grade)
            .expect("Failed to register user");
    }
}
