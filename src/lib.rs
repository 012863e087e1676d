//! Motiva - learning engagement engine
//!
//! Motiva turns raw learning activity (lessons, exercises, quizzes, practice
//! sessions) into engagement state: a regenerating heart pool that gates
//! attempts, daily streaks with freezes and milestone bonuses, ranked
//! leaderboards over several scopes, and achievements and daily challenges
//! with claimable rewards.
//!
//! All state lives in a single SQLite database, so the engine can be
//! embedded in a backend process or driven from the bundled CLI.

pub mod config;
pub mod engine;

pub use engine::models::*;
pub use engine::{Engine, EngineError, EngineResult};
