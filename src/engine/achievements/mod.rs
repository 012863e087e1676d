//! Achievements: typed unlock requirements, full-rescan evaluation and
//! exactly-once reward claiming

pub mod definitions;
pub mod evaluator;

pub use definitions::{AchievementDefinition, Difficulty, MetadataFilter, Requirement};
pub use evaluator::{AchievementProgress, Achievements};
