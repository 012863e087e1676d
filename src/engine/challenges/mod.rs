//! Daily challenges: random assignment from a template catalogue, clamped
//! progress and exactly-once claiming

pub mod assigner;
pub mod templates;

pub use assigner::{ChallengeAssignment, Challenges};
pub use templates::{ChallengeMetric, ChallengeTemplate};
