//! Achievement definitions and the built-in catalogue

use serde::{Deserialize, Serialize};

use crate::engine::models::{ActivityKind, Reward};

/// Difficulty tier shown to students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Equality filter on one metadata key of matching activity entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub key: String,
    pub value: String,
}

/// Typed unlock predicate. Each variant carries its own parameters and is
/// dispatched with a match during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    /// Count of matching activity entries.
    Count {
        kind: ActivityKind,
        #[serde(default)]
        filter: Option<MetadataFilter>,
        target: i64,
    },
    /// Current streak length in days.
    Streak { days: i64 },
    /// Lifetime XP on the profile.
    XpTotal { target: i64 },
    /// Run of correct answers, scanned newest-first over the most recent
    /// `window` exercise attempts and stopped at the first miss.
    ConsecutiveCorrect { count: i64, window: i64 },
}

impl Requirement {
    pub fn target(&self) -> i64 {
        match self {
            Requirement::Count { target, .. } => *target,
            Requirement::Streak { days } => *days,
            Requirement::XpTotal { target } => *target,
            Requirement::ConsecutiveCorrect { count, .. } => *count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub requirement: Requirement,
    #[serde(default)]
    pub reward: Reward,
}

fn count(kind: ActivityKind, target: i64) -> Requirement {
    Requirement::Count {
        kind,
        filter: None,
        target,
    }
}

fn reward(xp: i64, gems: i64) -> Reward {
    Reward {
        xp,
        gems,
        title: None,
    }
}

fn titled(xp: i64, gems: i64, title: &str) -> Reward {
    Reward {
        xp,
        gems,
        title: Some(title.to_string()),
    }
}

/// The built-in achievement catalogue. Operators can extend or replace
/// entries through the catalogue directory overlay.
pub fn built_in() -> Vec<AchievementDefinition> {
    use ActivityKind::*;
    use Difficulty::*;

    let def = |id: &str, name: &str, description: &str, difficulty, requirement, reward| {
        AchievementDefinition {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            difficulty,
            requirement,
            reward,
        }
    };

    vec![
        def(
            "first_lesson",
            "First Steps",
            "Complete your first lesson",
            Easy,
            count(LessonCompleted, 1),
            reward(50, 10),
        ),
        def(
            "lessons_10",
            "Getting Going",
            "Complete 10 lessons",
            Easy,
            count(LessonCompleted, 10),
            reward(100, 10),
        ),
        def(
            "lessons_50",
            "Bookworm",
            "Complete 50 lessons",
            Medium,
            count(LessonCompleted, 50),
            reward(300, 25),
        ),
        def(
            "lessons_200",
            "Curriculum Conqueror",
            "Complete 200 lessons",
            Hard,
            count(LessonCompleted, 200),
            titled(1000, 100, "Conqueror"),
        ),
        def(
            "quiz_25",
            "Quiz Whiz",
            "Finish 25 quizzes",
            Medium,
            count(QuizCompleted, 25),
            reward(250, 20),
        ),
        def(
            "hard_mode_30",
            "Challenge Seeker",
            "Solve 30 hard exercises",
            Hard,
            Requirement::Count {
                kind: ExerciseAttempt,
                filter: Some(MetadataFilter {
                    key: "difficulty".to_string(),
                    value: "hard".to_string(),
                }),
                target: 30,
            },
            reward(400, 40),
        ),
        def(
            "streak_7",
            "One Week Wonder",
            "Keep a 7 day streak",
            Easy,
            Requirement::Streak { days: 7 },
            reward(100, 15),
        ),
        def(
            "streak_30",
            "Habit Builder",
            "Keep a 30 day streak",
            Medium,
            Requirement::Streak { days: 30 },
            reward(500, 50),
        ),
        def(
            "streak_100",
            "Centurion",
            "Keep a 100 day streak",
            Hard,
            Requirement::Streak { days: 100 },
            titled(2000, 200, "Centurion"),
        ),
        def(
            "xp_1000",
            "Rising Star",
            "Earn 1000 XP in total",
            Easy,
            Requirement::XpTotal { target: 1000 },
            reward(100, 10),
        ),
        def(
            "xp_10000",
            "XP Collector",
            "Earn 10000 XP in total",
            Hard,
            Requirement::XpTotal { target: 10_000 },
            reward(1000, 100),
        ),
        def(
            "sharpshooter",
            "Sharpshooter",
            "Answer 10 exercises in a row correctly",
            Medium,
            Requirement::ConsecutiveCorrect {
                count: 10,
                window: 20,
            },
            reward(300, 30),
        ),
    ]
}
