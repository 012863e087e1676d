//! Daily challenge templates and the built-in catalogue

use serde::{Deserialize, Serialize};

use crate::engine::models::{ActivityKind, Reward};

/// What a challenge measures over the assigned day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChallengeMetric {
    /// Number of activities of one kind.
    Count { kind: ActivityKind },
    /// XP earned.
    Xp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub metric: ChallengeMetric,
    pub target: i64,
    #[serde(default = "default_min_grade")]
    pub min_grade: i64,
    #[serde(default = "default_max_grade")]
    pub max_grade: i64,
    #[serde(default)]
    pub reward: Reward,
}

fn default_min_grade() -> i64 {
    1
}

fn default_max_grade() -> i64 {
    12
}

impl ChallengeTemplate {
    pub fn valid_for(&self, grade: i64) -> bool {
        grade >= self.min_grade && grade <= self.max_grade
    }
}

/// Built-in templates. Every grade in 1..=12 is covered by enough templates
/// to fill a full daily set.
pub fn built_in() -> Vec<ChallengeTemplate> {
    use ActivityKind::*;

    let template = |id: &str,
                    name: &str,
                    description: &str,
                    metric: ChallengeMetric,
                    target: i64,
                    grades: (i64, i64),
                    xp: i64,
                    gems: i64| ChallengeTemplate {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        metric,
        target,
        min_grade: grades.0,
        max_grade: grades.1,
        reward: Reward {
            xp,
            gems,
            title: None,
        },
    };

    vec![
        template(
            "lesson_sprint",
            "Lesson Sprint",
            "Complete 3 lessons today",
            ChallengeMetric::Count { kind: LessonCompleted },
            3,
            (1, 12),
            30,
            5,
        ),
        template(
            "lesson_marathon",
            "Lesson Marathon",
            "Complete 5 lessons today",
            ChallengeMetric::Count { kind: LessonCompleted },
            5,
            (7, 12),
            60,
            10,
        ),
        template(
            "xp_hunter",
            "XP Hunter",
            "Earn 50 XP today",
            ChallengeMetric::Xp,
            50,
            (1, 12),
            20,
            5,
        ),
        template(
            "overachiever",
            "Overachiever",
            "Earn 150 XP today",
            ChallengeMetric::Xp,
            150,
            (5, 12),
            50,
            10,
        ),
        template(
            "quiz_time",
            "Quiz Time",
            "Finish a quiz today",
            ChallengeMetric::Count { kind: QuizCompleted },
            1,
            (1, 12),
            25,
            5,
        ),
        template(
            "problem_solver",
            "Problem Solver",
            "Work through 10 exercises today",
            ChallengeMetric::Count { kind: ExerciseAttempt },
            10,
            (1, 6),
            25,
            5,
        ),
        template(
            "problem_crusher",
            "Problem Crusher",
            "Work through 25 exercises today",
            ChallengeMetric::Count { kind: ExerciseAttempt },
            25,
            (7, 12),
            60,
            10,
        ),
        template(
            "practice_makes_perfect",
            "Practice Makes Perfect",
            "Do 2 practice sessions today",
            ChallengeMetric::Count { kind: PracticeSession },
            2,
            (1, 12),
            30,
            5,
        ),
    ]
}
