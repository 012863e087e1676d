//! Shared data models for the engagement engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ======== Activity log ========

/// Kind of learning activity recorded by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    LessonCompleted,
    ExerciseAttempt,
    QuizCompleted,
    PracticeSession,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::LessonCompleted => "lesson_completed",
            ActivityKind::ExerciseAttempt => "exercise_attempt",
            ActivityKind::QuizCompleted => "quiz_completed",
            ActivityKind::PracticeSession => "practice_session",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lesson_completed" => Some(ActivityKind::LessonCompleted),
            "exercise_attempt" => Some(ActivityKind::ExerciseAttempt),
            "quiz_completed" => Some(ActivityKind::QuizCompleted),
            "practice_session" => Some(ActivityKind::PracticeSession),
            _ => None,
        }
    }
}

/// One appended learning event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub user_id: String,
    pub kind: ActivityKind,
    pub xp_earned: i64,
    pub timestamp: i64,
    /// Free-form event details (difficulty, correctness, subject).
    pub metadata: serde_json::Value,
}

/// Filter for activity-log queries. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub user_id: Option<String>,
    pub kind: Option<ActivityKind>,
    /// Equality match on one metadata key.
    pub metadata: Option<(String, String)>,
    pub since_ms: Option<i64>,
    pub until_ms: Option<i64>,
}

impl ActivityFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: ActivityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata = Some((key.to_string(), value.to_string()));
        self
    }

    pub fn between(mut self, since_ms: i64, until_ms: i64) -> Self {
        self.since_ms = Some(since_ms);
        self.until_ms = Some(until_ms);
        self
    }
}

// ======== Hearts ========

/// Why a heart balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartEventReason {
    Lost,
    Refilled,
    Granted,
    Purchased,
    Unlimited,
}

impl HeartEventReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeartEventReason::Lost => "lost",
            HeartEventReason::Refilled => "refilled",
            HeartEventReason::Granted => "granted",
            HeartEventReason::Purchased => "purchased",
            HeartEventReason::Unlimited => "unlimited",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lost" => Some(HeartEventReason::Lost),
            "refilled" => Some(HeartEventReason::Refilled),
            "granted" => Some(HeartEventReason::Granted),
            "purchased" => Some(HeartEventReason::Purchased),
            "unlimited" => Some(HeartEventReason::Unlimited),
            _ => None,
        }
    }
}

/// Per-user heart record. `version` backs the optimistic write protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartState {
    pub user_id: String,
    pub current: i64,
    pub max: i64,
    pub last_refill_at: i64,
    pub refill_interval_minutes: i64,
    pub unlimited_until: Option<i64>,
    pub total_lost: i64,
    pub version: i64,
}

impl HeartState {
    pub fn is_unlimited(&self, now_ms: i64) -> bool {
        self.unlimited_until.is_some_and(|until| until > now_ms)
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }
}

/// Append-only heart history row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartEvent {
    pub timestamp: i64,
    pub delta: i64,
    pub reason: HeartEventReason,
}

/// Result of a consume call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeartOutcome {
    pub current: i64,
    pub can_continue: bool,
}

// ======== Streaks ========

/// Per-user streak record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakState {
    pub user_id: String,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_activity_date: Option<NaiveDate>,
    pub freezes_available: i64,
    /// Date a freeze was last consumed on. "Used today" is derived by
    /// comparing against the current date, so it resets itself at midnight.
    pub freeze_used_on: Option<NaiveDate>,
    pub version: i64,
}

impl StreakState {
    pub fn freeze_used_on(&self, date: NaiveDate) -> bool {
        self.freeze_used_on == Some(date)
    }
}

/// One history row per calendar day with recorded activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakDay {
    pub date: NaiveDate,
    pub maintained: bool,
    pub bonus_xp: i64,
    pub freeze_used: bool,
}

/// How a record-activity call changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakAdvance {
    /// First activity ever for this user.
    Started,
    /// Continued from yesterday.
    Extended,
    /// A gap was covered by consuming a freeze.
    FreezeUsed,
    /// A gap with no freeze available, streak restarted at 1.
    Reset,
    /// Activity was already recorded today. Successful no-op.
    AlreadyRecorded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakOutcome {
    pub advance: StreakAdvance,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub bonus_xp: i64,
}

// ======== Leaderboards ========

/// Population boundary a ranking is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    Global,
    Class,
    Grade,
    Weekly,
    Monthly,
}

impl ScopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Global => "global",
            ScopeType::Class => "class",
            ScopeType::Grade => "grade",
            ScopeType::Weekly => "weekly",
            ScopeType::Monthly => "monthly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "global" => Some(ScopeType::Global),
            "class" => Some(ScopeType::Class),
            "grade" => Some(ScopeType::Grade),
            "weekly" => Some(ScopeType::Weekly),
            "monthly" => Some(ScopeType::Monthly),
            _ => None,
        }
    }

    /// Boards over large populations keep only the top slice materialized.
    pub fn is_capped(&self) -> bool {
        matches!(
            self,
            ScopeType::Global | ScopeType::Weekly | ScopeType::Monthly
        )
    }

    pub fn requires_scope_id(&self) -> bool {
        matches!(self, ScopeType::Class | ScopeType::Grade)
    }
}

/// What a board ranks users by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Xp,
    Streak,
    Lessons,
    Accuracy,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Xp => "xp",
            Metric::Streak => "streak",
            Metric::Lessons => "lessons",
            Metric::Accuracy => "accuracy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "xp" => Some(Metric::Xp),
            "streak" => Some(Metric::Streak),
            "lessons" => Some(Metric::Lessons),
            "accuracy" => Some(Metric::Accuracy),
            _ => None,
        }
    }
}

/// Fully-qualified board key: scope type plus the class/grade id when the
/// type needs one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub scope_type: ScopeType,
    pub scope_id: Option<String>,
}

impl Scope {
    pub fn global() -> Self {
        Scope {
            scope_type: ScopeType::Global,
            scope_id: None,
        }
    }

    pub fn class(class_id: &str) -> Self {
        Scope {
            scope_type: ScopeType::Class,
            scope_id: Some(class_id.to_string()),
        }
    }

    pub fn grade(grade: i64) -> Self {
        Scope {
            scope_type: ScopeType::Grade,
            scope_id: Some(grade.to_string()),
        }
    }

    pub fn weekly() -> Self {
        Scope {
            scope_type: ScopeType::Weekly,
            scope_id: None,
        }
    }

    pub fn monthly() -> Self {
        Scope {
            scope_type: ScopeType::Monthly,
            scope_id: None,
        }
    }

    /// Storage key for the scope id column (empty string when unscoped).
    pub fn id_key(&self) -> &str {
        self.scope_id.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    /// 1-based dense rank, ties broken by ascending user id.
    pub rank: i64,
    pub score: f64,
    pub previous_rank: Option<i64>,
    /// previous_rank - rank; positive means the user climbed.
    pub rank_delta: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub scope: Scope,
    pub metric: Metric,
    pub entries: Vec<LeaderboardEntry>,
    pub total_participants: i64,
    pub computed_at: i64,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

/// A single user's position on a board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RankView {
    pub rank: i64,
    pub score: f64,
    pub percentile: i64,
}

// ======== Profiles & rewards ========

/// Per-user aggregate state: wallet, placement and title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub class_id: Option<String>,
    pub grade: i64,
    pub xp_total: i64,
    pub gems: i64,
    pub title: Option<String>,
    pub created_at: i64,
}

/// What an achievement or challenge pays out on claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reward {
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub gems: i64,
    #[serde(default)]
    pub title: Option<String>,
}
