//! Append-only learning-activity log
//!
//! Streaks, achievements and windowed leaderboard scores are all derived
//! from this table. Appending an event also credits the earned XP to the
//! user profile in the same transaction, so the profile's `xp_total` and
//! the log never disagree.

use rusqlite::types::ToSql;
use rusqlite::TransactionBehavior;
use tracing::debug;

use super::db::GameDb;
use super::error::EngineResult;
use super::models::{ActivityFilter, ActivityKind, ActivityRecord};

#[derive(Clone)]
pub struct ActivityLog {
    db: GameDb,
}

impl ActivityLog {
    pub fn new(db: GameDb) -> Self {
        Self { db }
    }

    /// Append an event timestamped now.
    pub fn append(
        &self,
        user_id: &str,
        kind: ActivityKind,
        xp_earned: i64,
        metadata: serde_json::Value,
    ) -> EngineResult<ActivityRecord> {
        self.append_at(user_id, kind, xp_earned, metadata, super::dates::now_ms())
    }

    /// Append an event with an explicit timestamp. Used for imports of
    /// historical events and by deterministic tests.
    pub fn append_at(
        &self,
        user_id: &str,
        kind: ActivityKind,
        xp_earned: i64,
        metadata: serde_json::Value,
        timestamp_ms: i64,
    ) -> EngineResult<ActivityRecord> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let metadata_text = metadata.to_string();
        tx.execute(
            "INSERT INTO activity_log (user_id, kind, xp_earned, timestamp, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user_id, kind.as_str(), xp_earned, timestamp_ms, metadata_text],
        )?;
        let id = tx.last_insert_rowid();

        if xp_earned > 0 {
            tx.execute(
                "INSERT INTO user_profile (user_id, grade, xp_total, gems, created_at)
                 VALUES (?1, 0, ?2, 0, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET xp_total = xp_total + excluded.xp_total",
                rusqlite::params![user_id, xp_earned, timestamp_ms],
            )?;
        }

        tx.commit()?;
        debug!(user_id, kind = kind.as_str(), xp_earned, "activity recorded");

        Ok(ActivityRecord {
            id,
            user_id: user_id.to_string(),
            kind,
            xp_earned,
            timestamp: timestamp_ms,
            metadata,
        })
    }

    /// Count of entries matching the filter.
    pub fn count(&self, filter: &ActivityFilter) -> EngineResult<i64> {
        let (clause, params) = build_filter(filter);
        let sql = format!("SELECT COUNT(*) FROM activity_log{clause}");
        let conn = self.db.conn();
        let count = conn.query_row(
            &sql,
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Sum of `xp_earned` over entries matching the filter.
    pub fn sum_xp(&self, filter: &ActivityFilter) -> EngineResult<i64> {
        let (clause, params) = build_filter(filter);
        let sql = format!("SELECT COALESCE(SUM(xp_earned), 0) FROM activity_log{clause}");
        let conn = self.db.conn();
        let sum = conn.query_row(
            &sql,
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    /// Most recent `limit` entries for a user, newest first.
    pub fn recent(&self, user_id: &str, limit: i64) -> EngineResult<Vec<ActivityRecord>> {
        self.query_recent(user_id, None, limit)
    }

    /// Most recent `limit` entries of one kind for a user, newest first.
    pub fn recent_of_kind(
        &self,
        user_id: &str,
        kind: ActivityKind,
        limit: i64,
    ) -> EngineResult<Vec<ActivityRecord>> {
        self.query_recent(user_id, Some(kind), limit)
    }

    fn query_recent(
        &self,
        user_id: &str,
        kind: Option<ActivityKind>,
        limit: i64,
    ) -> EngineResult<Vec<ActivityRecord>> {
        let conn = self.db.conn();
        let mut records = Vec::new();

        match kind {
            Some(kind) => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, kind, xp_earned, timestamp, metadata
                     FROM activity_log
                     WHERE user_id = ?1 AND kind = ?2
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?3",
                )?;
                let rows = stmt.query_map(
                    rusqlite::params![user_id, kind.as_str(), limit],
                    row_to_record,
                )?;
                for row in rows {
                    records.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, kind, xp_earned, timestamp, metadata
                     FROM activity_log
                     WHERE user_id = ?1
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?2",
                )?;
                let rows = stmt.query_map(rusqlite::params![user_id, limit], row_to_record)?;
                for row in rows {
                    records.push(row?);
                }
            }
        }

        Ok(records)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityRecord> {
    let kind_text: String = row.get(2)?;
    let kind = ActivityKind::from_str(&kind_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown activity kind: {kind_text}").into(),
        )
    })?;
    let metadata_text: String = row.get(5)?;
    Ok(ActivityRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind,
        xp_earned: row.get(3)?,
        timestamp: row.get(4)?,
        metadata: serde_json::from_str(&metadata_text).unwrap_or_default(),
    })
}

/// Build a WHERE clause and its parameters from a filter. Metadata matching
/// compares the extracted JSON value as text.
pub(crate) fn build_filter(filter: &ActivityFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(user_id) = &filter.user_id {
        params.push(Box::new(user_id.clone()));
        conditions.push(format!("user_id = ?{}", params.len()));
    }
    if let Some(kind) = filter.kind {
        params.push(Box::new(kind.as_str().to_string()));
        conditions.push(format!("kind = ?{}", params.len()));
    }
    if let Some((key, value)) = &filter.metadata {
        params.push(Box::new(key.clone()));
        let key_idx = params.len();
        params.push(Box::new(value.clone()));
        let value_idx = params.len();
        conditions.push(format!(
            "CAST(json_extract(metadata, '$.' || ?{key_idx}) AS TEXT) = ?{value_idx}"
        ));
    }
    if let Some(since) = filter.since_ms {
        params.push(Box::new(since));
        conditions.push(format!("timestamp >= ?{}", params.len()));
    }
    if let Some(until) = filter.until_ms {
        params.push(Box::new(until));
        conditions.push(format!("timestamp < ?{}", params.len()));
    }

    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), params)
    }
}
