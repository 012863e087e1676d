//! Daily challenge assignment, progress tracking and claiming
//!
//! Assignments are generated all-or-nothing: a user has either zero or a
//! full set of slots for a given day, never a partial one. Past their
//! expiry, assignments are read-only.

use std::sync::Arc;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ChallengeConfig;
use crate::engine::catalog::Catalog;
use crate::engine::dates::{day_end_ms, day_key, now_ms, parse_day_key, today_utc};
use crate::engine::db::GameDb;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::models::Reward;
use crate::engine::profile::credit_reward;

/// One challenge slot assigned to a user for one day.
#[derive(Debug, Clone)]
pub struct ChallengeAssignment {
    pub id: String,
    pub user_id: String,
    pub day: NaiveDate,
    pub slot: i64,
    pub template_id: String,
    pub target: i64,
    pub progress: i64,
    pub completed: bool,
    pub completed_at: Option<i64>,
    pub rewards_claimed: bool,
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct Challenges {
    db: GameDb,
    catalog: Arc<Catalog>,
    config: ChallengeConfig,
}

impl Challenges {
    pub fn new(db: GameDb, catalog: Arc<Catalog>, config: ChallengeConfig) -> Self {
        Self { db, catalog, config }
    }

    /// Today's challenge set for a user, generating it on first call.
    pub fn generate_daily(
        &self,
        user_id: &str,
        grade: i64,
    ) -> EngineResult<Vec<ChallengeAssignment>> {
        self.generate_daily_on(user_id, grade, today_utc())
    }

    pub fn generate_daily_on(
        &self,
        user_id: &str,
        grade: i64,
        day: NaiveDate,
    ) -> EngineResult<Vec<ChallengeAssignment>> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Presence check: an existing set is returned untouched.
        let existing = load_for_day(&tx, user_id, day)?;
        if !existing.is_empty() {
            tx.commit()?;
            return Ok(existing);
        }

        let per_day = self.config.per_day;
        let valid: Vec<_> = self
            .catalog
            .templates()
            .iter()
            .filter(|t| t.valid_for(grade))
            .collect();
        if (valid.len() as i64) < per_day {
            return Err(EngineError::InvalidArgument(
                "not enough challenge templates for this grade",
            ));
        }

        let mut rng = rand::thread_rng();
        let chosen: Vec<_> = valid
            .choose_multiple(&mut rng, per_day as usize)
            .collect();

        let expires_at = day_end_ms(day);
        let mut created = Vec::with_capacity(chosen.len());
        for (index, template) in chosen.iter().enumerate() {
            let assignment = ChallengeAssignment {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                day,
                slot: index as i64 + 1,
                template_id: template.id.clone(),
                target: template.target,
                progress: 0,
                completed: false,
                completed_at: None,
                rewards_claimed: false,
                expires_at,
            };
            tx.execute(
                "INSERT INTO challenge_assignments
                 (id, user_id, day, slot, template_id, target, progress, completed, rewards_claimed, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, 0, ?7)",
                rusqlite::params![
                    assignment.id,
                    assignment.user_id,
                    day_key(day),
                    assignment.slot,
                    assignment.template_id,
                    assignment.target,
                    expires_at
                ],
            )?;
            created.push(assignment);
        }
        tx.commit()?;

        info!(user_id, day = %day_key(day), count = created.len(), "daily challenges generated");
        Ok(created)
    }

    /// Add progress toward an assignment. Clamped at the target; completion
    /// is a one-way transition and further progress is ignored.
    pub fn update_progress(
        &self,
        assignment_id: &str,
        amount: i64,
    ) -> EngineResult<ChallengeAssignment> {
        self.update_progress_at(assignment_id, amount, now_ms())
    }

    pub fn update_progress_at(
        &self,
        assignment_id: &str,
        amount: i64,
        now_ms: i64,
    ) -> EngineResult<ChallengeAssignment> {
        if amount < 1 {
            return Err(EngineError::InvalidArgument(
                "progress amount must be at least 1",
            ));
        }

        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let assignment = load_by_id(&tx, assignment_id)?;

        if now_ms >= assignment.expires_at {
            return Err(EngineError::ChallengeExpired);
        }
        if assignment.completed {
            tx.commit()?;
            return Ok(assignment);
        }

        // Arithmetic in SQL so a concurrent writer cannot make an
        // increment vanish.
        tx.execute(
            "UPDATE challenge_assignments
             SET progress = MIN(target, progress + ?1),
                 completed = CASE WHEN progress + ?1 >= target THEN 1 ELSE 0 END,
                 completed_at = CASE WHEN progress + ?1 >= target THEN ?2 ELSE completed_at END
             WHERE id = ?3 AND completed = 0",
            rusqlite::params![amount, now_ms, assignment_id],
        )?;
        let updated = load_by_id(&tx, assignment_id)?;
        tx.commit()?;

        if updated.completed {
            info!(
                user_id = %updated.user_id,
                template = %updated.template_id,
                "challenge completed"
            );
        } else {
            debug!(
                assignment_id,
                progress = updated.progress,
                target = updated.target,
                "challenge progress"
            );
        }
        Ok(updated)
    }

    /// Claim a completed assignment's rewards, exactly once.
    pub fn claim_rewards(&self, assignment_id: &str) -> EngineResult<Reward> {
        self.claim_rewards_at(assignment_id, now_ms())
    }

    pub fn claim_rewards_at(&self, assignment_id: &str, now_ms: i64) -> EngineResult<Reward> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let assignment = load_by_id(&tx, assignment_id)?;
        let template = self
            .catalog
            .template(&assignment.template_id)
            .ok_or_else(|| EngineError::NotFound {
                kind: "challenge template",
                id: assignment.template_id.clone(),
            })?;

        if now_ms >= assignment.expires_at {
            return Err(EngineError::ChallengeExpired);
        }
        if !assignment.completed {
            return Err(EngineError::NotCompleted);
        }
        if assignment.rewards_claimed {
            return Err(EngineError::AlreadyClaimed);
        }

        let claimed = tx.execute(
            "UPDATE challenge_assignments SET rewards_claimed = 1
             WHERE id = ?1 AND completed = 1 AND rewards_claimed = 0",
            rusqlite::params![assignment_id],
        )?;
        if claimed == 0 {
            return Err(EngineError::AlreadyClaimed);
        }
        credit_reward(&tx, &assignment.user_id, &template.reward, now_ms)?;
        tx.commit()?;

        info!(
            user_id = %assignment.user_id,
            template = %assignment.template_id,
            "challenge rewards claimed"
        );
        Ok(template.reward.clone())
    }

    /// A user's assignments for one day, ordered by slot.
    pub fn list_for(&self, user_id: &str, day: NaiveDate) -> EngineResult<Vec<ChallengeAssignment>> {
        let conn = self.db.conn();
        load_for_day(&conn, user_id, day)
    }

    /// Delete expired assignments that were never completed. Completed rows
    /// stay as history. Safe to run at any cadence.
    pub fn cleanup_expired(&self) -> EngineResult<u64> {
        self.cleanup_expired_at(now_ms())
    }

    pub fn cleanup_expired_at(&self, now_ms: i64) -> EngineResult<u64> {
        let conn = self.db.conn();
        let deleted = conn.execute(
            "DELETE FROM challenge_assignments WHERE expires_at <= ?1 AND completed = 0",
            rusqlite::params![now_ms],
        )?;
        if deleted > 0 {
            debug!(deleted, "expired challenges cleaned up");
        }
        Ok(deleted as u64)
    }
}

fn load_for_day(
    conn: &Connection,
    user_id: &str,
    day: NaiveDate,
) -> EngineResult<Vec<ChallengeAssignment>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, day, slot, template_id, target, progress, completed,
                completed_at, rewards_claimed, expires_at
         FROM challenge_assignments WHERE user_id = ?1 AND day = ?2 ORDER BY slot",
    )?;
    let rows = stmt.query_map(rusqlite::params![user_id, day_key(day)], row_to_assignment)?;
    let mut assignments = Vec::new();
    for row in rows {
        assignments.push(row?);
    }
    Ok(assignments)
}

fn load_by_id(conn: &Connection, assignment_id: &str) -> EngineResult<ChallengeAssignment> {
    conn.query_row(
        "SELECT id, user_id, day, slot, template_id, target, progress, completed,
                completed_at, rewards_claimed, expires_at
         FROM challenge_assignments WHERE id = ?1",
        rusqlite::params![assignment_id],
        row_to_assignment,
    )
    .optional()?
    .ok_or_else(|| EngineError::NotFound {
        kind: "challenge",
        id: assignment_id.to_string(),
    })
}

fn row_to_assignment(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChallengeAssignment> {
    let day_text: String = row.get(2)?;
    let day = parse_day_key(&day_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("bad challenge day: {day_text}").into(),
        )
    })?;
    Ok(ChallengeAssignment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        day,
        slot: row.get(3)?,
        template_id: row.get(4)?,
        target: row.get(5)?,
        progress: row.get(6)?,
        completed: row.get(7)?,
        completed_at: row.get(8)?,
        rewards_claimed: row.get(9)?,
        expires_at: row.get(10)?,
    })
}
