//! Daily streak tracking with freeze fallback and milestone bonuses
//!
//! The streak advances at most once per calendar day (UTC). Repeat calls on
//! the same day are successful no-ops, so callers can fire on every
//! completed activity without guarding. Date-parameterized `_on` variants
//! exist for simulations and tests.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use super::db::GameDb;
use super::dates::{day_key, now_ms, parse_day_key, today_utc};
use super::error::{EngineError, EngineResult};
use super::models::{Reward, StreakAdvance, StreakDay, StreakOutcome, StreakState};
use super::profile::credit_reward;
use crate::config::StreakConfig;

#[derive(Clone)]
pub struct Streaks {
    db: GameDb,
    config: StreakConfig,
}

impl Streaks {
    pub fn new(db: GameDb, config: StreakConfig) -> Self {
        Self { db, config }
    }

    pub fn state(&self, user_id: &str) -> EngineResult<StreakState> {
        let conn = self.db.conn();
        self.load_or_create(&conn, user_id)
    }

    /// Count today's learning activity toward the streak.
    pub fn record_activity(&self, user_id: &str) -> EngineResult<StreakOutcome> {
        self.record_activity_on(user_id, today_utc())
    }

    pub fn record_activity_on(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> EngineResult<StreakOutcome> {
        for _ in 0..2 {
            if let Some(outcome) = self.try_record(user_id, today)? {
                return Ok(outcome);
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Buy one streak freeze with gems.
    pub fn buy_freeze(&self, user_id: &str) -> EngineResult<i64> {
        for _ in 0..2 {
            if let Some(freezes) = self.try_buy_freeze(user_id)? {
                return Ok(freezes);
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Recent per-day history, newest first.
    pub fn history(&self, user_id: &str, limit: i64) -> EngineResult<Vec<StreakDay>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT date, maintained, bonus_xp, freeze_used FROM streak_days
             WHERE user_id = ?1 ORDER BY date DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id, limit], |row| {
            let date_text: String = row.get(0)?;
            let date = parse_day_key(&date_text).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    format!("bad streak date: {date_text}").into(),
                )
            })?;
            Ok(StreakDay {
                date,
                maintained: row.get(1)?,
                bonus_xp: row.get(2)?,
                freeze_used: row.get(3)?,
            })
        })?;
        let mut days = Vec::new();
        for row in rows {
            days.push(row?);
        }
        Ok(days)
    }

    // ======== write cycles ========

    fn try_record(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> EngineResult<Option<StreakOutcome>> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut state = self.load_or_create(&tx, user_id)?;
        let expected = state.version;

        if state.last_activity_date == Some(today) {
            // Already counted, nothing to write.
            tx.commit()?;
            return Ok(Some(StreakOutcome {
                advance: StreakAdvance::AlreadyRecorded,
                current_streak: state.current_streak,
                longest_streak: state.longest_streak,
                bonus_xp: 0,
            }));
        }

        let yesterday = today.pred_opt();
        let (advance, bonus_xp, maintained, freeze_used) = match state.last_activity_date {
            None => {
                state.current_streak = 1;
                state.longest_streak = state.longest_streak.max(1);
                (StreakAdvance::Started, 0, true, false)
            }
            Some(last) if Some(last) == yesterday => {
                // Natural continuation always wins over a freeze.
                state.current_streak += 1;
                state.longest_streak = state.longest_streak.max(state.current_streak);
                let bonus = milestone_bonus(state.current_streak, &self.config);
                (StreakAdvance::Extended, bonus, true, false)
            }
            Some(_) => {
                let can_freeze = state.freezes_available > 0
                    && !state.freeze_used_on(today)
                    && state.current_streak > 0;
                if can_freeze {
                    state.freezes_available -= 1;
                    state.freeze_used_on = Some(today);
                    (StreakAdvance::FreezeUsed, 0, true, true)
                } else {
                    state.current_streak = 1;
                    state.longest_streak = state.longest_streak.max(1);
                    (StreakAdvance::Reset, 0, false, false)
                }
            }
        };
        state.last_activity_date = Some(today);

        if !store(&tx, &state, expected)? {
            return Ok(None);
        }
        tx.execute(
            "INSERT INTO streak_days (user_id, date, maintained, bonus_xp, freeze_used)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user_id, day_key(today), maintained, bonus_xp, freeze_used],
        )?;
        if bonus_xp > 0 {
            credit_reward(
                &tx,
                user_id,
                &Reward {
                    xp: bonus_xp,
                    ..Default::default()
                },
                now_ms(),
            )?;
            info!(user_id, streak = state.current_streak, bonus_xp, "streak milestone reached");
        }
        tx.commit()?;

        debug!(
            user_id,
            streak = state.current_streak,
            advance = ?advance,
            "streak activity recorded"
        );
        Ok(Some(StreakOutcome {
            advance,
            current_streak: state.current_streak,
            longest_streak: state.longest_streak,
            bonus_xp,
        }))
    }

    fn try_buy_freeze(&self, user_id: &str) -> EngineResult<Option<i64>> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut state = self.load_or_create(&tx, user_id)?;
        let expected = state.version;

        if state.freezes_available >= self.config.max_freezes {
            return Err(EngineError::InvalidArgument("streak freeze limit reached"));
        }

        let cost = self.config.freeze_cost_gems;
        let debited = tx.execute(
            "UPDATE user_profile SET gems = gems - ?1 WHERE user_id = ?2 AND gems >= ?1",
            rusqlite::params![cost, user_id],
        )?;
        if debited == 0 {
            let available: i64 = tx
                .query_row(
                    "SELECT gems FROM user_profile WHERE user_id = ?1",
                    rusqlite::params![user_id],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0);
            return Err(EngineError::InsufficientGems {
                needed: cost,
                available,
            });
        }

        state.freezes_available += 1;
        if !store(&tx, &state, expected)? {
            // Dropping the transaction rolls the gem debit back too.
            return Ok(None);
        }
        tx.commit()?;

        debug!(user_id, freezes = state.freezes_available, "streak freeze bought");
        Ok(Some(state.freezes_available))
    }

    fn load_or_create(&self, conn: &Connection, user_id: &str) -> EngineResult<StreakState> {
        if let Some(state) = load(conn, user_id)? {
            return Ok(state);
        }
        conn.execute(
            "INSERT OR IGNORE INTO streak_state (user_id, current_streak, longest_streak, freezes_available, version)
             VALUES (?1, 0, 0, 0, 0)",
            rusqlite::params![user_id],
        )?;
        load(conn, user_id)?.ok_or_else(|| EngineError::NotFound {
            kind: "streak state",
            id: user_id.to_string(),
        })
    }
}

/// Bonus XP for reaching a milestone. Only the single largest applicable
/// milestone pays out; day 210 matches both the weekly and monthly moduli
/// and gets the monthly amount alone.
fn milestone_bonus(streak: i64, config: &StreakConfig) -> i64 {
    if streak == 100 {
        config.century_bonus_xp
    } else if streak % 30 == 0 {
        config.monthly_bonus_xp
    } else if streak % 7 == 0 {
        config.weekly_bonus_xp
    } else {
        0
    }
}

fn load(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<StreakState>> {
    conn.query_row(
        "SELECT user_id, current_streak, longest_streak, last_activity_date,
                freezes_available, freeze_used_on, version
         FROM streak_state WHERE user_id = ?1",
        rusqlite::params![user_id],
        |row| {
            let last: Option<String> = row.get(3)?;
            let frozen: Option<String> = row.get(5)?;
            Ok(StreakState {
                user_id: row.get(0)?,
                current_streak: row.get(1)?,
                longest_streak: row.get(2)?,
                last_activity_date: last.as_deref().and_then(parse_day_key),
                freezes_available: row.get(4)?,
                freeze_used_on: frozen.as_deref().and_then(parse_day_key),
                version: row.get(6)?,
            })
        },
    )
    .optional()
}

fn store(conn: &Connection, state: &StreakState, expected_version: i64) -> rusqlite::Result<bool> {
    let updated = conn.execute(
        "UPDATE streak_state
         SET current_streak = ?1, longest_streak = ?2, last_activity_date = ?3,
             freezes_available = ?4, freeze_used_on = ?5, version = version + 1
         WHERE user_id = ?6 AND version = ?7",
        rusqlite::params![
            state.current_streak,
            state.longest_streak,
            state.last_activity_date.map(day_key),
            state.freezes_available,
            state.freeze_used_on.map(day_key),
            state.user_id,
            expected_version
        ],
    )?;
    Ok(updated == 1)
}
