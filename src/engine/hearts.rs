//! Heart (life) resource management
//!
//! Regeneration is a pure function of elapsed wall-clock time, computed
//! lazily at the start of every read and mutation rather than by a timer.
//! The computed state is written back under an optimistic version check and
//! retried once, so a regeneration racing a consume can never lose an
//! update. All public operations have an `_at` variant taking an explicit
//! clock, used by simulations and tests.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::db::GameDb;
use super::dates::now_ms;
use super::error::{EngineError, EngineResult};
use super::models::{HeartEvent, HeartEventReason, HeartOutcome, HeartState};
use crate::config::HeartsConfig;

const MS_PER_MINUTE: i64 = 60 * 1000;
const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Clone)]
pub struct Hearts {
    db: GameDb,
    config: HeartsConfig,
}

impl Hearts {
    pub fn new(db: GameDb, config: HeartsConfig) -> Self {
        Self { db, config }
    }

    /// Current heart state with regeneration applied.
    pub fn state(&self, user_id: &str) -> EngineResult<HeartState> {
        self.state_at(user_id, now_ms())
    }

    pub fn state_at(&self, user_id: &str, now_ms: i64) -> EngineResult<HeartState> {
        for _ in 0..2 {
            if let Some(state) = self.try_refresh(user_id, now_ms)? {
                return Ok(state);
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Spend one heart on a failed attempt.
    pub fn consume(&self, user_id: &str) -> EngineResult<HeartOutcome> {
        self.consume_at(user_id, now_ms())
    }

    pub fn consume_at(&self, user_id: &str, now_ms: i64) -> EngineResult<HeartOutcome> {
        for _ in 0..2 {
            if let Some(outcome) = self.try_consume(user_id, now_ms)? {
                return Ok(outcome);
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Add hearts up to the cap. Works while unlimited mode is active.
    pub fn grant(
        &self,
        user_id: &str,
        amount: i64,
        reason: HeartEventReason,
    ) -> EngineResult<i64> {
        self.grant_at(user_id, amount, reason, now_ms())
    }

    pub fn grant_at(
        &self,
        user_id: &str,
        amount: i64,
        reason: HeartEventReason,
        now_ms: i64,
    ) -> EngineResult<i64> {
        if amount < 1 {
            return Err(EngineError::InvalidArgument("grant amount must be at least 1"));
        }
        for _ in 0..2 {
            if let Some(current) = self.try_grant(user_id, amount, reason, now_ms)? {
                return Ok(current);
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Turn on unlimited hearts for a number of days. A still-active window
    /// is extended from its current expiry, not restarted.
    pub fn activate_unlimited(&self, user_id: &str, duration_days: i64) -> EngineResult<HeartState> {
        self.activate_unlimited_at(user_id, duration_days, now_ms())
    }

    pub fn activate_unlimited_at(
        &self,
        user_id: &str,
        duration_days: i64,
        now_ms: i64,
    ) -> EngineResult<HeartState> {
        if duration_days < 1 {
            return Err(EngineError::InvalidArgument("duration must be at least 1 day"));
        }
        for _ in 0..2 {
            if let Some(state) = self.try_activate_unlimited(user_id, duration_days, now_ms)? {
                return Ok(state);
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Recent heart history, newest first.
    pub fn history(&self, user_id: &str, limit: i64) -> EngineResult<Vec<HeartEvent>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT timestamp, delta, reason FROM heart_events
             WHERE user_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id, limit], |row| {
            let reason_text: String = row.get(2)?;
            let reason = HeartEventReason::from_str(&reason_text).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    format!("unknown heart event reason: {reason_text}").into(),
                )
            })?;
            Ok(HeartEvent {
                timestamp: row.get(0)?,
                delta: row.get(1)?,
                reason,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    // ======== write cycles ========

    fn try_refresh(&self, user_id: &str, now_ms: i64) -> EngineResult<Option<HeartState>> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut state = self.load_or_create(&tx, user_id, now_ms)?;
        let expected = state.version;
        let added = apply_regeneration(&mut state, now_ms);

        if added > 0 {
            if !store(&tx, &state, expected)? {
                return Ok(None);
            }
            state.version = expected + 1;
            append_event(&tx, user_id, now_ms, added, HeartEventReason::Refilled)?;
            debug!(user_id, added, current = state.current, "hearts regenerated");
        }
        tx.commit()?;
        Ok(Some(state))
    }

    fn try_consume(&self, user_id: &str, now_ms: i64) -> EngineResult<Option<HeartOutcome>> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut state = self.load_or_create(&tx, user_id, now_ms)?;
        let expected = state.version;
        let added = apply_regeneration(&mut state, now_ms);

        if state.is_unlimited(now_ms) {
            // Unlimited mode suppresses the drain but regeneration still
            // lands, so the balance is correct once the window ends.
            if added > 0 {
                if !store(&tx, &state, expected)? {
                    return Ok(None);
                }
                append_event(&tx, user_id, now_ms, added, HeartEventReason::Refilled)?;
            }
            tx.commit()?;
            return Ok(Some(HeartOutcome {
                current: state.current,
                can_continue: true,
            }));
        }

        if state.current == 0 {
            let elapsed = (now_ms - state.last_refill_at).max(0);
            let interval_ms = state.refill_interval_minutes * MS_PER_MINUTE;
            let remaining = (interval_ms - elapsed).max(0);
            let retry_after_minutes = ((remaining + MS_PER_MINUTE - 1) / MS_PER_MINUTE).max(1);
            return Err(EngineError::InsufficientHearts { retry_after_minutes });
        }

        state.current -= 1;
        state.total_lost += 1;
        if !store(&tx, &state, expected)? {
            return Ok(None);
        }
        if added > 0 {
            append_event(&tx, user_id, now_ms, added, HeartEventReason::Refilled)?;
        }
        append_event(&tx, user_id, now_ms, -1, HeartEventReason::Lost)?;
        tx.commit()?;

        debug!(user_id, current = state.current, "heart consumed");
        Ok(Some(HeartOutcome {
            current: state.current,
            can_continue: state.current > 0,
        }))
    }

    fn try_grant(
        &self,
        user_id: &str,
        amount: i64,
        reason: HeartEventReason,
        now_ms: i64,
    ) -> EngineResult<Option<i64>> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut state = self.load_or_create(&tx, user_id, now_ms)?;
        let expected = state.version;
        let added = apply_regeneration(&mut state, now_ms);

        let granted = (state.max - state.current).min(amount).max(0);
        state.current += granted;
        if state.is_full() {
            state.last_refill_at = now_ms;
        }

        if !store(&tx, &state, expected)? {
            return Ok(None);
        }
        if added > 0 {
            append_event(&tx, user_id, now_ms, added, HeartEventReason::Refilled)?;
        }
        if granted > 0 {
            append_event(&tx, user_id, now_ms, granted, reason)?;
        }
        tx.commit()?;

        debug!(user_id, granted, current = state.current, "hearts granted");
        Ok(Some(state.current))
    }

    fn try_activate_unlimited(
        &self,
        user_id: &str,
        duration_days: i64,
        now_ms: i64,
    ) -> EngineResult<Option<HeartState>> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut state = self.load_or_create(&tx, user_id, now_ms)?;
        let expected = state.version;
        let added = apply_regeneration(&mut state, now_ms);

        let base = match state.unlimited_until {
            Some(until) if until > now_ms => until,
            _ => now_ms,
        };
        state.unlimited_until = Some(base + duration_days * MS_PER_DAY);

        if !store(&tx, &state, expected)? {
            return Ok(None);
        }
        state.version = expected + 1;
        if added > 0 {
            append_event(&tx, user_id, now_ms, added, HeartEventReason::Refilled)?;
        }
        append_event(&tx, user_id, now_ms, 0, HeartEventReason::Unlimited)?;
        tx.commit()?;

        debug!(user_id, until = state.unlimited_until, "unlimited hearts activated");
        Ok(Some(state))
    }

    fn load_or_create(
        &self,
        conn: &Connection,
        user_id: &str,
        now_ms: i64,
    ) -> EngineResult<HeartState> {
        if let Some(state) = load(conn, user_id)? {
            return Ok(state);
        }
        conn.execute(
            "INSERT OR IGNORE INTO heart_state
             (user_id, current, max_hearts, last_refill_at, refill_interval_minutes, total_lost, version)
             VALUES (?1, ?2, ?2, ?3, ?4, 0, 0)",
            rusqlite::params![
                user_id,
                self.config.max_hearts,
                now_ms,
                self.config.refill_interval_minutes
            ],
        )?;
        debug!(user_id, "heart state created");
        load(conn, user_id)?.ok_or_else(|| EngineError::NotFound {
            kind: "heart state",
            id: user_id.to_string(),
        })
    }
}

/// Add one heart per full refill interval elapsed, capped at max. Advances
/// the refill anchor by exactly the intervals consumed so the remainder
/// keeps counting toward the next heart. Returns the number added.
fn apply_regeneration(state: &mut HeartState, now_ms: i64) -> i64 {
    if state.is_full() {
        // A full balance does not bank time toward future hearts.
        state.last_refill_at = now_ms;
        return 0;
    }

    let interval_ms = state.refill_interval_minutes * MS_PER_MINUTE;
    let elapsed = now_ms - state.last_refill_at;
    if interval_ms <= 0 || elapsed < interval_ms {
        return 0;
    }

    let earned = elapsed / interval_ms;
    let added = earned.min(state.max - state.current);
    state.current += added;
    if state.is_full() {
        state.last_refill_at = now_ms;
    } else {
        state.last_refill_at += added * interval_ms;
    }
    added
}

fn load(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<HeartState>> {
    conn.query_row(
        "SELECT user_id, current, max_hearts, last_refill_at, refill_interval_minutes,
                unlimited_until, total_lost, version
         FROM heart_state WHERE user_id = ?1",
        rusqlite::params![user_id],
        |row| {
            Ok(HeartState {
                user_id: row.get(0)?,
                current: row.get(1)?,
                max: row.get(2)?,
                last_refill_at: row.get(3)?,
                refill_interval_minutes: row.get(4)?,
                unlimited_until: row.get(5)?,
                total_lost: row.get(6)?,
                version: row.get(7)?,
            })
        },
    )
    .optional()
}

/// Version-checked write-back. Returns false when another writer got there
/// first and the whole read-modify-write cycle must rerun.
fn store(conn: &Connection, state: &HeartState, expected_version: i64) -> rusqlite::Result<bool> {
    let updated = conn.execute(
        "UPDATE heart_state
         SET current = ?1, last_refill_at = ?2, unlimited_until = ?3, total_lost = ?4,
             version = version + 1
         WHERE user_id = ?5 AND version = ?6",
        rusqlite::params![
            state.current,
            state.last_refill_at,
            state.unlimited_until,
            state.total_lost,
            state.user_id,
            expected_version
        ],
    )?;
    Ok(updated == 1)
}

fn append_event(
    conn: &Connection,
    user_id: &str,
    timestamp_ms: i64,
    delta: i64,
    reason: HeartEventReason,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO heart_events (user_id, timestamp, delta, reason) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user_id, timestamp_ms, delta, reason.as_str()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_hearts() -> Hearts {
        Hearts::new(
            GameDb::open_in_memory().unwrap(),
            HeartsConfig {
                max_hearts: 5,
                refill_interval_minutes: 30,
            },
        )
    }

    const MIN: i64 = MS_PER_MINUTE;

    #[test]
    fn test_created_full() {
        let hearts = test_hearts();
        let state = hearts.state_at("u1", 1_000_000).unwrap();
        assert_eq!(state.current, 5);
        assert_eq!(state.max, 5);
        assert_eq!(state.total_lost, 0);
    }

    #[test]
    fn test_consume_decrements_and_logs() {
        let hearts = test_hearts();
        let outcome = hearts.consume_at("u1", 1_000_000).unwrap();
        assert_eq!(outcome.current, 4);
        assert!(outcome.can_continue);

        let state = hearts.state_at("u1", 1_000_000).unwrap();
        assert_eq!(state.total_lost, 1);

        let history = hearts.history("u1", 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].delta, -1);
        assert_eq!(history[0].reason, HeartEventReason::Lost);
    }

    #[test]
    fn test_consume_at_zero_reports_wait() {
        let hearts = test_hearts();
        let start = 1_000_000;
        for _ in 0..5 {
            hearts.consume_at("u1", start).unwrap();
        }
        // 12 minutes into the 30 minute interval, 18 left
        match hearts.consume_at("u1", start + 12 * MIN) {
            Err(EngineError::InsufficientHearts { retry_after_minutes }) => {
                assert_eq!(retry_after_minutes, 18);
            }
            other => panic!("expected InsufficientHearts, got {other:?}"),
        }
    }

    #[test]
    fn test_regeneration_preserves_remainder() {
        let hearts = test_hearts();
        let start = 1_000_000;
        for _ in 0..5 {
            hearts.consume_at("u1", start).unwrap();
        }

        // 65 minutes at 30 per heart: two hearts, 5 minutes kept
        let state = hearts.state_at("u1", start + 65 * MIN).unwrap();
        assert_eq!(state.current, 2);
        assert_eq!(state.last_refill_at, start + 60 * MIN);
    }

    #[test]
    fn test_polling_does_not_change_outcome() {
        let hearts = test_hearts();
        let start = 1_000_000;
        for _ in 0..5 {
            hearts.consume_at("u1", start).unwrap();
        }

        for minutes in [5, 10, 20, 29] {
            let state = hearts.state_at("u1", start + minutes * MIN).unwrap();
            assert_eq!(state.current, 0, "no heart before a full interval");
        }
        let state = hearts.state_at("u1", start + 30 * MIN).unwrap();
        assert_eq!(state.current, 1);
        // Polling did not consume the elapsed time
        assert_eq!(state.last_refill_at, start + 30 * MIN);
    }

    #[test]
    fn test_regeneration_caps_at_max() {
        let hearts = test_hearts();
        let start = 1_000_000;
        hearts.consume_at("u1", start).unwrap();

        // Week-long absence refills exactly to max, surplus discarded
        let later = start + 7 * 24 * 60 * MIN;
        let state = hearts.state_at("u1", later).unwrap();
        assert_eq!(state.current, 5);
        assert_eq!(state.last_refill_at, later);
    }

    #[test]
    fn test_grant_saturates() {
        let hearts = test_hearts();
        let start = 1_000_000;
        hearts.consume_at("u1", start).unwrap();
        hearts.consume_at("u1", start).unwrap();

        let current = hearts
            .grant_at("u1", 10, HeartEventReason::Purchased, start)
            .unwrap();
        assert_eq!(current, 5);

        assert!(matches!(
            hearts.grant_at("u1", 0, HeartEventReason::Granted, start),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unlimited_suppresses_drain() {
        let hearts = test_hearts();
        let start = 1_000_000;
        hearts.activate_unlimited_at("u1", 3, start).unwrap();

        for _ in 0..10 {
            let outcome = hearts.consume_at("u1", start + MIN).unwrap();
            assert_eq!(outcome.current, 5);
            assert!(outcome.can_continue);
        }
        let state = hearts.state_at("u1", start + MIN).unwrap();
        assert_eq!(state.total_lost, 0);

        // After expiry consumption drains again
        let after = start + 4 * 24 * 60 * MIN;
        let outcome = hearts.consume_at("u1", after).unwrap();
        assert_eq!(outcome.current, 4);
    }

    #[test]
    fn test_unlimited_extends_active_window() {
        let hearts = test_hearts();
        let start = 1_000_000;
        let first = hearts.activate_unlimited_at("u1", 2, start).unwrap();
        let second = hearts
            .activate_unlimited_at("u1", 1, start + MIN)
            .unwrap();
        assert_eq!(
            second.unlimited_until,
            first.unlimited_until.map(|u| u + MS_PER_DAY)
        );
    }

    #[test]
    fn test_bounds_hold_across_sequences() {
        let hearts = test_hearts();
        let mut now = 1_000_000;
        for step in 0..50 {
            now += (step % 7) * 11 * MIN;
            match step % 3 {
                0 => {
                    let _ = hearts.consume_at("u1", now);
                }
                1 => {
                    let _ = hearts.grant_at("u1", 2, HeartEventReason::Granted, now);
                }
                _ => {
                    let _ = hearts.state_at("u1", now);
                }
            }
            let state = hearts.state_at("u1", now).unwrap();
            assert!(state.current >= 0 && state.current <= state.max);
        }
    }
}
