//! Periodic maintenance: expired-challenge cleanup and snapshot refresh
//!
//! The engine never depends on this running; hearts and streaks compute
//! lazily and boards refresh themselves on stale reads. Running it keeps
//! the challenge table small and board reads cheap.

use tracing::{info, warn};

use super::dates::now_ms;
use super::error::EngineResult;
use super::models::{Metric, Scope, ScopeType};
use super::Engine;

const MS_PER_MINUTE: i64 = 60 * 1000;

/// What one maintenance pass did.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaintenanceReport {
    pub expired_challenges_removed: u64,
    pub boards_refreshed: u64,
}

pub fn run_maintenance(engine: &Engine) -> EngineResult<MaintenanceReport> {
    run_maintenance_at(engine, now_ms())
}

pub fn run_maintenance_at(engine: &Engine, now_ms: i64) -> EngineResult<MaintenanceReport> {
    let mut report = MaintenanceReport {
        expired_challenges_removed: engine.challenges().cleanup_expired_at(now_ms)?,
        ..Default::default()
    };

    for (scope, metric) in stale_boards(engine, now_ms)? {
        engine.leaderboards().recompute_at(&scope, metric, now_ms)?;
        report.boards_refreshed += 1;
    }

    info!(
        expired_challenges = report.expired_challenges_removed,
        boards = report.boards_refreshed,
        "maintenance pass finished"
    );
    Ok(report)
}

/// Existing snapshots older than the staleness threshold. Boards nobody
/// ever requested are not created here.
fn stale_boards(engine: &Engine, now_ms: i64) -> EngineResult<Vec<(Scope, Metric)>> {
    let staleness_ms = engine.config().leaderboard.staleness_minutes * MS_PER_MINUTE;
    let conn = engine.db().conn();
    let mut stmt = conn.prepare(
        "SELECT scope_type, scope_id, metric FROM leaderboard_snapshots
         WHERE ?1 - computed_at > ?2",
    )?;
    let rows = stmt.query_map(rusqlite::params![now_ms, staleness_ms], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut boards = Vec::new();
    for row in rows {
        let (scope_text, scope_id, metric_text) = row?;
        let (Some(scope_type), Some(metric)) = (
            ScopeType::from_str(&scope_text),
            Metric::from_str(&metric_text),
        ) else {
            warn!(scope = %scope_text, metric = %metric_text, "skipping unknown board key");
            continue;
        };
        let scope = Scope {
            scope_type,
            scope_id: (!scope_id.is_empty()).then_some(scope_id),
        };
        boards.push((scope, metric));
    }
    Ok(boards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::dates::day_start_ms;
    use chrono::NaiveDate;

    #[test]
    fn test_maintenance_cleans_and_refreshes() {
        let engine = Engine::in_memory(EngineConfig::default()).unwrap();
        engine.profiles().register("u1", Some("7a"), 7).unwrap();

        let yesterday = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let just_past_midnight = day_start_ms(today) + 1;

        // Yesterday's unfinished set expires at midnight
        engine.challenges().generate_daily_on("u1", 7, yesterday).unwrap();

        // A board computed two hours before the pass is stale
        engine
            .leaderboards()
            .recompute_at(
                &Scope::global(),
                Metric::Xp,
                just_past_midnight - 2 * 60 * MS_PER_MINUTE,
            )
            .unwrap();

        let report = run_maintenance_at(&engine, just_past_midnight).unwrap();
        assert_eq!(report.expired_challenges_removed, 3);
        assert_eq!(report.boards_refreshed, 1);

        // A second pass right after finds nothing left to do
        let again = run_maintenance_at(&engine, just_past_midnight + 1).unwrap();
        assert_eq!(again.expired_challenges_removed, 0);
        assert_eq!(again.boards_refreshed, 0);
    }

    #[test]
    fn test_maintenance_is_safe_on_empty_state() {
        let engine = Engine::in_memory(EngineConfig::default()).unwrap();
        let report = run_maintenance(&engine).unwrap();
        assert_eq!(report.expired_challenges_removed, 0);
        assert_eq!(report.boards_refreshed, 0);
    }

    #[test]
    fn test_fresh_board_not_refreshed() {
        let engine = Engine::in_memory(EngineConfig::default()).unwrap();
        let t0 = 1_000_000;
        engine
            .leaderboards()
            .recompute_at(&Scope::global(), Metric::Xp, t0)
            .unwrap();
        let report = run_maintenance_at(&engine, t0 + MS_PER_MINUTE).unwrap();
        assert_eq!(report.boards_refreshed, 0);
    }
}
