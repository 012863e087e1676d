//! Maintain command implementation

use std::time::Duration;

use anyhow::Result;
use tracing::info;

use motiva::engine::maintenance::run_maintenance;
use motiva::Engine;

/// Remove expired challenges and refresh stale boards
/// Runs one pass by default, or a pass per interval with --watch
pub async fn maintain_command(engine: &Engine, watch: bool, interval_secs: u64) -> Result<()> {
    if !watch {
        let report = run_maintenance(engine)?;
        println!(
            "Removed {} expired challenge(s), refreshed {} board(s).",
            report.expired_challenges_removed, report.boards_refreshed
        );
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        ticker.tick().await;
        let report = run_maintenance(engine)?;
        info!(
            expired = report.expired_challenges_removed,
            boards = report.boards_refreshed,
            "maintenance pass complete"
        );
    }
}
