//! Board command implementation

use anyhow::{bail, Result};

use motiva::{Engine, Metric, Scope, ScopeType};

/// Print a leaderboard, recomputing it first when stale
pub async fn board_command(
    engine: &Engine,
    scope: &str,
    scope_id: Option<String>,
    metric: &str,
    limit: usize,
) -> Result<()> {
    let Some(scope_type) = ScopeType::from_str(scope) else {
        bail!("Unknown scope: {}", scope);
    };
    let Some(metric) = Metric::from_str(metric) else {
        bail!("Unknown metric: {}", metric);
    };

    let scope = match scope_type {
        ScopeType::Global => Scope::global(),
        ScopeType::Weekly => Scope::weekly(),
        ScopeType::Monthly => Scope::monthly(),
        ScopeType::Class => {
            let Some(id) = scope_id else {
                bail!("--scope-id is required for class boards");
            };
            Scope::class(&id)
        }
        ScopeType::Grade => {
            let Some(id) = scope_id else {
                bail!("--scope-id is required for grade boards");
            };
            Scope::grade(id.parse::<i64>()?)
        }
    };

    let snapshot = engine.leaderboards().get_or_create(&scope, metric)?;

    if snapshot.entries.is_empty() {
        println!("No participants yet.");
        return Ok(());
    }

    let period = match (snapshot.period_start, snapshot.period_end) {
        (Some(start), Some(end)) => format!(", {} to {}", start, end),
        _ => String::new(),
    };
    println!(
        "{} / {} ({} participant(s){})\n",
        scope_type.as_str(),
        metric.as_str(),
        snapshot.total_participants,
        period
    );

    for entry in snapshot.entries.iter().take(limit) {
        let delta = match entry.rank_delta {
            0 => String::new(),
            d if d > 0 => format!("  (+{})", d),
            d => format!("  ({})", d),
        };
        println!(
            "  {:>3}. {:<20} {:>10.1}{}",
            entry.rank, entry.user_id, entry.score, delta
        );
    }

    Ok(())
}
