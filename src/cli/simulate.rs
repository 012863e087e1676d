//! Simulate command implementation
//!
//! Seeds a synthetic cohort and replays day-by-day activity through the
//! whole engine: lessons and exercises, heart drain, streak recording,
//! challenge generation and claims, achievement evaluation, and a final
//! board printout. Meant for demos and for eyeballing engine behavior
//! against a throwaway database.

use std::collections::HashMap;

use anyhow::{bail, Result};
use chrono::Duration;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use motiva::engine::challenges::ChallengeMetric;
use motiva::engine::dates::day_start_ms;
use motiva::engine::dates::today_utc;
use motiva::{ActivityKind, Engine, EngineError, Metric, Scope};

const NAMES: &[&str] = &[
    "ava", "ben", "cem", "deniz", "eren", "filiz", "gizem", "hakan", "iris", "jale", "kaan",
    "lara", "mert", "nina", "omar", "pelin",
];

const SUBJECTS: &[&str] = &["math", "science", "reading"];
const DIFFICULTIES: &[&str] = &["easy", "medium", "hard"];

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;

/// Replay `days` days of synthetic activity for `users` users, ending today
pub async fn simulate_command(engine: &Engine, users: usize, days: i64) -> Result<()> {
    if users == 0 {
        bail!("--users must be at least 1");
    }
    if days < 1 {
        bail!("--days must be at least 1");
    }

    let mut rng = rand::thread_rng();
    let today = today_utc();
    let first_day = today - Duration::days(days - 1);

    // Cohort: a couple of classes across grades 5 to 9.
    let mut cohort = Vec::with_capacity(users);
    for i in 0..users {
        let name = NAMES[i % NAMES.len()];
        let user_id = if i < NAMES.len() {
            name.to_string()
        } else {
            format!("{}{}", name, i / NAMES.len() + 1)
        };
        let grade = rng.gen_range(5..=9);
        let class_id = format!("{}{}", grade, if i % 2 == 0 { "a" } else { "b" });
        engine.profiles().register(&user_id, Some(&class_id), grade)?;
        cohort.push((user_id, grade));
    }
    println!("Seeded {} user(s), replaying {} day(s)...", users, days);

    // One lucky user starts with an unlimited-hearts pass.
    if let Some((user_id, _)) = cohort.first() {
        engine
            .hearts()
            .activate_unlimited_at(user_id, 2, day_start_ms(first_day) + 8 * MS_PER_HOUR)?;
    }

    for day_offset in 0..days {
        let day = first_day + Duration::days(day_offset);

        for (user_id, grade) in &cohort {
            // Roughly one user in five sits a day out.
            if rng.gen_ratio(1, 5) {
                continue;
            }

            let mut ts = day_start_ms(day) + rng.gen_range(8..=17) * MS_PER_HOUR;
            let mut counts: HashMap<ActivityKind, i64> = HashMap::new();
            let mut xp_today = 0;

            for assignment in engine.challenges().generate_daily_on(user_id, *grade, day)? {
                debug!(user_id, template = %assignment.template_id, "challenge assigned");
            }

            for _ in 0..rng.gen_range(1..=3) {
                let subject = SUBJECTS.choose(&mut rng).copied().unwrap_or("math");
                let xp = rng.gen_range(10..=25);
                engine.activity().append_at(
                    user_id,
                    ActivityKind::LessonCompleted,
                    xp,
                    serde_json::json!({ "subject": subject }),
                    ts,
                )?;
                *counts.entry(ActivityKind::LessonCompleted).or_default() += 1;
                xp_today += xp;
                ts += 10 * MS_PER_MINUTE;
            }

            for _ in 0..rng.gen_range(2..=6) {
                let correct = rng.gen_bool(0.7);
                let difficulty = DIFFICULTIES.choose(&mut rng).copied().unwrap_or("easy");
                if !correct {
                    // A mistake costs a heart; an empty pool ends the session.
                    match engine.hearts().consume_at(user_id, ts) {
                        Ok(_) => {}
                        Err(EngineError::InsufficientHearts { .. }) => break,
                        Err(err) => return Err(err.into()),
                    }
                }
                let xp = if correct { rng.gen_range(2..=8) } else { 0 };
                engine.activity().append_at(
                    user_id,
                    ActivityKind::ExerciseAttempt,
                    xp,
                    serde_json::json!({ "correct": correct, "difficulty": difficulty }),
                    ts,
                )?;
                *counts.entry(ActivityKind::ExerciseAttempt).or_default() += 1;
                xp_today += xp;
                ts += 5 * MS_PER_MINUTE;
            }

            if rng.gen_bool(0.3) {
                let xp = rng.gen_range(15..=30);
                engine.activity().append_at(
                    user_id,
                    ActivityKind::QuizCompleted,
                    xp,
                    serde_json::json!({ "score": rng.gen_range(60..=100) }),
                    ts,
                )?;
                *counts.entry(ActivityKind::QuizCompleted).or_default() += 1;
                xp_today += xp;
                ts += 15 * MS_PER_MINUTE;
            }

            if rng.gen_bool(0.2) {
                let xp = rng.gen_range(5..=15);
                engine.activity().append_at(
                    user_id,
                    ActivityKind::PracticeSession,
                    xp,
                    serde_json::json!({ "minutes": rng.gen_range(5..=20) }),
                    ts,
                )?;
                *counts.entry(ActivityKind::PracticeSession).or_default() += 1;
                xp_today += xp;
                ts += 10 * MS_PER_MINUTE;
            }

            let outcome = engine.streaks().record_activity_on(user_id, day)?;
            if outcome.bonus_xp > 0 {
                debug!(user_id, day = %day, bonus = outcome.bonus_xp, "milestone bonus");
            }

            // Push the day's totals into whatever was assigned, then claim
            // anything that completed.
            for assignment in engine.challenges().list_for(user_id, day)? {
                let Some(template) = engine.catalog().template(&assignment.template_id) else {
                    continue;
                };
                let amount = match &template.metric {
                    ChallengeMetric::Count { kind } => counts.get(kind).copied().unwrap_or(0),
                    ChallengeMetric::Xp => xp_today,
                };
                if amount < 1 || assignment.completed {
                    continue;
                }
                if let Err(err) = engine.challenges().update_progress_at(&assignment.id, amount, ts)
                {
                    if !err.is_rule_violation() {
                        return Err(err.into());
                    }
                }
            }
            for assignment in engine.challenges().list_for(user_id, day)? {
                if assignment.completed && !assignment.rewards_claimed {
                    engine.challenges().claim_rewards_at(&assignment.id, ts)?;
                }
            }

            for unlocked in engine.achievements().evaluate_at(user_id, ts)? {
                engine.achievements().claim(user_id, &unlocked.achievement_id)?;
            }

            // Bank a freeze once the gems are there; violations just mean
            // "can't afford it yet" or "already at the cap".
            if rng.gen_bool(0.1) {
                if let Err(err) = engine.streaks().buy_freeze(user_id) {
                    if !err.is_rule_violation() {
                        return Err(err.into());
                    }
                }
            }
        }
    }

    println!("\nGlobal XP board:");
    let snapshot = engine.leaderboards().recompute(&Scope::global(), Metric::Xp)?;
    for entry in snapshot.entries.iter().take(10) {
        println!("  {:>3}. {:<12} {:>8.1}", entry.rank, entry.user_id, entry.score);
    }

    println!("\nWeekly XP board:");
    let snapshot = engine.leaderboards().recompute(&Scope::weekly(), Metric::Xp)?;
    for entry in snapshot.entries.iter().take(10) {
        println!("  {:>3}. {:<12} {:>8.1}", entry.rank, entry.user_id, entry.score);
    }

    println!("\nCohort:");
    for (user_id, _) in &cohort {
        let Some(profile) = engine.profiles().get(user_id)? else {
            continue;
        };
        let hearts = engine.hearts().state(user_id)?;
        let streak = engine.streaks().state(user_id)?;
        let unlocked = engine
            .achievements()
            .progress(user_id)?
            .iter()
            .filter(|p| p.unlocked)
            .count();
        println!(
            "  {:<12} {:>5} XP  {:>4} gems  hearts {}/{}  streak {:>3}  achievements {}",
            profile.user_id,
            profile.xp_total,
            profile.gems,
            hearts.current,
            hearts.max,
            streak.current_streak,
            unlocked
        );
    }

    Ok(())
}
