//! Status command implementation

use anyhow::Result;

use motiva::engine::dates::{now_ms, today_utc};
use motiva::engine::levels;
use motiva::Engine;

/// Show one user's engagement state
pub async fn status_command(engine: &Engine, user_id: &str) -> Result<()> {
    let Some(profile) = engine.profiles().get(user_id)? else {
        println!("No profile for user '{}'.", user_id);
        return Ok(());
    };

    let hearts = engine.hearts().state(user_id)?;
    let streak = engine.streaks().state(user_id)?;
    let level = levels::level_for_xp(profile.xp_total);

    println!("User {}", profile.user_id);
    match &profile.class_id {
        Some(class_id) => println!("  Class:   {} (grade {})", class_id, profile.grade),
        None => println!("  Grade:   {}", profile.grade),
    }
    println!(
        "  Level:   {} ({}), {} XP, {:.0}% to next",
        level.level,
        level.title,
        profile.xp_total,
        levels::progress_to_next(profile.xp_total)
    );
    if let Some(title) = &profile.title {
        println!("  Title:   {}", title);
    }
    println!("  Gems:    {}", profile.gems);

    if hearts.is_unlimited(now_ms()) {
        println!("  Hearts:  unlimited");
    } else {
        println!("  Hearts:  {}/{}", hearts.current, hearts.max);
    }

    let freeze_note = if streak.freezes_available > 0 {
        format!(", {} freeze(s) banked", streak.freezes_available)
    } else {
        String::new()
    };
    println!(
        "  Streak:  {} day(s), longest {}{}",
        streak.current_streak, streak.longest_streak, freeze_note
    );

    let challenges = engine.challenges().list_for(user_id, today_utc())?;
    if !challenges.is_empty() {
        println!("\nToday's challenges:");
        for assignment in &challenges {
            let name = engine
                .catalog()
                .template(&assignment.template_id)
                .map(|t| t.name.as_str())
                .unwrap_or(assignment.template_id.as_str());
            let mark = if assignment.completed { "x" } else { " " };
            let claimed = if assignment.rewards_claimed {
                " (claimed)"
            } else {
                ""
            };
            println!(
                "  [{}] {} {}/{}{}",
                mark, name, assignment.progress, assignment.target, claimed
            );
        }
    }

    let progress = engine.achievements().progress(user_id)?;
    let unlocked = progress.iter().filter(|p| p.unlocked).count();
    let claimable = progress
        .iter()
        .filter(|p| p.unlocked && !p.rewards_claimed)
        .count();

    println!(
        "\nAchievements: {}/{} unlocked",
        unlocked,
        engine.catalog().achievements().len()
    );
    if claimable > 0 {
        println!("  {} reward(s) waiting to be claimed", claimable);
    }
    for entry in progress.iter().filter(|p| !p.unlocked) {
        let name = engine
            .catalog()
            .achievement(&entry.achievement_id)
            .map(|a| a.name.as_str())
            .unwrap_or(entry.achievement_id.as_str());
        println!(
            "  {:>3}% {} ({}/{})",
            entry.percentage(),
            name,
            entry.current,
            entry.target
        );
    }

    Ok(())
}
