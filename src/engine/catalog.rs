//! Read-mostly catalogue of achievement definitions and challenge templates
//!
//! The catalogue is loaded once at startup and handed to the evaluator and
//! assigner as an injected dependency. Operators can extend or replace
//! built-in entries by dropping TOML files into the config directory; a
//! refresh means rebuilding the engine, not mutating shared state.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use super::achievements::definitions::{self, AchievementDefinition};
use super::challenges::templates::{self, ChallengeTemplate};

#[derive(Debug)]
pub struct Catalog {
    achievements: Vec<AchievementDefinition>,
    templates: Vec<ChallengeTemplate>,
}

#[derive(Debug, Default, Deserialize)]
struct AchievementFile {
    #[serde(default)]
    achievement: Vec<AchievementDefinition>,
}

#[derive(Debug, Default, Deserialize)]
struct ChallengeFile {
    #[serde(default)]
    challenge: Vec<ChallengeTemplate>,
}

impl Catalog {
    pub fn new(
        achievements: Vec<AchievementDefinition>,
        templates: Vec<ChallengeTemplate>,
    ) -> Self {
        Self {
            achievements,
            templates,
        }
    }

    /// Built-in definitions only.
    pub fn built_in() -> Self {
        Self::new(definitions::built_in(), templates::built_in())
    }

    /// Built-in definitions overlaid with `achievements.toml` and
    /// `challenges.toml` from the given directory. Overlay entries with a
    /// known id replace the built-in ones, new ids are appended.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut catalog = Self::built_in();

        let achievements_path = dir.join("achievements.toml");
        if achievements_path.exists() {
            let text = std::fs::read_to_string(&achievements_path)
                .with_context(|| format!("reading {}", achievements_path.display()))?;
            let file: AchievementFile = toml::from_str(&text)
                .with_context(|| format!("parsing {}", achievements_path.display()))?;
            for def in file.achievement {
                // Progress math divides by and clamps to the target, so a
                // bad overlay entry must fail here, not at evaluation time.
                if def.requirement.target() < 1 {
                    bail!(
                        "achievement '{}' in {} has a non-positive target",
                        def.id,
                        achievements_path.display()
                    );
                }
                catalog.upsert_achievement(def);
            }
            info!(path = %achievements_path.display(), "achievement overlay loaded");
        }

        let challenges_path = dir.join("challenges.toml");
        if challenges_path.exists() {
            let text = std::fs::read_to_string(&challenges_path)
                .with_context(|| format!("reading {}", challenges_path.display()))?;
            let file: ChallengeFile = toml::from_str(&text)
                .with_context(|| format!("parsing {}", challenges_path.display()))?;
            for template in file.challenge {
                if template.target < 1 {
                    bail!(
                        "challenge '{}' in {} has a non-positive target",
                        template.id,
                        challenges_path.display()
                    );
                }
                catalog.upsert_template(template);
            }
            info!(path = %challenges_path.display(), "challenge overlay loaded");
        }

        Ok(catalog)
    }

    fn upsert_achievement(&mut self, def: AchievementDefinition) {
        match self.achievements.iter_mut().find(|a| a.id == def.id) {
            Some(existing) => *existing = def,
            None => self.achievements.push(def),
        }
    }

    fn upsert_template(&mut self, template: ChallengeTemplate) {
        match self.templates.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    pub fn achievements(&self) -> &[AchievementDefinition] {
        &self.achievements
    }

    pub fn templates(&self) -> &[ChallengeTemplate] {
        &self.templates
    }

    pub fn achievement(&self, id: &str) -> Option<&AchievementDefinition> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn template(&self, id: &str) -> Option<&ChallengeTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_built_in_is_populated() {
        let catalog = Catalog::built_in();
        assert!(!catalog.achievements().is_empty());
        assert!(!catalog.templates().is_empty());
        assert!(catalog.achievement("first_lesson").is_some());
        assert!(catalog.template("lesson_sprint").is_some());
    }

    #[test]
    fn test_missing_overlay_files_fall_back_to_built_in() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::from_dir(dir.path()).unwrap();
        assert_eq!(
            catalog.achievements().len(),
            Catalog::built_in().achievements().len()
        );
    }

    #[test]
    fn test_overlay_replaces_and_appends() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("achievements.toml"),
            r#"
[[achievement]]
id = "first_lesson"
name = "Hello World"
description = "Replaced entry"

[achievement.requirement]
type = "count"
kind = "lesson_completed"
target = 2

[[achievement]]
id = "night_owl"
name = "Night Owl"
description = "A brand new entry"
difficulty = "medium"

[achievement.requirement]
type = "xp_total"
target = 500

[achievement.reward]
xp = 50
gems = 5
"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("challenges.toml"),
            r#"
[[challenge]]
id = "weekend_review"
name = "Weekend Review"
description = "Review two lessons"
target = 2
min_grade = 3
max_grade = 9

[challenge.metric]
type = "count"
kind = "practice_session"

[challenge.reward]
xp = 20
"#,
        )
        .unwrap();

        let built_in_count = Catalog::built_in().achievements().len();
        let catalog = Catalog::from_dir(dir.path()).unwrap();

        let replaced = catalog.achievement("first_lesson").unwrap();
        assert_eq!(replaced.name, "Hello World");
        assert_eq!(replaced.requirement.target(), 2);

        assert!(catalog.achievement("night_owl").is_some());
        assert_eq!(catalog.achievements().len(), built_in_count + 1);

        let added = catalog.template("weekend_review").unwrap();
        assert_eq!(added.min_grade, 3);
        assert_eq!(added.reward.xp, 20);
    }

    #[test]
    fn test_overlay_rejects_non_positive_achievement_target() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("achievements.toml"),
            r#"
[[achievement]]
id = "broken"
name = "Broken"
description = "Target below one"

[achievement.requirement]
type = "xp_total"
target = -1
"#,
        )
        .unwrap();
        let err = Catalog::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("broken"), "unexpected error: {err}");
    }

    #[test]
    fn test_overlay_rejects_zero_challenge_target() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("challenges.toml"),
            r#"
[[challenge]]
id = "idle"
name = "Idle"
description = "Nothing to do"
target = 0

[challenge.metric]
type = "xp"
"#,
        )
        .unwrap();
        let err = Catalog::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("idle"), "unexpected error: {err}");
    }

    #[test]
    fn test_malformed_overlay_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("achievements.toml"), "not [valid toml").unwrap();
        assert!(Catalog::from_dir(dir.path()).is_err());
    }
}
