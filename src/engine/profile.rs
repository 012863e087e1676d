//! User profiles: placement, XP total, gem wallet and title
//!
//! The profile row is the aggregate state every reward credit lands on and
//! the population table leaderboard scopes select from. Rows are created
//! lazily the first time any subsystem touches a user.

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use super::db::GameDb;
use super::dates::now_ms;
use super::error::{EngineError, EngineResult};
use super::models::{Reward, UserProfile};

#[derive(Clone)]
pub struct Profiles {
    db: GameDb,
}

impl Profiles {
    pub fn new(db: GameDb) -> Self {
        Self { db }
    }

    /// Create or update a user's placement (class and grade).
    pub fn register(
        &self,
        user_id: &str,
        class_id: Option<&str>,
        grade: i64,
    ) -> EngineResult<UserProfile> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO user_profile (user_id, class_id, grade, xp_total, gems, created_at)
             VALUES (?1, ?2, ?3, 0, 0, ?4)
             ON CONFLICT(user_id) DO UPDATE SET class_id = excluded.class_id,
                                               grade = excluded.grade",
            rusqlite::params![user_id, class_id, grade, now_ms()],
        )?;
        drop(conn);
        self.require(user_id)
    }

    pub fn get(&self, user_id: &str) -> EngineResult<Option<UserProfile>> {
        let conn = self.db.conn();
        let profile = conn
            .query_row(
                "SELECT user_id, class_id, grade, xp_total, gems, title, created_at
                 FROM user_profile WHERE user_id = ?1",
                rusqlite::params![user_id],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Fetch a profile, creating an empty one if the user is new.
    pub fn ensure(&self, user_id: &str) -> EngineResult<UserProfile> {
        {
            let conn = self.db.conn();
            conn.execute(
                "INSERT OR IGNORE INTO user_profile (user_id, grade, xp_total, gems, created_at)
                 VALUES (?1, 0, 0, 0, ?2)",
                rusqlite::params![user_id, now_ms()],
            )?;
        }
        self.require(user_id)
    }

    fn require(&self, user_id: &str) -> EngineResult<UserProfile> {
        self.get(user_id)?.ok_or_else(|| EngineError::NotFound {
            kind: "user",
            id: user_id.to_string(),
        })
    }

    pub fn credit_xp(&self, user_id: &str, amount: i64) -> EngineResult<i64> {
        if amount < 1 {
            return Err(EngineError::InvalidArgument("xp amount must be at least 1"));
        }
        let conn = self.db.conn();
        credit_reward(
            &conn,
            user_id,
            &Reward {
                xp: amount,
                ..Default::default()
            },
            now_ms(),
        )?;
        let total = conn.query_row(
            "SELECT xp_total FROM user_profile WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn credit_gems(&self, user_id: &str, amount: i64) -> EngineResult<i64> {
        if amount < 1 {
            return Err(EngineError::InvalidArgument("gem amount must be at least 1"));
        }
        let conn = self.db.conn();
        credit_reward(
            &conn,
            user_id,
            &Reward {
                gems: amount,
                ..Default::default()
            },
            now_ms(),
        )?;
        let balance = conn.query_row(
            "SELECT gems FROM user_profile WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| row.get(0),
        )?;
        Ok(balance)
    }

    /// Spend gems atomically. The balance check and the debit are one
    /// statement, so two concurrent purchases cannot both succeed on an
    /// insufficient wallet.
    pub fn spend_gems(&self, user_id: &str, amount: i64) -> EngineResult<i64> {
        if amount < 1 {
            return Err(EngineError::InvalidArgument("gem amount must be at least 1"));
        }
        let conn = self.db.conn();
        let updated = conn.execute(
            "UPDATE user_profile SET gems = gems - ?1 WHERE user_id = ?2 AND gems >= ?1",
            rusqlite::params![amount, user_id],
        )?;
        if updated == 0 {
            let available: i64 = conn
                .query_row(
                    "SELECT gems FROM user_profile WHERE user_id = ?1",
                    rusqlite::params![user_id],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0);
            return Err(EngineError::InsufficientGems {
                needed: amount,
                available,
            });
        }
        debug!(user_id, amount, "gems spent");
        let balance = conn.query_row(
            "SELECT gems FROM user_profile WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| row.get(0),
        )?;
        Ok(balance)
    }

    pub fn set_title(&self, user_id: &str, title: &str) -> EngineResult<()> {
        self.ensure(user_id)?;
        let conn = self.db.conn();
        conn.execute(
            "UPDATE user_profile SET title = ?1 WHERE user_id = ?2",
            rusqlite::params![title, user_id],
        )?;
        Ok(())
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        user_id: row.get(0)?,
        class_id: row.get(1)?,
        grade: row.get(2)?,
        xp_total: row.get(3)?,
        gems: row.get(4)?,
        title: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Credit a reward inside the caller's transaction. Claim paths use this so
/// the claim flag and the wallet credit commit together.
pub(crate) fn credit_reward(
    conn: &Connection,
    user_id: &str,
    reward: &Reward,
    timestamp_ms: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO user_profile (user_id, grade, xp_total, gems, created_at)
         VALUES (?1, 0, 0, 0, ?2)",
        rusqlite::params![user_id, timestamp_ms],
    )?;
    if reward.xp != 0 || reward.gems != 0 {
        conn.execute(
            "UPDATE user_profile SET xp_total = xp_total + ?1, gems = gems + ?2
             WHERE user_id = ?3",
            rusqlite::params![reward.xp, reward.gems, user_id],
        )?;
    }
    if let Some(title) = &reward.title {
        conn.execute(
            "UPDATE user_profile SET title = ?1 WHERE user_id = ?2",
            rusqlite::params![title, user_id],
        )?;
    }
    Ok(())
}
