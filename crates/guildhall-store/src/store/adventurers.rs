use super::{GuildStore, StoreTx};
use crate::error::Result;
use crate::types::{Adventurer, Badge, Rank, XpLedgerEntry, XpSource};
use chrono::{DateTime, Utc};
use sqlx::Row;

/// Default display class for profiles created on first XP-worthy event.
pub const DEFAULT_CLASS: &str = "hatchling";

pub(crate) fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_opt_ts(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|v| parse_ts(&v))
}

impl GuildStore {
    // ── Adventurers ─────────────────────────────────────────────

    /// Create a profile with starting stats (0 XP, level 1, Iron).
    pub async fn create_adventurer(&self, github_username: &str, class: &str) -> Result<Adventurer> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO adventurers (github_username, class, xp_total, level, rank, created_at, updated_at)
             VALUES (?1, ?2, 0, 1, 'Iron', ?3, ?3)",
        )
        .bind(github_username)
        .bind(class)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_adventurer(id).await?.ok_or_else(|| {
            crate::error::Error::Internal(format!("inserted adventurer {id} not found"))
        })
    }

    /// Look up by GitHub username, creating a default profile if absent.
    pub async fn find_or_create_adventurer(&self, github_username: &str) -> Result<Adventurer> {
        if let Some(adventurer) = self.get_adventurer_by_username(github_username).await? {
            return Ok(adventurer);
        }
        self.create_adventurer(github_username, DEFAULT_CLASS).await
    }

    /// Get an adventurer by ID.
    pub async fn get_adventurer(&self, id: i64) -> Result<Option<Adventurer>> {
        let row = sqlx::query(
            "SELECT id, github_username, class, xp_total, level, rank, equipped_title,
                    created_at, updated_at
             FROM adventurers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_adventurer).transpose()
    }

    /// Get an adventurer by GitHub username.
    pub async fn get_adventurer_by_username(&self, username: &str) -> Result<Option<Adventurer>> {
        let row = sqlx::query(
            "SELECT id, github_username, class, xp_total, level, rank, equipped_title,
                    created_at, updated_at
             FROM adventurers WHERE github_username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_adventurer).transpose()
    }

    /// Get an adventurer through an open transaction, so grant flows read
    /// and write over the same connection.
    pub async fn get_adventurer_tx(&self, tx: &mut StoreTx, id: i64) -> Result<Option<Adventurer>> {
        let row = sqlx::query(
            "SELECT id, github_username, class, xp_total, level, rank, equipped_title,
                    created_at, updated_at
             FROM adventurers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        row.as_ref().map(Self::row_to_adventurer).transpose()
    }

    /// Persist a new XP total and level inside a grant transaction.
    pub async fn update_xp_and_level_tx(
        &self,
        tx: &mut StoreTx,
        id: i64,
        xp_total: i64,
        level: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE adventurers SET xp_total = ?2, level = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(xp_total)
        .bind(level)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Persist a rank change.
    pub async fn update_rank(&self, id: i64, rank: Rank) -> Result<()> {
        sqlx::query("UPDATE adventurers SET rank = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(rank.as_str())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Equip (or clear) a display title.
    pub async fn update_equipped_title(&self, id: i64, title: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE adventurers SET equipped_title = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(title)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Top adventurers by XP, then level, then seniority.
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<Adventurer>> {
        let rows = sqlx::query(
            "SELECT id, github_username, class, xp_total, level, rank, equipped_title,
                    created_at, updated_at
             FROM adventurers
             ORDER BY xp_total DESC, level DESC, created_at ASC
             LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_adventurer).collect()
    }

    pub(crate) fn row_to_adventurer(row: &sqlx::sqlite::SqliteRow) -> Result<Adventurer> {
        let rank_str: String = row.try_get("rank")?;
        let created_str: String = row.try_get("created_at")?;
        let updated_str: String = row.try_get("updated_at")?;
        Ok(Adventurer {
            id: row.try_get("id")?,
            github_username: row.try_get("github_username")?,
            class: row.try_get("class")?,
            xp_total: row.try_get("xp_total")?,
            level: row.try_get("level")?,
            rank: Rank::from_str_lossy(&rank_str),
            equipped_title: row.try_get("equipped_title")?,
            created_at: parse_ts(&created_str),
            updated_at: parse_ts(&updated_str),
        })
    }

    // ── XP ledger ───────────────────────────────────────────────

    /// Append one ledger entry inside a grant transaction. Write-once.
    pub async fn append_ledger_tx(
        &self,
        tx: &mut StoreTx,
        adventurer_id: i64,
        amount: i64,
        source: XpSource,
        source_ref: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO xp_ledger (adventurer_id, amount, source_type, source_ref, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(adventurer_id)
        .bind(amount)
        .bind(source.as_str())
        .bind(source_ref)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Ledger history for an adventurer, newest first.
    pub async fn ledger_for_adventurer(&self, adventurer_id: i64) -> Result<Vec<XpLedgerEntry>> {
        let rows = sqlx::query(
            "SELECT id, adventurer_id, amount, source_type, source_ref, created_at
             FROM xp_ledger WHERE adventurer_id = ?1
             ORDER BY id DESC",
        )
        .bind(adventurer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let source_str: String = row.try_get("source_type")?;
                let created_str: String = row.try_get("created_at")?;
                Ok(XpLedgerEntry {
                    id: row.try_get("id")?,
                    adventurer_id: row.try_get("adventurer_id")?,
                    amount: row.try_get("amount")?,
                    source: source_str
                        .parse()
                        .map_err(crate::error::Error::CorruptRow)?,
                    source_ref: row.try_get("source_ref")?,
                    created_at: parse_ts(&created_str),
                })
            })
            .collect()
    }

    // ── Badges ──────────────────────────────────────────────────

    /// Whether the adventurer already holds a badge, checked inside the
    /// grant transaction so award-once stays race-free.
    pub async fn has_badge_tx(&self, tx: &mut StoreTx, adventurer_id: i64, slug: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM adventurer_badges
             WHERE adventurer_id = ?1 AND badge_slug = ?2",
        )
        .bind(adventurer_id)
        .bind(slug)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.try_get::<i64, _>("count")? > 0)
    }

    /// Award a badge inside a grant transaction. No-op if already held.
    pub async fn award_badge_tx(
        &self,
        tx: &mut StoreTx,
        adventurer_id: i64,
        slug: &str,
        name: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO adventurer_badges (adventurer_id, badge_slug, badge_name, earned_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(adventurer_id)
        .bind(slug)
        .bind(name)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// All badges held by an adventurer.
    pub async fn badges_for_adventurer(&self, adventurer_id: i64) -> Result<Vec<Badge>> {
        let rows = sqlx::query(
            "SELECT adventurer_id, badge_slug, badge_name, earned_at
             FROM adventurer_badges WHERE adventurer_id = ?1
             ORDER BY earned_at",
        )
        .bind(adventurer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let earned_str: String = row.try_get("earned_at")?;
                Ok(Badge {
                    adventurer_id: row.try_get("adventurer_id")?,
                    slug: row.try_get("badge_slug")?,
                    name: row.try_get("badge_name")?,
                    earned_at: parse_ts(&earned_str),
                })
            })
            .collect()
    }
}
