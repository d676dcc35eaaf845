use super::adventurers::{parse_opt_ts, parse_ts};
use super::GuildStore;
use crate::error::{Error, Result};
use crate::types::{Boss, BossStatus};
use chrono::Utc;
use sqlx::Row;

impl GuildStore {
    // ── Bosses ──────────────────────────────────────────────────

    /// Spawn a boss at full health.
    pub async fn create_boss(
        &self,
        name: &str,
        project_id: Option<i64>,
        hp_total: i64,
    ) -> Result<Boss> {
        let result = sqlx::query(
            "INSERT INTO bosses (project_id, name, hp_total, hp_current, status, created_at)
             VALUES (?1, ?2, ?3, ?3, 'active', ?4)",
        )
        .bind(project_id)
        .bind(name)
        .bind(hp_total)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_boss(id)
            .await?
            .ok_or_else(|| Error::Internal(format!("inserted boss {id} not found")))
    }

    /// Get a boss by ID.
    pub async fn get_boss(&self, id: i64) -> Result<Option<Boss>> {
        let row = sqlx::query(
            "SELECT id, project_id, name, hp_total, hp_current, status, created_at, defeated_at
             FROM bosses WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_boss).transpose()
    }

    /// Newest non-defeated boss scoped to a project.
    pub async fn boss_for_project(&self, project_id: i64) -> Result<Option<Boss>> {
        let row = sqlx::query(
            "SELECT id, project_id, name, hp_total, hp_current, status, created_at, defeated_at
             FROM bosses
             WHERE project_id = ?1 AND status != 'defeated'
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_boss).transpose()
    }

    /// Persist HP and status after damage.
    pub async fn save_boss(&self, boss: &Boss) -> Result<()> {
        sqlx::query(
            "UPDATE bosses
             SET hp_current = ?2, status = ?3, defeated_at = ?4
             WHERE id = ?1",
        )
        .bind(boss.id)
        .bind(boss.hp_current)
        .bind(boss.status.as_str())
        .bind(boss.defeated_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub(crate) fn row_to_boss(row: &sqlx::sqlite::SqliteRow) -> Result<Boss> {
        let status_str: String = row.try_get("status")?;
        let status: BossStatus = status_str.parse().map_err(Error::CorruptRow)?;
        let created_str: String = row.try_get("created_at")?;
        Ok(Boss {
            id: row.try_get("id")?,
            project_id: row.try_get("project_id")?,
            name: row.try_get("name")?,
            hp_total: row.try_get("hp_total")?,
            hp_current: row.try_get("hp_current")?,
            status,
            created_at: parse_ts(&created_str),
            defeated_at: parse_opt_ts(row.try_get("defeated_at")?),
        })
    }
}
