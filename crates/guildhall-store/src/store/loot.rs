use super::adventurers::{parse_opt_ts, parse_ts};
use super::{GuildStore, StoreTx};
use crate::error::{Error, Result};
use crate::types::{CrateContents, CrateStatus, LootCrate, Rarity};
use chrono::Utc;
use sqlx::Row;

impl GuildStore {
    // ── Loot crates ─────────────────────────────────────────────

    /// Persist a freshly awarded, unopened crate. Returns its ID.
    pub async fn create_crate(
        &self,
        adventurer_id: i64,
        rarity: Rarity,
        source: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO loot_crates (adventurer_id, rarity, source, status, created_at)
             VALUES (?1, ?2, ?3, 'unopened', ?4)",
        )
        .bind(adventurer_id)
        .bind(rarity.as_str())
        .bind(source)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a crate by ID.
    pub async fn get_crate(&self, id: i64) -> Result<Option<LootCrate>> {
        let row = sqlx::query(
            "SELECT id, adventurer_id, rarity, source, status, contents, created_at, opened_at
             FROM loot_crates WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_crate).transpose()
    }

    /// Mark a crate opened and persist its contents, inside the open
    /// transaction. The status guard makes opening one-time even under a
    /// racing second open; returns false if the crate was not unopened.
    pub async fn open_crate_tx(
        &self,
        tx: &mut StoreTx,
        id: i64,
        contents: &CrateContents,
    ) -> Result<bool> {
        let payload = serde_json::to_string(contents)?;
        let result = sqlx::query(
            "UPDATE loot_crates
             SET status = 'opened', contents = ?2, opened_at = ?3
             WHERE id = ?1 AND status = 'unopened'",
        )
        .bind(id)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All crates owned by an adventurer, newest first.
    pub async fn crates_for_adventurer(&self, adventurer_id: i64) -> Result<Vec<LootCrate>> {
        let rows = sqlx::query(
            "SELECT id, adventurer_id, rarity, source, status, contents, created_at, opened_at
             FROM loot_crates WHERE adventurer_id = ?1
             ORDER BY created_at DESC",
        )
        .bind(adventurer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_crate).collect()
    }

    /// How many unopened crates an adventurer is sitting on.
    pub async fn unopened_count(&self, adventurer_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM loot_crates
             WHERE adventurer_id = ?1 AND status = 'unopened'",
        )
        .bind(adventurer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("count")?)
    }

    pub(crate) fn row_to_crate(row: &sqlx::sqlite::SqliteRow) -> Result<LootCrate> {
        let rarity_str: String = row.try_get("rarity")?;
        let status_str: String = row.try_get("status")?;
        let status: CrateStatus = status_str.parse().map_err(Error::CorruptRow)?;
        let contents_str: Option<String> = row.try_get("contents")?;
        let contents = contents_str
            .map(|s| serde_json::from_str::<CrateContents>(&s))
            .transpose()?;
        let created_str: String = row.try_get("created_at")?;
        Ok(LootCrate {
            id: row.try_get("id")?,
            adventurer_id: row.try_get("adventurer_id")?,
            rarity: Rarity::from_str_lossy(&rarity_str),
            source: row.try_get("source")?,
            status,
            contents,
            created_at: parse_ts(&created_str),
            opened_at: parse_opt_ts(row.try_get("opened_at")?),
        })
    }
}
