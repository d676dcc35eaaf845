use super::adventurers::{parse_opt_ts, parse_ts};
use super::{GuildStore, StoreTx};
use crate::error::{Error, Result};
use crate::types::{QuestAcceptance, QuestStatus};
use chrono::Utc;
use sqlx::Row;

impl GuildStore {
    // ── Quest acceptances ───────────────────────────────────────

    /// Create a fresh `accepted` row for (adventurer, quest_ref).
    pub async fn create_acceptance(
        &self,
        adventurer_id: i64,
        quest_ref: &str,
    ) -> Result<QuestAcceptance> {
        let result = sqlx::query(
            "INSERT INTO quest_acceptances (adventurer_id, quest_ref, status, accepted_at)
             VALUES (?1, ?2, 'accepted', ?3)",
        )
        .bind(adventurer_id)
        .bind(quest_ref)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_acceptance(id)
            .await?
            .ok_or_else(|| Error::Internal(format!("inserted acceptance {id} not found")))
    }

    /// Reopen a rejected row: back to `accepted` with every timestamp and
    /// review field reset, as if the attempt had just begun.
    pub async fn reopen_acceptance(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE quest_acceptances
             SET status = 'accepted', accepted_at = ?2,
                 submitted_at = NULL, completed_at = NULL,
                 reviewer_id = NULL, review_notes = NULL
             WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get an acceptance row by ID.
    pub async fn get_acceptance(&self, id: i64) -> Result<Option<QuestAcceptance>> {
        let row = sqlx::query(
            "SELECT id, adventurer_id, quest_ref, status, accepted_at, submitted_at,
                    completed_at, reviewer_id, review_notes
             FROM quest_acceptances WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_acceptance).transpose()
    }

    /// Find the acceptance row for (adventurer, quest_ref).
    pub async fn find_acceptance(
        &self,
        adventurer_id: i64,
        quest_ref: &str,
    ) -> Result<Option<QuestAcceptance>> {
        let row = sqlx::query(
            "SELECT id, adventurer_id, quest_ref, status, accepted_at, submitted_at,
                    completed_at, reviewer_id, review_notes
             FROM quest_acceptances WHERE adventurer_id = ?1 AND quest_ref = ?2",
        )
        .bind(adventurer_id)
        .bind(quest_ref)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_acceptance).transpose()
    }

    /// All acceptances for an adventurer, most recently accepted first.
    pub async fn acceptances_for_adventurer(
        &self,
        adventurer_id: i64,
    ) -> Result<Vec<QuestAcceptance>> {
        let rows = sqlx::query(
            "SELECT id, adventurer_id, quest_ref, status, accepted_at, submitted_at,
                    completed_at, reviewer_id, review_notes
             FROM quest_acceptances
             WHERE adventurer_id = ?1
             ORDER BY accepted_at DESC",
        )
        .bind(adventurer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_acceptance).collect()
    }

    /// Count of completed quests, the rank-threshold input.
    pub async fn count_completed(&self, adventurer_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM quest_acceptances
             WHERE adventurer_id = ?1 AND status = 'completed'",
        )
        .bind(adventurer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("count")?)
    }

    /// Move an accepted row to `submitted`, stamping submitted_at and
    /// recording the proof reference in review_notes.
    pub async fn mark_submitted(&self, id: i64, notes: &str) -> Result<()> {
        sqlx::query(
            "UPDATE quest_acceptances
             SET status = 'submitted', submitted_at = ?2, review_notes = ?3
             WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now().to_rfc3339())
        .bind(notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a row `completed` inside the completion transaction, stamping
    /// completed_at and the resolving reviewer.
    pub async fn mark_completed_tx(
        &self,
        tx: &mut StoreTx,
        id: i64,
        reviewer_id: Option<i64>,
        notes: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE quest_acceptances
             SET status = 'completed', completed_at = ?2, reviewer_id = ?3, review_notes = ?4
             WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now().to_rfc3339())
        .bind(reviewer_id)
        .bind(notes)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Mark a row `rejected`, clearing completed_at.
    pub async fn mark_rejected(
        &self,
        id: i64,
        reviewer_id: Option<i64>,
        notes: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE quest_acceptances
             SET status = 'rejected', completed_at = NULL, reviewer_id = ?2, review_notes = ?3
             WHERE id = ?1",
        )
        .bind(id)
        .bind(reviewer_id)
        .bind(notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub(crate) fn row_to_acceptance(row: &sqlx::sqlite::SqliteRow) -> Result<QuestAcceptance> {
        let status_str: String = row.try_get("status")?;
        let status: QuestStatus = status_str.parse().map_err(Error::CorruptRow)?;
        let accepted_str: String = row.try_get("accepted_at")?;
        Ok(QuestAcceptance {
            id: row.try_get("id")?,
            adventurer_id: row.try_get("adventurer_id")?,
            quest_ref: row.try_get("quest_ref")?,
            status,
            accepted_at: parse_ts(&accepted_str),
            submitted_at: parse_opt_ts(row.try_get("submitted_at")?),
            completed_at: parse_opt_ts(row.try_get("completed_at")?),
            reviewer_id: row.try_get("reviewer_id")?,
            review_notes: row.try_get("review_notes")?,
        })
    }
}
