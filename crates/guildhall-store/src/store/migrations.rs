use super::GuildStore;
use crate::error::Result;

impl GuildStore {
    // ── Migrations ──────────────────────────────────────────────

    pub(crate) async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS adventurers (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                github_username TEXT NOT NULL UNIQUE,
                class           TEXT NOT NULL DEFAULT 'hatchling',
                xp_total        INTEGER NOT NULL DEFAULT 0,
                level           INTEGER NOT NULL DEFAULT 1,
                rank            TEXT NOT NULL DEFAULT 'Iron',
                equipped_title  TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_adventurers_username
             ON adventurers(github_username)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS xp_ledger (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                adventurer_id INTEGER NOT NULL REFERENCES adventurers(id),
                amount        INTEGER NOT NULL,
                source_type   TEXT NOT NULL,
                source_ref    TEXT NOT NULL DEFAULT '',
                created_at    TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_ledger_adventurer
             ON xp_ledger(adventurer_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS adventurer_badges (
                adventurer_id INTEGER NOT NULL REFERENCES adventurers(id),
                badge_slug    TEXT NOT NULL,
                badge_name    TEXT NOT NULL,
                earned_at     TEXT NOT NULL,
                PRIMARY KEY (adventurer_id, badge_slug)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS quest_acceptances (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                adventurer_id INTEGER NOT NULL REFERENCES adventurers(id),
                quest_ref     TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'accepted',
                accepted_at   TEXT NOT NULL,
                submitted_at  TEXT,
                completed_at  TEXT,
                reviewer_id   INTEGER,
                review_notes  TEXT,
                UNIQUE (adventurer_id, quest_ref)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_acceptances_status
             ON quest_acceptances(adventurer_id, status)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS bosses (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id  INTEGER,
                name        TEXT NOT NULL,
                hp_total    INTEGER NOT NULL,
                hp_current  INTEGER NOT NULL,
                status      TEXT NOT NULL DEFAULT 'active',
                created_at  TEXT NOT NULL,
                defeated_at TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bosses_project ON bosses(project_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS loot_crates (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                adventurer_id INTEGER NOT NULL REFERENCES adventurers(id),
                rarity        TEXT NOT NULL,
                source        TEXT NOT NULL DEFAULT 'quest',
                status        TEXT NOT NULL DEFAULT 'unopened',
                contents      TEXT,
                created_at    TEXT NOT NULL,
                opened_at     TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_crates_adventurer
             ON loot_crates(adventurer_id, status)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
