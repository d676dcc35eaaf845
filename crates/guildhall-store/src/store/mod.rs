//! GuildStore — SQLite persistence for adventurers, quests, crates and bosses.

use crate::error::{Error, Result};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

mod adventurers;
mod bosses;
mod loot;
mod migrations;
mod quests;


pub use adventurers::DEFAULT_CLASS;

/// A transaction over the store's connection pool.
pub type StoreTx = sqlx::Transaction<'static, sqlx::Sqlite>;

/// SQLite-backed store for all progression entities.
#[derive(Clone)]
pub struct GuildStore {
    pub(crate) pool: SqlitePool,
}

impl GuildStore {
    /// Open (or create) a store at the given path.
    pub async fn from_path(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Internal(format!("mkdir: {e}")))?;
        }
        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        // Enable WAL for read/write concurrency
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Guild store initialized at {}", db_path.display());
        Ok(store)
    }

    /// In-memory store (for tests).
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.run_migrations().await?;
        debug!("In-memory guild store initialized");
        Ok(store)
    }

    /// Begin a transaction for writes that must land together.
    pub async fn begin(&self) -> Result<StoreTx> {
        Ok(self.pool.begin().await?)
    }
}
