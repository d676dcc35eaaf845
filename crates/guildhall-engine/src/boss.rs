//! Boss damage trigger — the side effect of quest completion.
//!
//! Fire-and-forget: callers route it through the best-effort wrapper and
//! never block completion on it.

use guildhall_store::{Boss, BossStatus, GuildStore};
use tracing::info;

use crate::error::Result;

/// Damage dealt per XP point earned.
pub const DAMAGE_PER_XP: i64 = 10;

/// Applies quest XP as damage to project bosses.
#[derive(Clone)]
pub struct BossEngine {
    store: GuildStore,
}

impl BossEngine {
    /// Create a boss engine.
    #[must_use]
    pub fn new(store: GuildStore) -> Self {
        Self { store }
    }

    /// Damage the project's active boss after a quest completion.
    ///
    /// No-op when there is no project, no positive XP, no boss, or the boss
    /// is not `active`. Returns the updated boss when damage landed.
    pub async fn handle_quest_completion(
        &self,
        project_id: Option<i64>,
        xp_earned: i64,
    ) -> Result<Option<Boss>> {
        let Some(project_id) = project_id else {
            return Ok(None);
        };
        if xp_earned <= 0 {
            return Ok(None);
        }

        let Some(mut boss) = self.store.boss_for_project(project_id).await? else {
            return Ok(None);
        };
        if boss.status != BossStatus::Active {
            return Ok(None);
        }

        let damage = xp_earned * DAMAGE_PER_XP;
        boss.take_damage(damage);
        self.store.save_boss(&boss).await?;

        info!(
            project_id,
            boss_id = boss.id,
            damage,
            hp_current = boss.hp_current,
            defeated = boss.status == BossStatus::Defeated,
            "boss damaged"
        );
        Ok(Some(boss))
    }
}
