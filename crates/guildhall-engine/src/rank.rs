//! Rank progression — threshold table, gating checks and promotion.
//!
//! A rank requires both a completed-quest count and an XP total. Ranks are
//! recomputed after quest completions and only ever move up.

use guildhall_store::{GuildStore, Rank};
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};

/// Requirements for holding a rank.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RankThreshold {
    /// The rank these requirements gate
    pub rank: Rank,
    /// Minimum completed quests
    pub min_quests: i64,
    /// Minimum XP total
    pub min_xp: i64,
}

/// The rank ladder, ascending. Both thresholds must be met simultaneously.
pub const RANK_THRESHOLDS: [RankThreshold; 5] = [
    RankThreshold {
        rank: Rank::Iron,
        min_quests: 0,
        min_xp: 0,
    },
    RankThreshold {
        rank: Rank::Silver,
        min_quests: 3,
        min_xp: 150,
    },
    RankThreshold {
        rank: Rank::Gold,
        min_quests: 10,
        min_xp: 500,
    },
    RankThreshold {
        rank: Rank::Jade,
        min_quests: 25,
        min_xp: 1500,
    },
    RankThreshold {
        rank: Rank::Diamond,
        min_quests: 50,
        min_xp: 5000,
    },
];

/// Outcome of a rank recalculation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RankChange {
    /// Rank before recalculation
    pub old_rank: Rank,
    /// Highest rank whose thresholds are now met
    pub new_rank: Rank,
    /// True iff the persisted rank moved up
    pub promoted: bool,
}

/// Progress toward the next rank.
#[derive(Debug, Clone, Serialize)]
pub struct RankProgress {
    /// Current rank
    pub current_rank: Rank,
    /// Next rank up, or `None` at Diamond
    pub next_rank: Option<Rank>,
    /// Completed quest count
    pub completed_quests: i64,
    /// Running XP total
    pub total_xp: i64,
    /// Quests still needed for the next rank
    pub quests_needed: i64,
    /// XP still needed for the next rank
    pub xp_needed: i64,
    /// Average of quest and XP progress toward the next rank, capped at 100
    pub progress_percent: i32,
}

/// Rank derivation and gating over the store.
#[derive(Clone)]
pub struct RankProgression {
    store: GuildStore,
}

impl RankProgression {
    /// Create a rank progression component.
    #[must_use]
    pub fn new(store: GuildStore) -> Self {
        Self { store }
    }

    /// The threshold entry for a rank.
    #[must_use]
    pub fn threshold_for(rank: Rank) -> RankThreshold {
        RANK_THRESHOLDS[rank.ordinal()]
    }

    /// Current rank, degrading to `Iron` when the profile (or its rank
    /// attribute) is missing rather than failing.
    pub async fn rank_of(&self, adventurer_id: i64) -> Result<Rank> {
        Ok(self
            .store
            .get_adventurer(adventurer_id)
            .await?
            .map(|a| a.rank)
            .unwrap_or(Rank::Iron))
    }

    /// Whether the adventurer's rank meets a requirement.
    pub async fn meets_requirement(&self, adventurer_id: i64, required: Rank) -> Result<bool> {
        Ok(self.rank_of(adventurer_id).await? >= required)
    }

    /// Recompute the rank from completed quests and XP, persisting only an
    /// upward change. Ranks never regress through this path.
    pub async fn recalculate(&self, adventurer_id: i64) -> Result<RankChange> {
        let adventurer = self
            .store
            .get_adventurer(adventurer_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("adventurer {adventurer_id} not found")))?;
        let old_rank = adventurer.rank;

        let completed = self.store.count_completed(adventurer_id).await?;
        let total_xp = adventurer.xp_total;

        let mut new_rank = Rank::Iron;
        for threshold in RANK_THRESHOLDS {
            if completed >= threshold.min_quests && total_xp >= threshold.min_xp {
                new_rank = threshold.rank;
            }
        }

        let promoted = new_rank > old_rank;
        if promoted {
            self.store.update_rank(adventurer_id, new_rank).await?;
            info!(
                adventurer_id,
                old_rank = %old_rank,
                new_rank = %new_rank,
                "rank promotion"
            );
        }

        Ok(RankChange {
            old_rank,
            new_rank,
            promoted,
        })
    }

    /// Progress toward the next rank, for profile display.
    pub async fn progress(&self, adventurer_id: i64) -> Result<RankProgress> {
        let adventurer = self
            .store
            .get_adventurer(adventurer_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("adventurer {adventurer_id} not found")))?;
        let current_rank = adventurer.rank;
        let completed = self.store.count_completed(adventurer_id).await?;
        let total_xp = adventurer.xp_total;

        let Some(next_rank) = current_rank.next() else {
            return Ok(RankProgress {
                current_rank,
                next_rank: None,
                completed_quests: completed,
                total_xp,
                quests_needed: 0,
                xp_needed: 0,
                progress_percent: 100,
            });
        };

        let required = Self::threshold_for(next_rank);
        let quests_needed = (required.min_quests - completed).max(0);
        let xp_needed = (required.min_xp - total_xp).max(0);

        let quest_progress = if required.min_quests > 0 {
            (completed as f64 / required.min_quests as f64 * 100.0).min(100.0)
        } else {
            100.0
        };
        let xp_progress = if required.min_xp > 0 {
            (total_xp as f64 / required.min_xp as f64 * 100.0).min(100.0)
        } else {
            100.0
        };
        let progress_percent = ((quest_progress + xp_progress) / 2.0).round() as i32;

        Ok(RankProgress {
            current_rank,
            next_rank: Some(next_rank),
            completed_quests: completed,
            total_xp,
            quests_needed,
            xp_needed,
            progress_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildhall_store::{GuildStore, QuestStatus};

    async fn setup() -> (RankProgression, GuildStore) {
        let store = GuildStore::in_memory().await.unwrap();
        (RankProgression::new(store.clone()), store)
    }

    async fn complete_quests(store: &GuildStore, adventurer_id: i64, count: usize) {
        for i in 0..count {
            let acc = store
                .create_acceptance(adventurer_id, &format!("rank-quest-{i}"))
                .await
                .unwrap();
            store.mark_submitted(acc.id, "PR: x").await.unwrap();
            let mut tx = store.begin().await.unwrap();
            store
                .mark_completed_tx(&mut tx, acc.id, None, None)
                .await
                .unwrap();
            tx.commit().await.unwrap();
            let got = store.get_acceptance(acc.id).await.unwrap().unwrap();
            assert_eq!(got.status, QuestStatus::Completed);
        }
    }

    async fn set_xp(store: &GuildStore, adventurer_id: i64, xp: i64) {
        let mut tx = store.begin().await.unwrap();
        store
            .update_xp_and_level_tx(&mut tx, adventurer_id, xp, 1)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_rank_of_missing_adventurer_defaults_iron() {
        let (ranks, _store) = setup().await;
        assert_eq!(ranks.rank_of(404).await.unwrap(), Rank::Iron);
        assert!(ranks.meets_requirement(404, Rank::Iron).await.unwrap());
        assert!(!ranks.meets_requirement(404, Rank::Silver).await.unwrap());
    }

    #[tokio::test]
    async fn test_recalculate_promotes_when_both_thresholds_met() {
        let (ranks, store) = setup().await;
        let adv = store.create_adventurer("octocat", "hatchling").await.unwrap();

        // XP alone is not enough
        set_xp(&store, adv.id, 200).await;
        let change = ranks.recalculate(adv.id).await.unwrap();
        assert_eq!(change.new_rank, Rank::Iron);
        assert!(!change.promoted);

        // Quests alone are not enough either
        complete_quests(&store, adv.id, 3).await;
        set_xp(&store, adv.id, 100).await;
        let change = ranks.recalculate(adv.id).await.unwrap();
        assert!(!change.promoted);

        // Both together promote
        set_xp(&store, adv.id, 200).await;
        let change = ranks.recalculate(adv.id).await.unwrap();
        assert_eq!(change.old_rank, Rank::Iron);
        assert_eq!(change.new_rank, Rank::Silver);
        assert!(change.promoted);
        assert_eq!(ranks.rank_of(adv.id).await.unwrap(), Rank::Silver);
    }

    #[tokio::test]
    async fn test_recalculate_picks_highest_qualifying_rank() {
        let (ranks, store) = setup().await;
        let adv = store.create_adventurer("octocat", "hatchling").await.unwrap();
        complete_quests(&store, adv.id, 10).await;
        set_xp(&store, adv.id, 600).await;

        let change = ranks.recalculate(adv.id).await.unwrap();
        assert_eq!(change.new_rank, Rank::Gold);
    }

    #[tokio::test]
    async fn test_recalculate_never_demotes() {
        let (ranks, store) = setup().await;
        let adv = store.create_adventurer("octocat", "hatchling").await.unwrap();
        store.update_rank(adv.id, Rank::Gold).await.unwrap();

        // No completed quests, no XP — thresholds now say Iron
        let change = ranks.recalculate(adv.id).await.unwrap();
        assert_eq!(change.old_rank, Rank::Gold);
        assert_eq!(change.new_rank, Rank::Iron);
        assert!(!change.promoted);
        assert_eq!(ranks.rank_of(adv.id).await.unwrap(), Rank::Gold);
    }

    #[tokio::test]
    async fn test_progress_midway() {
        let (ranks, store) = setup().await;
        let adv = store.create_adventurer("octocat", "hatchling").await.unwrap();
        complete_quests(&store, adv.id, 2).await;
        set_xp(&store, adv.id, 75).await;

        let progress = ranks.progress(adv.id).await.unwrap();
        assert_eq!(progress.current_rank, Rank::Iron);
        assert_eq!(progress.next_rank, Some(Rank::Silver));
        assert_eq!(progress.quests_needed, 1);
        assert_eq!(progress.xp_needed, 75);
        // (2/3 + 75/150) / 2 ≈ 58%
        assert_eq!(progress.progress_percent, 58);
    }

    #[tokio::test]
    async fn test_progress_caps_each_component() {
        let (ranks, store) = setup().await;
        let adv = store.create_adventurer("octocat", "hatchling").await.unwrap();
        // Way past the XP bar, no quests: capped at (0 + 100) / 2
        set_xp(&store, adv.id, 10_000).await;

        let progress = ranks.progress(adv.id).await.unwrap();
        assert_eq!(progress.progress_percent, 50);
        assert_eq!(progress.xp_needed, 0);
    }

    #[tokio::test]
    async fn test_progress_at_diamond() {
        let (ranks, store) = setup().await;
        let adv = store.create_adventurer("octocat", "hatchling").await.unwrap();
        store.update_rank(adv.id, Rank::Diamond).await.unwrap();

        let progress = ranks.progress(adv.id).await.unwrap();
        assert_eq!(progress.next_rank, None);
        assert_eq!(progress.progress_percent, 100);
        assert_eq!(progress.quests_needed, 0);
        assert_eq!(progress.xp_needed, 0);
    }
}
