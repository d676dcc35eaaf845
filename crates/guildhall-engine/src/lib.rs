//! Guildhall Engine — quest and progression core.
//!
//! The behavioral heart of the platform:
//! - Gamification: XP grants, the level curve, badge unlocks
//! - RankProgression: threshold-driven rank gating and promotion
//! - QuestLifecycle: accept → submit → complete/reject state machine
//! - LootCrateEngine: weighted rarity rolls and one-time crate opening
//! - BossEngine: quest XP applied as damage to project bosses
//!
//! # Architecture
//!
//! ```text
//! accept/submit/review ──► QuestLifecycle ──┬─► GamificationEngine ─► GuildStore
//!                                           ├─► RankProgression    ─► GuildStore
//!                                           └─► BossEngine         ─► GuildStore
//! award/open crate ──────► LootCrateEngine ─┴─► GamificationEngine
//! ```
//!
//! Primary writes (state transition + XP grant) commit atomically; rank
//! recalculation, reviewer bonuses and boss damage run best-effort after
//! commit and only log their failures.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod boss;
mod effects;
pub mod error;
pub mod gamification;
pub mod loot;
pub mod quest;
pub mod rank;

pub use boss::{BossEngine, DAMAGE_PER_XP};
pub use error::{Error, Result};
pub use gamification::{level_for_xp, BadgeRule, GamificationEngine, XpAward};
pub use loot::{CrateAward, LootCrateEngine, LootTables, RarityPreview};
pub use quest::{
    reviewer_bonus, transition, CompletionOutcome, CompletionRequest, QuestAction, QuestLifecycle,
    ReviewOutcome, ReviewRequest, REVIEWER_MIN_RANK,
};
pub use rank::{RankChange, RankProgress, RankProgression, RankThreshold, RANK_THRESHOLDS};

// The engine's data types come from the store crate.
pub use guildhall_store::{
    Adventurer, Badge, BadgeRef, Boss, BossStatus, CrateContents, CrateStatus, GuildStore,
    LootCrate, QuestAcceptance, QuestStatus, Rank, Rarity, XpLedgerEntry, XpSource,
};

/// All engine components wired over one shared store.
#[derive(Clone)]
pub struct Guildhall {
    store: GuildStore,
    gamification: GamificationEngine,
    ranks: RankProgression,
    quests: QuestLifecycle,
    loot: LootCrateEngine,
    bosses: BossEngine,
}

impl Guildhall {
    /// Wire the engine over an existing store.
    #[must_use]
    pub fn with_store(store: GuildStore) -> Self {
        let gamification = GamificationEngine::new(store.clone());
        let ranks = RankProgression::new(store.clone());
        let bosses = BossEngine::new(store.clone());
        let quests = QuestLifecycle::new(
            store.clone(),
            gamification.clone(),
            ranks.clone(),
            bosses.clone(),
        );
        let loot = LootCrateEngine::new(store.clone(), gamification.clone());
        Self {
            store,
            gamification,
            ranks,
            quests,
            loot,
            bosses,
        }
    }

    /// Open (or create) a file-backed engine.
    pub async fn from_path(path: &std::path::Path) -> Result<Self> {
        Ok(Self::with_store(GuildStore::from_path(path).await?))
    }

    /// In-memory engine (useful for tests).
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::with_store(GuildStore::in_memory().await?))
    }

    /// The shared store.
    #[must_use]
    pub fn store(&self) -> &GuildStore {
        &self.store
    }

    /// XP and badge engine.
    #[must_use]
    pub fn gamification(&self) -> &GamificationEngine {
        &self.gamification
    }

    /// Rank gating and promotion.
    #[must_use]
    pub fn ranks(&self) -> &RankProgression {
        &self.ranks
    }

    /// Quest lifecycle state machine.
    #[must_use]
    pub fn quests(&self) -> &QuestLifecycle {
        &self.quests
    }

    /// Loot crate engine.
    #[must_use]
    pub fn loot(&self) -> &LootCrateEngine {
        &self.loot
    }

    /// Boss damage trigger.
    #[must_use]
    pub fn bosses(&self) -> &BossEngine {
        &self.bosses
    }
}
