//! Loot crate engine — weighted rarity rolls and one-time crate opening.
//!
//! All probabilities live in [`LootTables`]; new rarities, badges or titles
//! are data changes. Every roll is a fresh `thread_rng` draw.

use guildhall_store::{BadgeRef, CrateContents, CrateStatus, GuildStore, Rarity, XpSource};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gamification::GamificationEngine;

/// Drop-rate and reward configuration, owned by the engine.
#[derive(Debug, Clone)]
pub struct LootTables {
    /// Rarity weights, scanned cumulatively in this order (first match wins)
    pub weights: [(Rarity, u32); 5],
    /// Inclusive XP range rolled per rarity
    pub xp_ranges: [(Rarity, (i64, i64)); 5],
    /// Badge pools per rarity; rarities without a pool never drop badges
    pub badge_pools: Vec<(Rarity, Vec<BadgeRef>)>,
    /// Title pools per rarity
    pub title_pools: Vec<(Rarity, Vec<String>)>,
    /// Chance (percent) that a crate with a badge pool drops a badge
    pub badge_chance_pct: u32,
    /// Chance (percent) that a crate drops a title
    pub title_chance_pct: u32,
}

impl Default for LootTables {
    fn default() -> Self {
        let badge = |slug: &str, name: &str| BadgeRef {
            slug: slug.into(),
            name: name.into(),
        };
        Self {
            weights: [
                (Rarity::Common, 50),
                (Rarity::Uncommon, 30),
                (Rarity::Rare, 13),
                (Rarity::Epic, 5),
                (Rarity::Legendary, 2),
            ],
            xp_ranges: [
                (Rarity::Common, (10, 30)),
                (Rarity::Uncommon, (25, 75)),
                (Rarity::Rare, (50, 200)),
                (Rarity::Epic, (150, 500)),
                (Rarity::Legendary, (400, 1000)),
            ],
            badge_pools: vec![
                (Rarity::Rare, vec![badge("lucky-find", "Lucky Find")]),
                (Rarity::Epic, vec![badge("treasure-hunter", "Treasure Hunter")]),
                (
                    Rarity::Legendary,
                    vec![badge("jackpot", "Jackpot!"), badge("golden-egg", "Golden Egg")],
                ),
            ],
            title_pools: vec![
                (Rarity::Common, vec!["Novice Looter".into()]),
                (
                    Rarity::Uncommon,
                    vec!["Chest Opener".into(), "Fortune Seeker".into()],
                ),
                (
                    Rarity::Rare,
                    vec!["Treasure Digger".into(), "Relic Finder".into()],
                ),
                (Rarity::Epic, vec!["Vault Raider".into(), "Loot Goblin".into()]),
                (
                    Rarity::Legendary,
                    vec![
                        "Dragon Hoarder".into(),
                        "Midas Touch".into(),
                        "The Chosen One".into(),
                    ],
                ),
            ],
            badge_chance_pct: 40,
            title_chance_pct: 25,
        }
    }
}

impl LootTables {
    /// The inclusive XP range for a rarity.
    #[must_use]
    pub fn xp_range(&self, rarity: Rarity) -> (i64, i64) {
        self.xp_ranges
            .iter()
            .find(|(r, _)| *r == rarity)
            .map(|(_, range)| *range)
            .unwrap_or((10, 30))
    }

    fn badge_pool(&self, rarity: Rarity) -> &[BadgeRef] {
        self.badge_pools
            .iter()
            .find(|(r, _)| *r == rarity)
            .map(|(_, pool)| pool.as_slice())
            .unwrap_or(&[])
    }

    fn title_pool(&self, rarity: Rarity) -> &[String] {
        self.title_pools
            .iter()
            .find(|(r, _)| *r == rarity)
            .map(|(_, pool)| pool.as_slice())
            .unwrap_or(&[])
    }
}

/// A freshly awarded crate.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CrateAward {
    /// New crate ID
    pub crate_id: i64,
    /// Rarity rolled at award time
    pub rarity: Rarity,
}

/// One row of the public drop-rate preview.
#[derive(Debug, Clone, Serialize)]
pub struct RarityPreview {
    /// Rarity tier
    pub rarity: Rarity,
    /// Roll weight (out of the weight sum)
    pub weight: u32,
    /// Inclusive XP range
    pub xp_range: (i64, i64),
    /// Badge drop chance, where a pool exists
    pub badge_chance_pct: Option<u32>,
    /// Title drop chance
    pub title_chance_pct: u32,
}

/// Loot crate rolls, awards and opening.
#[derive(Clone)]
pub struct LootCrateEngine {
    store: GuildStore,
    gamification: GamificationEngine,
    tables: std::sync::Arc<LootTables>,
}

impl LootCrateEngine {
    /// Create an engine with the stock loot tables.
    #[must_use]
    pub fn new(store: GuildStore, gamification: GamificationEngine) -> Self {
        Self::with_tables(store, gamification, LootTables::default())
    }

    /// Create an engine with custom loot tables.
    #[must_use]
    pub fn with_tables(
        store: GuildStore,
        gamification: GamificationEngine,
        tables: LootTables,
    ) -> Self {
        Self {
            store,
            gamification,
            tables: std::sync::Arc::new(tables),
        }
    }

    /// Weighted rarity draw. Uniform over the weight sum, compared against
    /// a running cumulative threshold in table order.
    #[must_use]
    pub fn roll_rarity(&self) -> Rarity {
        let total: u32 = self.tables.weights.iter().map(|(_, w)| w).sum();
        let roll = rand::thread_rng().gen_range(1..=total);
        let mut cumulative = 0;
        for (rarity, weight) in &self.tables.weights {
            cumulative += weight;
            if roll <= cumulative {
                return *rarity;
            }
        }
        Rarity::Common
    }

    /// Roll a rarity and persist an unopened crate for the adventurer.
    pub async fn award_crate(&self, adventurer_id: i64, source: &str) -> Result<CrateAward> {
        if self.store.get_adventurer(adventurer_id).await?.is_none() {
            return Err(Error::NotFound(format!(
                "adventurer {adventurer_id} not found"
            )));
        }
        let rarity = self.roll_rarity();
        let crate_id = self.store.create_crate(adventurer_id, rarity, source).await?;
        info!(adventurer_id, crate_id, rarity = %rarity, source, "loot crate awarded");
        Ok(CrateAward { crate_id, rarity })
    }

    /// Open a crate: generate contents, grant the XP, persist. One-time.
    pub async fn open_crate(&self, crate_id: i64, adventurer_id: i64) -> Result<CrateContents> {
        let crate_row = self
            .store
            .get_crate(crate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("crate {crate_id} not found")))?;

        if crate_row.adventurer_id != adventurer_id {
            return Err(Error::Forbidden(
                "this crate does not belong to you".into(),
            ));
        }
        if crate_row.status == CrateStatus::Opened {
            return Err(Error::InvalidState("crate already opened".into()));
        }

        let contents = self.generate_contents(crate_row.rarity);

        let _guard = self.gamification.lock_adventurer(adventurer_id).await;
        let mut tx = self.store.begin().await?;

        if contents.xp > 0 {
            self.gamification
                .award_xp_tx(
                    &mut tx,
                    adventurer_id,
                    contents.xp,
                    XpSource::Crate,
                    &format!("Loot Crate #{crate_id}"),
                )
                .await?;
        }

        // The status guard catches a racing second open; the grant above
        // rolls back with the dropped transaction
        if !self.store.open_crate_tx(&mut tx, crate_id, &contents).await? {
            return Err(Error::InvalidState("crate already opened".into()));
        }

        tx.commit().await.map_err(guildhall_store::Error::from)?;
        info!(adventurer_id, crate_id, xp = contents.xp, "loot crate opened");
        Ok(contents)
    }

    /// Public drop-rate table, one row per rarity.
    #[must_use]
    pub fn preview(&self) -> Vec<RarityPreview> {
        self.tables
            .weights
            .iter()
            .map(|(rarity, weight)| RarityPreview {
                rarity: *rarity,
                weight: *weight,
                xp_range: self.tables.xp_range(*rarity),
                badge_chance_pct: (!self.tables.badge_pool(*rarity).is_empty())
                    .then_some(self.tables.badge_chance_pct),
                title_chance_pct: self.tables.title_chance_pct,
            })
            .collect()
    }

    fn generate_contents(&self, rarity: Rarity) -> CrateContents {
        let mut rng = rand::thread_rng();
        let (lo, hi) = self.tables.xp_range(rarity);
        let xp = rng.gen_range(lo..=hi);

        let badge_pool = self.tables.badge_pool(rarity);
        let badge = if !badge_pool.is_empty()
            && rng.gen_range(1..=100) <= self.tables.badge_chance_pct
        {
            badge_pool.choose(&mut rng).cloned()
        } else {
            None
        };

        let title_pool = self.tables.title_pool(rarity);
        let title = if !title_pool.is_empty()
            && rng.gen_range(1..=100) <= self.tables.title_chance_pct
        {
            title_pool.choose(&mut rng).cloned()
        } else {
            None
        };

        debug!(rarity = %rarity, xp, "crate contents generated");
        CrateContents { xp, badge, title }
    }
}
