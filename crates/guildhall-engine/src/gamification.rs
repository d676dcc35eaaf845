//! Gamification engine — XP grants, leveling and badge unlocks.
//!
//! Every grant lands as one transaction: the adventurer's cached total and
//! level, the append-only ledger entry, and any newly unlocked badges.
//! Grants for the same adventurer serialize on a per-adventurer lock so
//! concurrent awards sum instead of losing updates.

use guildhall_store::{GuildStore, StoreTx, XpSource};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{Error, Result};

/// Level derived from a running XP total: `floor(1 + sqrt(xp / 100))`.
///
/// Level 1 starts at 0 XP, level 2 at 100, level 3 at 400, and so on.
#[must_use]
pub fn level_for_xp(xp_total: i64) -> i32 {
    let xp = xp_total.max(0) as f64;
    (1.0 + (xp / 100.0).sqrt()).floor() as i32
}

/// A badge unlock rule: all present thresholds must hold.
///
/// Rules are additive data, evaluated independently on every grant.
#[derive(Debug, Clone)]
pub struct BadgeRule {
    /// Stable badge identifier
    pub slug: String,
    /// Display name granted with the badge
    pub name: String,
    /// Minimum level, if the rule is level-gated
    pub min_level: Option<i32>,
    /// Minimum XP total, if the rule is XP-gated
    pub min_xp: Option<i64>,
}

impl BadgeRule {
    /// Whether the rule matches the post-grant (xp, level) pair.
    #[must_use]
    pub fn matches(&self, xp_total: i64, level: i32) -> bool {
        if self.min_level.is_none() && self.min_xp.is_none() {
            return false;
        }
        self.min_level.is_none_or(|l| level >= l) && self.min_xp.is_none_or(|x| xp_total >= x)
    }

    /// The stock rule set: "High Five" at level 5, "Kilo-XP" at 1000 XP.
    #[must_use]
    pub fn default_rules() -> Vec<BadgeRule> {
        vec![
            BadgeRule {
                slug: "level-5".into(),
                name: "High Five".into(),
                min_level: Some(5),
                min_xp: None,
            },
            BadgeRule {
                slug: "xp-1k".into(),
                name: "Kilo-XP".into(),
                min_level: None,
                min_xp: Some(1000),
            },
        ]
    }
}

/// Summary of one XP grant, surfaced to the notification layer.
#[derive(Debug, Clone, Serialize)]
pub struct XpAward {
    /// Total before the grant
    pub old_xp: i64,
    /// Total after the grant
    pub new_xp: i64,
    /// Level before the grant
    pub old_level: i32,
    /// Level after the grant
    pub new_level: i32,
    /// Whether the level increased
    pub leveled_up: bool,
    /// Display names of badges newly unlocked by this grant
    pub badges_earned: Vec<String>,
}

/// Per-adventurer async locks, so XP writes for one adventurer serialize
/// while different adventurers proceed in parallel.
#[derive(Clone, Default)]
struct AdventurerLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl AdventurerLocks {
    async fn acquire(&self, adventurer_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(adventurer_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// XP ledger and leveling engine.
#[derive(Clone)]
pub struct GamificationEngine {
    store: GuildStore,
    badge_rules: Arc<Vec<BadgeRule>>,
    locks: AdventurerLocks,
}

impl GamificationEngine {
    /// Create an engine with the stock badge rules.
    #[must_use]
    pub fn new(store: GuildStore) -> Self {
        Self::with_badge_rules(store, BadgeRule::default_rules())
    }

    /// Create an engine with a custom badge rule table.
    #[must_use]
    pub fn with_badge_rules(store: GuildStore, rules: Vec<BadgeRule>) -> Self {
        Self {
            store,
            badge_rules: Arc::new(rules),
            locks: AdventurerLocks::default(),
        }
    }

    /// Hold the grant lock for an adventurer. Callers composing a grant
    /// into their own transaction take this before `begin()`.
    pub(crate) async fn lock_adventurer(&self, adventurer_id: i64) -> OwnedMutexGuard<()> {
        self.locks.acquire(adventurer_id).await
    }

    /// Grant XP and persist the outcome in one transaction.
    ///
    /// `amount` is taken as supplied; a negative grant can lower the total
    /// (clamped at 0) but never the level.
    pub async fn award_xp(
        &self,
        adventurer_id: i64,
        amount: i64,
        source: XpSource,
        source_ref: &str,
    ) -> Result<XpAward> {
        let _guard = self.lock_adventurer(adventurer_id).await;
        let mut tx = self.store.begin().await?;
        let award = self
            .award_xp_tx(&mut tx, adventurer_id, amount, source, source_ref)
            .await?;
        tx.commit().await.map_err(guildhall_store::Error::from)?;
        Ok(award)
    }

    /// Grant XP inside an open transaction. The caller holds the
    /// adventurer's grant lock and commits.
    pub(crate) async fn award_xp_tx(
        &self,
        tx: &mut StoreTx,
        adventurer_id: i64,
        amount: i64,
        source: XpSource,
        source_ref: &str,
    ) -> Result<XpAward> {
        let adventurer = self
            .store
            .get_adventurer_tx(tx, adventurer_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("adventurer {adventurer_id} not found")))?;

        let old_xp = adventurer.xp_total;
        let old_level = adventurer.level;
        let new_xp = (old_xp + amount).max(0);
        // Levels only ever rise, even when a penalty lowers the total
        let new_level = level_for_xp(new_xp).max(old_level);

        self.store
            .update_xp_and_level_tx(tx, adventurer_id, new_xp, new_level)
            .await?;
        self.store
            .append_ledger_tx(tx, adventurer_id, amount, source, source_ref)
            .await?;

        let badges_earned = self.unlock_badges_tx(tx, adventurer_id, new_xp, new_level).await?;

        debug!(
            adventurer_id,
            amount,
            new_xp,
            new_level,
            source = %source,
            "XP granted"
        );

        Ok(XpAward {
            old_xp,
            new_xp,
            old_level,
            new_level,
            leveled_up: new_level > old_level,
            badges_earned,
        })
    }

    /// Award every rule that newly matches. Already-held badges are skipped.
    async fn unlock_badges_tx(
        &self,
        tx: &mut StoreTx,
        adventurer_id: i64,
        xp_total: i64,
        level: i32,
    ) -> Result<Vec<String>> {
        let mut earned = Vec::new();
        for rule in self.badge_rules.iter() {
            if !rule.matches(xp_total, level) {
                continue;
            }
            if self.store.has_badge_tx(tx, adventurer_id, &rule.slug).await? {
                continue;
            }
            self.store
                .award_badge_tx(tx, adventurer_id, &rule.slug, &rule.name)
                .await?;
            earned.push(rule.name.clone());
        }
        Ok(earned)
    }
}
