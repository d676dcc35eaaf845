//! Core data types for the progression platform.
//!
//! Every record here maps to one table owned by the [`GuildStore`](crate::GuildStore).
//! Status fields are typed enums persisted as their string form, so illegal
//! values cannot circulate inside the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Ranks ───────────────────────────────────────────────────────────

/// Adventurer rank tier, ordered lowest to highest.
///
/// The derived `Ord` follows declaration order, so rank gating is a plain
/// comparison (`current >= required`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    /// Starting tier, no requirements
    Iron,
    /// 3 completed quests and 150 XP
    Silver,
    /// 10 completed quests and 500 XP
    Gold,
    /// 25 completed quests and 1500 XP
    Jade,
    /// 50 completed quests and 5000 XP
    Diamond,
}

impl Rank {
    /// All ranks in ascending order.
    pub const ALL: [Rank; 5] = [
        Rank::Iron,
        Rank::Silver,
        Rank::Gold,
        Rank::Jade,
        Rank::Diamond,
    ];

    /// String form as persisted.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iron => "Iron",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Jade => "Jade",
            Self::Diamond => "Diamond",
        }
    }

    /// Zero-based position in the rank ladder.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// The next rank up, or `None` at `Diamond`.
    #[must_use]
    pub fn next(&self) -> Option<Rank> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// Parse from string, defaulting to `Iron` for unknown or missing values.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "Silver" => Self::Silver,
            "Gold" => Self::Gold,
            "Jade" => Self::Jade,
            "Diamond" => Self::Diamond,
            _ => Self::Iron,
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Adventurers ─────────────────────────────────────────────────────

/// A gamification profile for one contributor.
///
/// `xp_total`, `level` and `rank` are only ever raised by the engine;
/// deletion is an external account-management concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adventurer {
    /// Row ID
    pub id: i64,
    /// GitHub username (unique)
    pub github_username: String,
    /// Display class (free-form, defaults to `"hatchling"`)
    pub class: String,
    /// Cached running XP total
    pub xp_total: i64,
    /// Level derived from `xp_total`
    pub level: i32,
    /// Current rank tier
    pub rank: Rank,
    /// Title the adventurer chose to display, if any
    pub equipped_title: Option<String>,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
    /// When the profile was last updated
    pub updated_at: DateTime<Utc>,
}

// ── XP ledger ───────────────────────────────────────────────────────

/// Where an XP grant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XpSource {
    /// Completed quest reward
    Quest,
    /// Peer-review bonus
    Review,
    /// Loot crate contents
    Crate,
}

impl XpSource {
    /// String form as persisted.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quest => "quest",
            Self::Review => "review",
            Self::Crate => "crate",
        }
    }
}

impl std::fmt::Display for XpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for XpSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quest" => Ok(Self::Quest),
            "review" => Ok(Self::Review),
            "crate" => Ok(Self::Crate),
            _ => Err(format!("unknown xp source: {s}")),
        }
    }
}

/// One append-only XP ledger entry. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpLedgerEntry {
    /// Row ID
    pub id: i64,
    /// Adventurer credited (or debited)
    pub adventurer_id: i64,
    /// Signed amount
    pub amount: i64,
    /// Grant source
    pub source: XpSource,
    /// Free-text reference (quest ref, crate label, …)
    pub source_ref: String,
    /// When the grant was recorded
    pub created_at: DateTime<Utc>,
}

/// A badge earned by an adventurer. Unique per (adventurer, slug).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    /// Owning adventurer
    pub adventurer_id: i64,
    /// Stable identifier (e.g. `"level-5"`)
    pub slug: String,
    /// Display name (e.g. `"High Five"`)
    pub name: String,
    /// When the badge was earned
    pub earned_at: DateTime<Utc>,
}

// ── Quest acceptances ───────────────────────────────────────────────

/// State of one adventurer's engagement with one quest reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    /// Accepted, work in progress
    Accepted,
    /// Proof submitted, awaiting review
    Submitted,
    /// Approved and rewarded
    Completed,
    /// Rejected by a reviewer; may be re-accepted
    Rejected,
}

impl QuestStatus {
    /// String form as persisted.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Submitted => "submitted",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    /// Whether this status ends the current attempt.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

impl std::fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "submitted" => Ok(Self::Submitted),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("unknown quest status: {s}")),
        }
    }
}

/// One adventurer's attempt at one quest reference.
///
/// Unique per (adventurer, quest_ref); absence of a row means not started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestAcceptance {
    /// Row ID
    pub id: i64,
    /// Adventurer working the quest
    pub adventurer_id: i64,
    /// Opaque quest key (external catalog owns the mapping)
    pub quest_ref: String,
    /// Current lifecycle state
    pub status: QuestStatus,
    /// When the quest was (last) accepted
    pub accepted_at: DateTime<Utc>,
    /// When proof was submitted, if it was
    pub submitted_at: Option<DateTime<Utc>>,
    /// Set iff status is `completed`
    pub completed_at: Option<DateTime<Utc>>,
    /// Reviewer who resolved the submission, if known
    pub reviewer_id: Option<i64>,
    /// Review notes / submission proof reference
    pub review_notes: Option<String>,
}

// ── Bosses ──────────────────────────────────────────────────────────

/// Boss lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BossStatus {
    /// Takes damage from completed quests
    Active,
    /// Temporarily shielded; damage is ignored
    Stabilizing,
    /// HP reached zero; never leaves this state
    Defeated,
}

impl BossStatus {
    /// String form as persisted.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Stabilizing => "stabilizing",
            Self::Defeated => "defeated",
        }
    }
}

impl std::fmt::Display for BossStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BossStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "stabilizing" => Ok(Self::Stabilizing),
            "defeated" => Ok(Self::Defeated),
            _ => Err(format!("unknown boss status: {s}")),
        }
    }
}

/// A project health bar damaged by completed quest XP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    /// Row ID
    pub id: i64,
    /// Owning project, or `None` for a global boss
    pub project_id: Option<i64>,
    /// Display name
    pub name: String,
    /// Full health
    pub hp_total: i64,
    /// Remaining health, clamped at 0
    pub hp_current: i64,
    /// Lifecycle state
    pub status: BossStatus,
    /// When the boss was spawned
    pub created_at: DateTime<Utc>,
    /// When HP reached zero, if it did
    pub defeated_at: Option<DateTime<Utc>>,
}

impl Boss {
    /// Apply damage, clamping HP at zero. Reaching zero defeats the boss.
    pub fn take_damage(&mut self, damage: i64) {
        self.hp_current = (self.hp_current - damage).max(0);
        if self.hp_current == 0 {
            self.status = BossStatus::Defeated;
            self.defeated_at = Some(Utc::now());
        }
    }
}

// ── Loot crates ─────────────────────────────────────────────────────

/// Crate rarity tier, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    /// 50% weight
    Common,
    /// 30% weight
    Uncommon,
    /// 13% weight
    Rare,
    /// 5% weight
    Epic,
    /// 2% weight
    Legendary,
}

impl Rarity {
    /// All rarities in roll order.
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    /// String form as persisted.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }

    /// Parse from string, defaulting to `Common` for unknown values.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "uncommon" => Self::Uncommon,
            "rare" => Self::Rare,
            "epic" => Self::Epic,
            "legendary" => Self::Legendary,
            _ => Self::Common,
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a crate has been opened yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrateStatus {
    /// Awarded but not yet opened
    Unopened,
    /// Opened; contents are fixed
    Opened,
}

impl CrateStatus {
    /// String form as persisted.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unopened => "unopened",
            Self::Opened => "opened",
        }
    }
}

impl std::str::FromStr for CrateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unopened" => Ok(Self::Unopened),
            "opened" => Ok(Self::Opened),
            _ => Err(format!("unknown crate status: {s}")),
        }
    }
}

/// A badge reference inside crate contents (display only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeRef {
    /// Badge slug
    pub slug: String,
    /// Badge display name
    pub name: String,
}

/// What a crate yielded when opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrateContents {
    /// XP granted through the gamification engine
    pub xp: i64,
    /// Cosmetic badge drop, if rolled
    pub badge: Option<BadgeRef>,
    /// Title drop, if rolled
    pub title: Option<String>,
}

/// A randomized reward container owned by one adventurer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootCrate {
    /// Row ID
    pub id: i64,
    /// Owning adventurer
    pub adventurer_id: i64,
    /// Rarity rolled at award time
    pub rarity: Rarity,
    /// What event awarded the crate (free text)
    pub source: String,
    /// Open state, transitions exactly once
    pub status: CrateStatus,
    /// Generated contents; `None` until opened
    pub contents: Option<CrateContents>,
    /// When the crate was awarded
    pub created_at: DateTime<Utc>,
    /// When the crate was opened, if it was
    pub opened_at: Option<DateTime<Utc>>,
}
