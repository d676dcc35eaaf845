//! Quest lifecycle — the state machine for one adventurer on one quest.
//!
//! Transitions are an explicit table over `(current status, action)`;
//! anything not in the table is rejected before any write happens. The
//! status write and the owner's XP grant land in one transaction; rank
//! recalculation, reviewer bonus and boss damage run best-effort after
//! commit.

use guildhall_store::{GuildStore, QuestAcceptance, QuestStatus, Rank, XpSource};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::info;

use crate::boss::BossEngine;
use crate::effects::best_effort;
use crate::error::{Error, Result};
use crate::gamification::{GamificationEngine, XpAward};
use crate::rank::{RankChange, RankProgression};

/// Reviewers must hold at least this rank.
pub const REVIEWER_MIN_RANK: Rank = Rank::Silver;

/// Reviewer bonus: 10% of the quest XP, but never less than 5.
#[must_use]
pub fn reviewer_bonus(quest_xp: i64) -> i64 {
    ((quest_xp as f64 * 0.1).round() as i64).max(5)
}

static RE_PR_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https://github\.com/[^/]+/[^/]+/pull/\d+$").unwrap()
});

/// An action applied to a quest acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestAction {
    /// Take on the quest (or reopen it after rejection)
    Accept,
    /// Submit proof of completed work
    Submit,
    /// Approve and reward the work
    Complete,
    /// Send the work back
    Reject,
}

/// The transition table. `None` as input means no acceptance row exists;
/// `None` as output means the transition is illegal.
#[must_use]
pub fn transition(current: Option<QuestStatus>, action: QuestAction) -> Option<QuestStatus> {
    match (current, action) {
        (None, QuestAction::Accept) => Some(QuestStatus::Accepted),
        (Some(QuestStatus::Rejected), QuestAction::Accept) => Some(QuestStatus::Accepted),
        (Some(QuestStatus::Accepted), QuestAction::Submit) => Some(QuestStatus::Submitted),
        (Some(QuestStatus::Submitted), QuestAction::Complete) => Some(QuestStatus::Completed),
        (Some(QuestStatus::Submitted), QuestAction::Reject) => Some(QuestStatus::Rejected),
        _ => None,
    }
}

/// Completion of a submitted quest (admin / self-service path).
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Quest owner
    pub adventurer_id: i64,
    /// Quest reference being completed
    pub quest_ref: String,
    /// XP reward; the grant fires only when positive
    pub xp: i64,
    /// Review notes; empty keeps whatever is already on the row
    pub review_notes: Option<String>,
    /// Resolving reviewer, when the caller maps to an adventurer profile
    pub reviewer_id: Option<i64>,
    /// Project whose boss takes damage, if any
    pub project_id: Option<i64>,
}

/// Peer review of a submitted quest.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    /// Reviewing adventurer
    pub reviewer_id: i64,
    /// Quest owner
    pub adventurer_id: i64,
    /// Quest reference under review
    pub quest_ref: String,
    /// Approve (complete) or reject
    pub approved: bool,
    /// Review notes recorded on the row
    pub review_notes: Option<String>,
    /// XP reward on approval
    pub xp: i64,
    /// Project whose boss takes damage, if any
    pub project_id: Option<i64>,
}

/// What a completion produced, for the notification layer.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    /// Quest reference
    pub quest_ref: String,
    /// Status after the operation
    pub status: QuestStatus,
    /// The owner's XP grant, if one fired
    pub xp_awarded: Option<XpAward>,
    /// Rank recalculation outcome, if it ran
    pub rank: Option<RankChange>,
}

/// What a peer review produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    /// Quest reference
    pub quest_ref: String,
    /// Status after the review
    pub status: QuestStatus,
    /// The owner's XP grant, on approval with positive XP
    pub xp_awarded: Option<XpAward>,
    /// The reviewer's bonus grant, if it landed
    pub reviewer_bonus: Option<XpAward>,
    /// Rank recalculation outcome for the owner, if it ran
    pub rank: Option<RankChange>,
}

/// The quest lifecycle manager.
#[derive(Clone)]
pub struct QuestLifecycle {
    store: GuildStore,
    gamification: GamificationEngine,
    ranks: RankProgression,
    bosses: BossEngine,
}

impl QuestLifecycle {
    /// Wire the lifecycle over its collaborators.
    #[must_use]
    pub fn new(
        store: GuildStore,
        gamification: GamificationEngine,
        ranks: RankProgression,
        bosses: BossEngine,
    ) -> Self {
        Self {
            store,
            gamification,
            ranks,
            bosses,
        }
    }

    /// Accept a quest, enforcing any rank gate.
    ///
    /// Idempotent: an existing row comes back unchanged, except a rejected
    /// one, which reopens with all timestamps and review fields reset.
    pub async fn accept(
        &self,
        adventurer_id: i64,
        quest_ref: &str,
        rank_required: Option<Rank>,
    ) -> Result<QuestAcceptance> {
        if quest_ref.is_empty() {
            return Err(Error::Validation("quest reference is required".into()));
        }
        if self.store.get_adventurer(adventurer_id).await?.is_none() {
            return Err(Error::NotFound(format!(
                "adventurer {adventurer_id} not found"
            )));
        }

        if let Some(required) = rank_required {
            if !self.ranks.meets_requirement(adventurer_id, required).await? {
                let current = self.ranks.rank_of(adventurer_id).await?;
                return Err(Error::Forbidden(format!(
                    "requires rank {required}, your rank is {current}"
                )));
            }
        }

        let existing = self.store.find_acceptance(adventurer_id, quest_ref).await?;
        let next = transition(existing.as_ref().map(|a| a.status), QuestAction::Accept);
        match (existing, next) {
            (Some(rejected), Some(_)) => {
                self.store.reopen_acceptance(rejected.id).await?;
                info!(adventurer_id, quest_ref, "rejected quest reopened");
                self.store
                    .get_acceptance(rejected.id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("acceptance {} not found", rejected.id)))
            }
            (None, _) => {
                let acceptance = self.store.create_acceptance(adventurer_id, quest_ref).await?;
                info!(adventurer_id, quest_ref, "quest accepted");
                Ok(acceptance)
            }
            // Accept on a live row is a no-op returning current state
            (Some(acceptance), None) => Ok(acceptance),
        }
    }

    /// Submit proof for an accepted quest.
    pub async fn submit(
        &self,
        adventurer_id: i64,
        quest_ref: &str,
        pr_url: &str,
    ) -> Result<QuestAcceptance> {
        let acceptance = self
            .store
            .find_acceptance(adventurer_id, quest_ref)
            .await?
            .ok_or_else(|| Error::NotFound("you have not accepted this quest".into()))?;

        if transition(Some(acceptance.status), QuestAction::Submit).is_none() {
            return Err(Error::InvalidState(format!(
                "quest is already in status: {}",
                acceptance.status
            )));
        }

        let pr_url = pr_url.trim();
        if pr_url.is_empty() {
            return Err(Error::Validation("GitHub PR URL is required".into()));
        }
        if !RE_PR_URL.is_match(pr_url) {
            return Err(Error::Validation("invalid GitHub PR URL format".into()));
        }

        self.store
            .mark_submitted(acceptance.id, &format!("PR: {pr_url}"))
            .await?;
        info!(adventurer_id, quest_ref, pr_url, "quest submitted");

        self.store
            .get_acceptance(acceptance.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("acceptance {} not found", acceptance.id)))
    }

    /// Complete a submitted quest and reward the owner.
    ///
    /// The status write and XP grant commit together; rank recalculation
    /// and boss damage follow best-effort.
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionOutcome> {
        let acceptance = self
            .store
            .find_acceptance(request.adventurer_id, &request.quest_ref)
            .await?
            .ok_or_else(|| Error::NotFound("quest acceptance not found".into()))?;

        if transition(Some(acceptance.status), QuestAction::Complete).is_none() {
            return Err(Error::InvalidState(format!(
                "quest must be submitted to complete, current: {}",
                acceptance.status
            )));
        }

        let notes = match request.review_notes.as_deref().map(str::trim) {
            Some(trimmed) if !trimmed.is_empty() => Some(trimmed.to_string()),
            _ => acceptance.review_notes.clone(),
        };

        let xp_awarded = self
            .finish_quest(
                &acceptance,
                request.reviewer_id,
                notes.as_deref(),
                request.xp,
            )
            .await?;
        info!(
            adventurer_id = request.adventurer_id,
            quest_ref = %request.quest_ref,
            xp = request.xp,
            "quest completed"
        );

        let rank = best_effort("rank_recalc", self.ranks.recalculate(request.adventurer_id).await);
        best_effort(
            "boss_damage",
            self.bosses
                .handle_quest_completion(request.project_id, request.xp)
                .await,
        );

        Ok(CompletionOutcome {
            quest_ref: request.quest_ref,
            status: QuestStatus::Completed,
            xp_awarded,
            rank,
        })
    }

    /// Peer-review a submitted quest: approve (completing it) or reject.
    pub async fn review(&self, request: ReviewRequest) -> Result<ReviewOutcome> {
        if self.store.get_adventurer(request.reviewer_id).await?.is_none() {
            return Err(Error::NotFound("reviewer profile not found".into()));
        }
        if !self
            .ranks
            .meets_requirement(request.reviewer_id, REVIEWER_MIN_RANK)
            .await?
        {
            return Err(Error::Forbidden(format!(
                "you must be {REVIEWER_MIN_RANK} rank or higher to review quests"
            )));
        }
        if request.reviewer_id == request.adventurer_id {
            return Err(Error::Forbidden("you cannot review your own quest".into()));
        }

        let acceptance = self
            .store
            .find_acceptance(request.adventurer_id, &request.quest_ref)
            .await?
            .ok_or_else(|| Error::NotFound("quest acceptance not found".into()))?;

        let action = if request.approved {
            QuestAction::Complete
        } else {
            QuestAction::Reject
        };
        if transition(Some(acceptance.status), action).is_none() {
            return Err(Error::InvalidState(format!(
                "quest must be submitted for review, current: {}",
                acceptance.status
            )));
        }

        if !request.approved {
            self.store
                .mark_rejected(
                    acceptance.id,
                    Some(request.reviewer_id),
                    request.review_notes.as_deref(),
                )
                .await?;
            info!(
                reviewer_id = request.reviewer_id,
                quest_ref = %request.quest_ref,
                "quest rejected"
            );
            return Ok(ReviewOutcome {
                quest_ref: request.quest_ref,
                status: QuestStatus::Rejected,
                xp_awarded: None,
                reviewer_bonus: None,
                rank: None,
            });
        }

        let xp_awarded = self
            .finish_quest(
                &acceptance,
                Some(request.reviewer_id),
                request.review_notes.as_deref(),
                request.xp,
            )
            .await?;
        info!(
            reviewer_id = request.reviewer_id,
            quest_ref = %request.quest_ref,
            xp = request.xp,
            "quest approved"
        );

        let mut rank = None;
        let mut bonus = None;
        if request.xp > 0 {
            rank = best_effort(
                "rank_recalc",
                self.ranks.recalculate(request.adventurer_id).await,
            );
            bonus = best_effort(
                "reviewer_bonus",
                self.gamification
                    .award_xp(
                        request.reviewer_id,
                        reviewer_bonus(request.xp),
                        XpSource::Review,
                        &format!("reviewed:{}", request.quest_ref),
                    )
                    .await,
            );
            best_effort(
                "boss_damage",
                self.bosses
                    .handle_quest_completion(request.project_id, request.xp)
                    .await,
            );
        }

        Ok(ReviewOutcome {
            quest_ref: request.quest_ref,
            status: QuestStatus::Completed,
            xp_awarded,
            reviewer_bonus: bonus,
            rank,
        })
    }

    /// The atomic completion core: status write plus owner XP grant in one
    /// transaction, under the owner's grant lock.
    async fn finish_quest(
        &self,
        acceptance: &QuestAcceptance,
        reviewer_id: Option<i64>,
        notes: Option<&str>,
        xp: i64,
    ) -> Result<Option<XpAward>> {
        let _guard = self
            .gamification
            .lock_adventurer(acceptance.adventurer_id)
            .await;
        let mut tx = self.store.begin().await?;

        self.store
            .mark_completed_tx(&mut tx, acceptance.id, reviewer_id, notes)
            .await?;

        let award = if xp > 0 {
            Some(
                self.gamification
                    .award_xp_tx(
                        &mut tx,
                        acceptance.adventurer_id,
                        xp,
                        XpSource::Quest,
                        &acceptance.quest_ref,
                    )
                    .await?,
            )
        } else {
            None
        };

        tx.commit().await.map_err(guildhall_store::Error::from)?;
        Ok(award)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildhall_store::GuildStore;

    struct Fixture {
        store: GuildStore,
        ranks: RankProgression,
        quests: QuestLifecycle,
    }

    async fn fixture() -> Fixture {
        let store = GuildStore::in_memory().await.unwrap();
        let gamification = GamificationEngine::new(store.clone());
        let ranks = RankProgression::new(store.clone());
        let bosses = BossEngine::new(store.clone());
        let quests = QuestLifecycle::new(store.clone(), gamification, ranks.clone(), bosses);
        Fixture {
            store,
            ranks,
            quests,
        }
    }

    async fn silver_reviewer(f: &Fixture, username: &str) -> i64 {
        let adv = f.store.create_adventurer(username, "hatchling").await.unwrap();
        f.store
            .update_rank(adv.id, Rank::Silver)
            .await
            .unwrap();
        adv.id
    }

    const PR: &str = "https://github.com/org/repo/pull/12";

    #[test]
    fn test_transition_table() {
        use QuestAction::*;
        use QuestStatus::*;

        assert_eq!(transition(None, Accept), Some(Accepted));
        assert_eq!(transition(Some(Rejected), Accept), Some(Accepted));
        assert_eq!(transition(Some(Accepted), Submit), Some(Submitted));
        assert_eq!(transition(Some(Submitted), Complete), Some(Completed));
        assert_eq!(transition(Some(Submitted), Reject), Some(Rejected));

        // Everything else is illegal
        assert_eq!(transition(None, Submit), None);
        assert_eq!(transition(None, Complete), None);
        assert_eq!(transition(Some(Submitted), Submit), None);
        assert_eq!(transition(Some(Completed), Complete), None);
        assert_eq!(transition(Some(Completed), Accept), None);
        assert_eq!(transition(Some(Accepted), Complete), None);
        assert_eq!(transition(Some(Accepted), Reject), None);
    }

    #[test]
    fn test_reviewer_bonus_floor() {
        assert_eq!(reviewer_bonus(100), 10);
        assert_eq!(reviewer_bonus(250), 25);
        assert_eq!(reviewer_bonus(30), 5);
        assert_eq!(reviewer_bonus(0), 5);
    }

    #[tokio::test]
    async fn test_accept_is_idempotent() {
        let f = fixture().await;
        let adv = f.store.create_adventurer("octocat", "hatchling").await.unwrap();

        let first = f.quests.accept(adv.id, "quest-1", None).await.unwrap();
        let second = f.quests.accept(adv.id, "quest-1", None).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, QuestStatus::Accepted);
        assert_eq!(
            f.store.acceptances_for_adventurer(adv.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_accept_rank_gate() {
        let f = fixture().await;
        let adv = f.store.create_adventurer("octocat", "hatchling").await.unwrap();

        let err = f
            .quests
            .accept(adv.id, "quest-1", Some(Rank::Silver))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        assert!(err.to_string().contains("Silver"));

        // Meeting the gate allows the accept
        f.store.update_rank(adv.id, Rank::Silver).await.unwrap();
        assert!(f
            .quests
            .accept(adv.id, "quest-1", Some(Rank::Silver))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_accept_unknown_adventurer() {
        let f = fixture().await;
        let err = f.quests.accept(404, "quest-1", None).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_submit_requires_accepted_state() {
        let f = fixture().await;
        let adv = f.store.create_adventurer("octocat", "hatchling").await.unwrap();

        let err = f.quests.submit(adv.id, "quest-1", PR).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");

        f.quests.accept(adv.id, "quest-1", None).await.unwrap();
        let submitted = f.quests.submit(adv.id, "quest-1", PR).await.unwrap();
        assert_eq!(submitted.status, QuestStatus::Submitted);
        assert!(submitted.submitted_at.is_some());
        assert_eq!(submitted.review_notes.as_deref(), Some(&format!("PR: {PR}")[..]));

        // Submitting again is an illegal transition
        let err = f.quests.submit(adv.id, "quest-1", PR).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[tokio::test]
    async fn test_submit_validates_pr_url() {
        let f = fixture().await;
        let adv = f.store.create_adventurer("octocat", "hatchling").await.unwrap();
        f.quests.accept(adv.id, "quest-1", None).await.unwrap();

        for bad in ["", "   ", "https://gitlab.com/org/repo/pull/1", "not a url"] {
            let err = f.quests.submit(adv.id, "quest-1", bad).await.unwrap_err();
            assert_eq!(err.kind(), "validation_error", "url: {bad:?}");
        }
    }

    #[tokio::test]
    async fn test_complete_requires_submitted_state() {
        let f = fixture().await;
        let adv = f.store.create_adventurer("octocat", "hatchling").await.unwrap();
        f.quests.accept(adv.id, "quest-1", None).await.unwrap();

        let err = f
            .quests
            .complete(CompletionRequest {
                adventurer_id: adv.id,
                quest_ref: "quest-1".into(),
                xp: 50,
                review_notes: None,
                reviewer_id: None,
                project_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[tokio::test]
    async fn test_complete_awards_xp_and_recalculates_rank() {
        let f = fixture().await;
        let adv = f.store.create_adventurer("octocat", "hatchling").await.unwrap();
        f.quests.accept(adv.id, "quest-1", None).await.unwrap();
        f.quests.submit(adv.id, "quest-1", PR).await.unwrap();

        let outcome = f
            .quests
            .complete(CompletionRequest {
                adventurer_id: adv.id,
                quest_ref: "quest-1".into(),
                xp: 150,
                review_notes: Some("solid work".into()),
                reviewer_id: None,
                project_id: None,
            })
            .await
            .unwrap();

        assert_eq!(outcome.status, QuestStatus::Completed);
        let award = outcome.xp_awarded.unwrap();
        assert_eq!(award.new_xp, 150);
        assert_eq!(award.new_level, 2);
        assert!(award.leveled_up);
        // 1 completed quest, 150 XP: not yet Silver (needs 3 quests)
        let rank = outcome.rank.unwrap();
        assert!(!rank.promoted);

        let row = f
            .store
            .find_acceptance(adv.id, "quest-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, QuestStatus::Completed);
        assert!(row.completed_at.is_some());
        assert_eq!(row.review_notes.as_deref(), Some("solid work"));
    }

    #[tokio::test]
    async fn test_complete_without_xp_skips_grant() {
        let f = fixture().await;
        let adv = f.store.create_adventurer("octocat", "hatchling").await.unwrap();
        f.quests.accept(adv.id, "quest-1", None).await.unwrap();
        f.quests.submit(adv.id, "quest-1", PR).await.unwrap();

        let outcome = f
            .quests
            .complete(CompletionRequest {
                adventurer_id: adv.id,
                quest_ref: "quest-1".into(),
                xp: 0,
                review_notes: None,
                reviewer_id: None,
                project_id: None,
            })
            .await
            .unwrap();

        assert!(outcome.xp_awarded.is_none());
        assert_eq!(outcome.status, QuestStatus::Completed);
        assert!(f.store.ledger_for_adventurer(adv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_requires_silver_rank() {
        let f = fixture().await;
        let owner = f.store.create_adventurer("octocat", "hatchling").await.unwrap();
        let iron = f.store.create_adventurer("rookie", "hatchling").await.unwrap();
        f.quests.accept(owner.id, "quest-1", None).await.unwrap();
        f.quests.submit(owner.id, "quest-1", PR).await.unwrap();

        let err = f
            .quests
            .review(ReviewRequest {
                reviewer_id: iron.id,
                adventurer_id: owner.id,
                quest_ref: "quest-1".into(),
                approved: true,
                review_notes: None,
                xp: 100,
                project_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[tokio::test]
    async fn test_review_rejects_self_review() {
        let f = fixture().await;
        let owner = silver_reviewer(&f, "octocat").await;
        f.quests.accept(owner, "quest-1", None).await.unwrap();
        f.quests.submit(owner, "quest-1", PR).await.unwrap();

        let err = f
            .quests
            .review(ReviewRequest {
                reviewer_id: owner,
                adventurer_id: owner,
                quest_ref: "quest-1".into(),
                approved: true,
                review_notes: None,
                xp: 100,
                project_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[tokio::test]
    async fn test_review_approval_pays_owner_and_reviewer() {
        let f = fixture().await;
        let owner = f.store.create_adventurer("octocat", "hatchling").await.unwrap();
        let reviewer = silver_reviewer(&f, "maintainer").await;
        f.quests.accept(owner.id, "quest-1", None).await.unwrap();
        f.quests.submit(owner.id, "quest-1", PR).await.unwrap();

        let outcome = f
            .quests
            .review(ReviewRequest {
                reviewer_id: reviewer,
                adventurer_id: owner.id,
                quest_ref: "quest-1".into(),
                approved: true,
                review_notes: Some("nice".into()),
                xp: 200,
                project_id: None,
            })
            .await
            .unwrap();

        assert_eq!(outcome.status, QuestStatus::Completed);
        assert_eq!(outcome.xp_awarded.unwrap().new_xp, 200);
        // 10% of 200
        assert_eq!(outcome.reviewer_bonus.unwrap().new_xp, 20);
        assert_eq!(
            f.store.get_adventurer(reviewer).await.unwrap().unwrap().xp_total,
            20
        );

        let reviewer_ledger = f.store.ledger_for_adventurer(reviewer).await.unwrap();
        assert_eq!(reviewer_ledger.len(), 1);
        assert_eq!(reviewer_ledger[0].amount, 20);
        assert_eq!(reviewer_ledger[0].source, XpSource::Review);
        assert_eq!(reviewer_ledger[0].source_ref, "reviewed:quest-1");

        let row = f
            .store
            .find_acceptance(owner.id, "quest-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.reviewer_id, Some(reviewer));
    }

    #[tokio::test]
    async fn test_review_rejection_and_reacceptance() {
        let f = fixture().await;
        let owner = f.store.create_adventurer("octocat", "hatchling").await.unwrap();
        let reviewer = silver_reviewer(&f, "maintainer").await;
        f.quests.accept(owner.id, "quest-1", None).await.unwrap();
        f.quests.submit(owner.id, "quest-1", PR).await.unwrap();

        let outcome = f
            .quests
            .review(ReviewRequest {
                reviewer_id: reviewer,
                adventurer_id: owner.id,
                quest_ref: "quest-1".into(),
                approved: false,
                review_notes: Some("missing tests".into()),
                xp: 200,
                project_id: None,
            })
            .await
            .unwrap();

        assert_eq!(outcome.status, QuestStatus::Rejected);
        assert!(outcome.xp_awarded.is_none());
        assert!(outcome.reviewer_bonus.is_none());
        // No XP moved on rejection
        assert!(f.store.ledger_for_adventurer(owner.id).await.unwrap().is_empty());

        // Re-accepting reopens the same row with a clean slate
        let reopened = f.quests.accept(owner.id, "quest-1", None).await.unwrap();
        assert_eq!(reopened.status, QuestStatus::Accepted);
        assert!(reopened.submitted_at.is_none());
        assert!(reopened.reviewer_id.is_none());
        assert!(reopened.review_notes.is_none());
        assert_eq!(
            f.store.acceptances_for_adventurer(owner.id).await.unwrap().len(),
            1
        );

        // And the quest can run the full loop again
        f.quests.submit(owner.id, "quest-1", PR).await.unwrap();
    }

    #[tokio::test]
    async fn test_review_requires_submitted_state() {
        let f = fixture().await;
        let owner = f.store.create_adventurer("octocat", "hatchling").await.unwrap();
        let reviewer = silver_reviewer(&f, "maintainer").await;
        f.quests.accept(owner.id, "quest-1", None).await.unwrap();

        let err = f
            .quests
            .review(ReviewRequest {
                reviewer_id: reviewer,
                adventurer_id: owner.id,
                quest_ref: "quest-1".into(),
                approved: true,
                review_notes: None,
                xp: 100,
                project_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[tokio::test]
    async fn test_completion_damages_project_boss() {
        let f = fixture().await;
        let adv = f.store.create_adventurer("octocat", "hatchling").await.unwrap();
        let boss = f.store.create_boss("Legacy Monolith", Some(7), 5000).await.unwrap();
        f.quests.accept(adv.id, "quest-1", None).await.unwrap();
        f.quests.submit(adv.id, "quest-1", PR).await.unwrap();

        f.quests
            .complete(CompletionRequest {
                adventurer_id: adv.id,
                quest_ref: "quest-1".into(),
                xp: 60,
                review_notes: None,
                reviewer_id: None,
                project_id: Some(7),
            })
            .await
            .unwrap();

        let hit = f.store.get_boss(boss.id).await.unwrap().unwrap();
        // 60 XP × 10 damage
        assert_eq!(hit.hp_current, 4400);
    }

    #[tokio::test]
    async fn test_rank_promotion_after_third_quest() {
        let f = fixture().await;
        let adv = f.store.create_adventurer("octocat", "hatchling").await.unwrap();

        for i in 0..3 {
            let quest_ref = format!("quest-{i}");
            f.quests.accept(adv.id, &quest_ref, None).await.unwrap();
            f.quests.submit(adv.id, &quest_ref, PR).await.unwrap();
            let outcome = f
                .quests
                .complete(CompletionRequest {
                    adventurer_id: adv.id,
                    quest_ref,
                    xp: 60,
                    review_notes: None,
                    reviewer_id: None,
                    project_id: None,
                })
                .await
                .unwrap();
            if i == 2 {
                // 3 quests and 180 XP clears the Silver bar
                let rank = outcome.rank.unwrap();
                assert!(rank.promoted);
                assert_eq!(rank.new_rank, Rank::Silver);
            }
        }
        assert_eq!(f.ranks.rank_of(adv.id).await.unwrap(), Rank::Silver);
    }
}
