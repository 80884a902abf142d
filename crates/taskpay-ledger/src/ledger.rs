//! Reward ledger service
//!
//! Loads records from a [`Store`], applies the pure rules of `taskpay-core`
//! and writes the results back. Each operation holds the locks of every user
//! whose balance it may change, so concurrent calls for the same user are
//! serialized and cannot lose updates.

use crate::locks::{UserGuards, UserLocks};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskpay_core::redemption::{self, Redemption, RedemptionRequest, RedemptionStatus};
use taskpay_core::{
    charge_generation, settle_completion, Balances, Campaign, CompletionStatus, CreditTransaction,
    GenerationKind, LedgerConfig, LedgerError, Notification, NotificationKind, RedemptionId,
    Referral, ReferrerContext, SettlementOutcome, Submission, SubmissionId, SubmissionStatus, Task,
    TaskId, User, UserId,
};
use taskpay_store::{
    CampaignClaim, CampaignRepository, CompletionRepository, NotificationRepository,
    RedemptionRepository, ReferralRepository, Store, SubmissionRepository, TaskCatalog,
    TransactionLog, UserRepository,
};

/// Result of resolving a redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionOutcome {
    pub redemption: Redemption,
    /// Owner's balances after any refund
    pub balances: Balances,
    pub notification: Notification,
}

/// The reward ledger
#[derive(Debug)]
pub struct RewardLedger<S> {
    store: Arc<S>,
    config: LedgerConfig,
    locks: UserLocks,
}

impl<S: Store> RewardLedger<S> {
    /// Create ledger over `store`
    ///
    /// # Errors
    /// `LedgerError::Config` if `config` holds a negative amount
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            locks: UserLocks::new(),
        })
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Add a task definition
    ///
    /// # Errors
    /// - `LedgerError::CampaignNotFound` if a sponsored task names an unknown campaign
    /// - `LedgerError::Storage` if the id is taken
    pub async fn add_task(&self, task: Task) -> Result<(), LedgerError> {
        if let Some(campaign) = &task.campaign {
            if self.store.get_campaign(campaign).await?.is_none() {
                return Err(LedgerError::CampaignNotFound(campaign.clone()));
            }
        }
        tracing::debug!("Adding task {} ({} {})", task.id, task.reward_amount, task.reward_type);
        self.store.insert_task(task).await?;
        Ok(())
    }

    /// Add a sponsored campaign
    ///
    /// # Errors
    /// `LedgerError::Storage` if the id is taken
    pub async fn add_campaign(&self, campaign: Campaign) -> Result<(), LedgerError> {
        tracing::debug!("Adding campaign {} for {}", campaign.id, campaign.advertiser);
        self.store.insert_campaign(campaign).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Signup
    // ------------------------------------------------------------------

    /// Register a new user, optionally through a referral code
    ///
    /// # Errors
    /// - `LedgerError::UnknownReferralCode` if `referral_code` matches no user
    pub async fn register_user(
        &self,
        name: &str,
        referral_code: Option<&str>,
    ) -> Result<User, LedgerError> {
        let referrer = match referral_code {
            Some(code) => Some(
                self.store
                    .find_by_referral_code(code)
                    .await?
                    .ok_or_else(|| LedgerError::UnknownReferralCode(code.to_string()))?,
            ),
            None => None,
        };

        let mut user = User::new(UserId::new(), name);
        user.credits = self.config.signup_bonus;
        user.referred_by = referrer.as_ref().map(|r| r.id.clone());

        let _guards = self.locks.acquire(referrer.as_ref().map(|r| &r.id)).await;

        self.store.insert_user(user.clone()).await?;
        if self.config.signup_bonus > 0 {
            let tx = CreditTransaction::new(user.id.clone(), "Signup bonus", self.config.signup_bonus);
            self.store.append(tx).await?;
        }

        if let Some(referrer) = referrer {
            // Re-read under the lock; the copy found by code may be stale.
            let mut referrer = self.require_user(&referrer.id).await?;
            referrer.referral_stats.count += 1;

            let bonus = self.config.referral_rewards.signup;
            if bonus > 0 {
                referrer.credits = referrer.credits.saturating_add(bonus);
                referrer.referral_stats.credits_earned =
                    referrer.referral_stats.credits_earned.saturating_add(bonus);
                let tx = CreditTransaction::new(
                    referrer.id.clone(),
                    format!("Referral signup: {}", user.name),
                    bonus,
                );
                self.store.append(tx).await?;
            }

            self.store.save_user(&referrer).await?;
            self.store
                .insert_referral(Referral::new(referrer.id.clone(), user.id.clone()))
                .await?;
            tracing::info!("User {} registered, referred by {}", user.id, referrer.id);
        } else {
            tracing::info!("User {} registered", user.id);
        }

        Ok(user)
    }

    // ------------------------------------------------------------------
    // Task completion
    // ------------------------------------------------------------------

    /// Complete a task for a user.
    ///
    /// `Pending` queues a proof submission for review and returns `None`.
    /// `Completed` settles the reward immediately; tasks that require proof
    /// only settle through [`Self::review_submission`].
    ///
    /// # Errors
    /// - `LedgerError::UserNotFound` / `LedgerError::TaskNotFound`
    /// - `LedgerError::ProofRequired` when settling a proof task directly
    /// - `LedgerError::AlreadyCompleted` for a non-repeatable task settled before
    /// - `LedgerError::AlreadySubmitted` for a second pending submission
    /// - `LedgerError::CampaignNotFound` / `LedgerError::CampaignExhausted` for sponsored tasks
    pub async fn complete_task(
        &self,
        user_id: &UserId,
        task_id: &TaskId,
        status: CompletionStatus,
    ) -> Result<Option<SettlementOutcome>, LedgerError> {
        match status {
            CompletionStatus::Pending => {
                self.submit_for_review(user_id, task_id).await?;
                Ok(None)
            }
            CompletionStatus::Completed => {
                if self.require_task(task_id).await?.requires_proof {
                    return Err(LedgerError::ProofRequired(task_id.clone()));
                }
                let _guards = self.lock_for_settlement(user_id).await?;
                self.settle_locked(user_id, task_id).await.map(Some)
            }
        }
    }

    /// Queue proof of completion for admin review, returning the submission
    ///
    /// # Errors
    /// - `LedgerError::UserNotFound` / `LedgerError::TaskNotFound`
    /// - `LedgerError::AlreadyCompleted` for a non-repeatable task settled before
    /// - `LedgerError::AlreadySubmitted` if one is already pending for a non-repeatable task
    pub async fn submit_for_review(
        &self,
        user_id: &UserId,
        task_id: &TaskId,
    ) -> Result<Submission, LedgerError> {
        let _guards = self.locks.acquire([user_id]).await;
        let user = self.require_user(user_id).await?;
        let task = self.require_task(task_id).await?;
        if !task.repeatable {
            if self.store.has_completed(&user.id, &task.id).await? {
                return Err(LedgerError::AlreadyCompleted {
                    user: user.id,
                    task: task.id,
                });
            }
            if self.store.pending_for(&user.id, &task.id).await?.is_some() {
                return Err(LedgerError::AlreadySubmitted {
                    user: user.id,
                    task: task.id,
                });
            }
        }

        let submission = Submission::new(user.id, task.id);
        tracing::info!(
            "Submission {} queued for review: user {} task {}",
            submission.id,
            submission.user_id,
            submission.task_id
        );
        self.store.insert_submission(submission.clone()).await?;
        Ok(submission)
    }

    /// Approve or reject a pending proof submission.
    ///
    /// Approval settles the task and returns the outcome; rejection notifies
    /// the user and returns `None`.
    ///
    /// # Errors
    /// - `LedgerError::SubmissionNotFound`
    /// - `LedgerError::InvalidTransition` if the submission was already reviewed
    /// - any settlement error on approval, leaving the submission pending
    pub async fn review_submission(
        &self,
        submission_id: &SubmissionId,
        approve: bool,
    ) -> Result<Option<SettlementOutcome>, LedgerError> {
        let owner = self.require_submission(submission_id).await?.user_id;
        let _guards = self.lock_for_settlement(&owner).await?;

        let mut submission = self.require_submission(submission_id).await?;
        let target = if approve {
            SubmissionStatus::Approved
        } else {
            SubmissionStatus::Rejected
        };
        if submission.status != SubmissionStatus::Pending {
            return Err(LedgerError::invalid_transition(submission.status, target));
        }

        let outcome = if approve {
            Some(self.settle_locked(&submission.user_id, &submission.task_id).await?)
        } else {
            let task = self.store.get_task(&submission.task_id).await?;
            let title = task.map_or_else(|| submission.task_id.to_string(), |t| t.title);
            self.store
                .push_notification(Notification::new(
                    submission.user_id.clone(),
                    NotificationKind::Warning,
                    format!("Your submission for \"{title}\" was rejected"),
                ))
                .await?;
            None
        };

        submission.status = target;
        self.store.save_submission(&submission).await?;
        tracing::info!("Submission {} reviewed: {:?}", submission.id, target);
        Ok(outcome)
    }

    /// Lock the user and, if they were referred, their referrer
    async fn lock_for_settlement(&self, user_id: &UserId) -> Result<UserGuards, LedgerError> {
        let user = self.require_user(user_id).await?;
        let ids = std::iter::once(&user.id).chain(user.referred_by.as_ref());
        Ok(self.locks.acquire(ids).await)
    }

    /// Settle a completed task. Caller holds the user's and referrer's locks.
    async fn settle_locked(&self, user_id: &UserId, task_id: &TaskId) -> Result<SettlementOutcome, LedgerError> {
        let user = self.require_user(user_id).await?;
        let task = self.require_task(task_id).await?;

        if !task.repeatable && self.store.has_completed(&user.id, &task.id).await? {
            return Err(LedgerError::AlreadyCompleted {
                user: user.id,
                task: task.id,
            });
        }

        let (referrer, referrals) = self.load_referrer(&user).await?;

        if let Some(campaign) = &task.campaign {
            match self.store.claim_completion(campaign).await? {
                CampaignClaim::Claimed(c) => {
                    tracing::debug!("Campaign {} slot claimed ({}/{})", c.id, c.completions, c.max_completions);
                }
                CampaignClaim::Exhausted => return Err(LedgerError::CampaignExhausted(campaign.clone())),
                CampaignClaim::NotFound => return Err(LedgerError::CampaignNotFound(campaign.clone())),
            }
        }

        let ctx = referrer.as_ref().map(|referrer| ReferrerContext {
            referrer,
            referrals: &referrals,
        });
        let settlement = settle_completion(&user, &task, ctx, &self.config.referral_rewards);
        let outcome = SettlementOutcome::from(&settlement);

        if !task.repeatable {
            self.store.record_completion(&user.id, &task.id).await?;
        }
        self.store.save_user(&settlement.user).await?;
        if let Some(tx) = settlement.transaction {
            self.store.append(tx).await?;
        }
        if let Some(note) = settlement.notification {
            self.store.push_notification(note).await?;
        }

        if let Some(bonus) = settlement.referrer_bonus {
            self.store.save_user(&bonus.referrer).await?;
            let amount = bonus.transaction.amount;
            self.store.append(bonus.transaction).await?;
            for referral in bonus
                .referrals
                .iter()
                .flatten()
                .filter(|r| referrals.iter().any(|old| old.id == r.id && old.status != r.status))
            {
                self.store.save_referral(referral).await?;
            }
            tracing::info!(
                "Referral bonus of {} credits paid to {} for {}",
                amount,
                bonus.referrer.id,
                user.id
            );
        }

        tracing::info!(
            "Task {} settled for {}: +{} {}",
            task.id,
            user.id,
            task.reward_amount,
            task.reward_type
        );
        Ok(outcome)
    }

    /// Referrer eligible for a first-task bonus, with their referrals
    async fn load_referrer(&self, user: &User) -> Result<(Option<User>, Vec<Referral>), LedgerError> {
        let Some(referrer_id) = user.referred_by.as_ref() else {
            return Ok((None, Vec::new()));
        };
        if user.tasks_completed > 0 || referrer_id == &user.id {
            return Ok((None, Vec::new()));
        }

        match self.store.get_user(referrer_id).await? {
            Some(referrer) => {
                let referrals = self.store.referrals_by(&referrer.id).await?;
                Ok((Some(referrer), referrals))
            }
            None => {
                tracing::warn!("Referrer {} of {} not found; skipping referral bonus", referrer_id, user.id);
                Ok((None, Vec::new()))
            }
        }
    }

    // ------------------------------------------------------------------
    // Spending
    // ------------------------------------------------------------------

    /// Charge credits for one generation
    ///
    /// # Errors
    /// - `LedgerError::UserNotFound`
    /// - `LedgerError::InsufficientBalance` if credits are short
    pub async fn spend_credits(
        &self,
        user_id: &UserId,
        kind: GenerationKind,
    ) -> Result<CreditTransaction, LedgerError> {
        let _guards = self.locks.acquire([user_id]).await;
        let user = self.require_user(user_id).await?;

        let (updated, tx) = charge_generation(&user, kind, &self.config.generation_costs)?;
        self.store.save_user(&updated).await?;
        self.store.append(tx.clone()).await?;

        tracing::info!("User {} spent {} credits on {}", user.id, -tx.amount, kind);
        Ok(tx)
    }

    // ------------------------------------------------------------------
    // Redemptions
    // ------------------------------------------------------------------

    /// Request a data or airtime redemption, debiting the balance now
    ///
    /// # Errors
    /// - `LedgerError::UserNotFound`
    /// - `LedgerError::BelowMinimum` / `LedgerError::InsufficientBalance`
    pub async fn request_redemption(
        &self,
        user_id: &UserId,
        request: RedemptionRequest,
        phone_number: &str,
    ) -> Result<Redemption, LedgerError> {
        let _guards = self.locks.acquire([user_id]).await;
        let user = self.require_user(user_id).await?;

        let debited = redemption::debit(&user, &request, &self.config.min_redemption)?;
        let pending = Redemption::new(user.id.clone(), request, phone_number);

        self.store.save_user(&debited).await?;
        self.store.insert_redemption(pending.clone()).await?;

        tracing::info!("Redemption {} requested by {}: {}", pending.id, user.id, request);
        Ok(pending)
    }

    /// Move a pending redemption to `completed` or `rejected`
    ///
    /// # Errors
    /// - `LedgerError::RedemptionNotFound` / `LedgerError::UserNotFound`
    /// - `LedgerError::InvalidTransition` if it is not pending
    pub async fn resolve_redemption(
        &self,
        redemption_id: &RedemptionId,
        target: RedemptionStatus,
    ) -> Result<RedemptionOutcome, LedgerError> {
        let owner = self.require_redemption(redemption_id).await?.user_id;
        let _guards = self.locks.acquire([&owner]).await;

        let pending = self.require_redemption(redemption_id).await?;
        let user = self.require_user(&pending.user_id).await?;
        let resolution = redemption::resolve(&user, &pending, target)?;

        let balances = match &resolution.refunded_user {
            Some(refunded) => {
                self.store.save_user(refunded).await?;
                refunded.balances()
            }
            None => user.balances(),
        };
        self.store.save_redemption(&resolution.redemption).await?;
        self.store.push_notification(resolution.notification.clone()).await?;

        tracing::info!("Redemption {} {:?}", resolution.redemption.id, target);
        Ok(RedemptionOutcome {
            redemption: resolution.redemption,
            balances,
            notification: resolution.notification,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Look up a user
    ///
    /// # Errors
    /// `LedgerError::UserNotFound`
    pub async fn user(&self, user_id: &UserId) -> Result<User, LedgerError> {
        self.require_user(user_id).await
    }

    /// Current balances of a user
    ///
    /// # Errors
    /// `LedgerError::UserNotFound`
    pub async fn balances(&self, user_id: &UserId) -> Result<Balances, LedgerError> {
        Ok(self.require_user(user_id).await?.balances())
    }

    /// Task catalog, ordered by id
    ///
    /// # Errors
    /// `LedgerError::Storage` on backend failure
    pub async fn tasks(&self) -> Result<Vec<Task>, LedgerError> {
        Ok(self.store.list_tasks().await?)
    }

    /// Credit history of a user, oldest first
    ///
    /// # Errors
    /// `LedgerError::Storage` on backend failure
    pub async fn transactions(&self, user_id: &UserId) -> Result<Vec<CreditTransaction>, LedgerError> {
        Ok(self.store.transactions_for(user_id).await?)
    }

    /// Referrals a user has made
    ///
    /// # Errors
    /// `LedgerError::Storage` on backend failure
    pub async fn referrals_of(&self, referrer: &UserId) -> Result<Vec<Referral>, LedgerError> {
        Ok(self.store.referrals_by(referrer).await?)
    }

    /// Notifications addressed to a user
    ///
    /// # Errors
    /// `LedgerError::Storage` on backend failure
    pub async fn notifications(&self, user_id: &UserId) -> Result<Vec<Notification>, LedgerError> {
        Ok(self.store.notifications_for(user_id).await?)
    }

    /// Submissions waiting for review
    ///
    /// # Errors
    /// `LedgerError::Storage` on backend failure
    pub async fn pending_submissions(&self) -> Result<Vec<Submission>, LedgerError> {
        Ok(self.store.pending_submissions().await?)
    }

    /// Redemptions requested by a user
    ///
    /// # Errors
    /// `LedgerError::Storage` on backend failure
    pub async fn redemptions_of(&self, user_id: &UserId) -> Result<Vec<Redemption>, LedgerError> {
        Ok(self.store.redemptions_for(user_id).await?)
    }

    async fn require_user(&self, id: &UserId) -> Result<User, LedgerError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(id.clone()))
    }

    async fn require_task(&self, id: &TaskId) -> Result<Task, LedgerError> {
        self.store
            .get_task(id)
            .await?
            .ok_or_else(|| LedgerError::TaskNotFound(id.clone()))
    }

    async fn require_submission(&self, id: &SubmissionId) -> Result<Submission, LedgerError> {
        self.store
            .get_submission(id)
            .await?
            .ok_or_else(|| LedgerError::SubmissionNotFound(id.clone()))
    }

    async fn require_redemption(&self, id: &RedemptionId) -> Result<Redemption, LedgerError> {
        self.store
            .get_redemption(id)
            .await?
            .ok_or_else(|| LedgerError::RedemptionNotFound(id.clone()))
    }
}
