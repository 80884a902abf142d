//! Repository traits
//!
//! Every record the ledger touches is reached through one of these traits so
//! that settlement logic never depends on a concrete backend. Methods are async
//! to admit database-backed implementations; [`crate::MemoryStore`] implements
//! all of them in process.

use crate::error::StoreError;
use async_trait::async_trait;
use taskpay_core::{
    Campaign, CampaignId, CreditTransaction, Notification, Redemption, RedemptionId, Referral,
    Submission, SubmissionId, Task, TaskId, User, UserId,
};

/// Result of claiming one completion from a sponsored campaign
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignClaim {
    /// Slot taken; carries the campaign after the claim
    Claimed(Campaign),
    /// Campaign inactive or out of budget
    Exhausted,
    /// No such campaign
    NotFound,
}

/// User records
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user
    ///
    /// # Errors
    /// `StoreError::Conflict` if the id or referral code is taken
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;

    /// Overwrite an existing user
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
}

/// Task definitions
#[async_trait]
pub trait TaskCatalog: Send + Sync {
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    async fn insert_task(&self, task: Task) -> Result<(), StoreError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;
}

/// Sponsored campaigns
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    async fn get_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, StoreError>;

    async fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError>;

    /// Atomically take one completion slot
    async fn claim_completion(&self, id: &CampaignId) -> Result<CampaignClaim, StoreError>;
}

/// Referral links
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    async fn insert_referral(&self, referral: Referral) -> Result<(), StoreError>;

    /// Referrals owned by `referrer`, in creation order
    async fn referrals_by(&self, referrer: &UserId) -> Result<Vec<Referral>, StoreError>;

    async fn save_referral(&self, referral: &Referral) -> Result<(), StoreError>;
}

/// Append-only credit ledger
#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn append(&self, tx: CreditTransaction) -> Result<(), StoreError>;

    /// Entries for `user`, oldest first
    async fn transactions_for(&self, user: &UserId) -> Result<Vec<CreditTransaction>, StoreError>;
}

/// Settled `(user, task)` pairs
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Record a completion; `false` if it was already recorded
    async fn record_completion(&self, user: &UserId, task: &TaskId) -> Result<bool, StoreError>;

    async fn has_completed(&self, user: &UserId, task: &TaskId) -> Result<bool, StoreError>;
}

/// Proof submissions awaiting review
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn insert_submission(&self, submission: Submission) -> Result<(), StoreError>;

    async fn get_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError>;

    async fn save_submission(&self, submission: &Submission) -> Result<(), StoreError>;

    /// Pending submissions, oldest first
    async fn pending_submissions(&self) -> Result<Vec<Submission>, StoreError>;

    /// Pending submission of `task` by `user`, if any
    async fn pending_for(&self, user: &UserId, task: &TaskId) -> Result<Option<Submission>, StoreError>;
}

/// Redemption requests
#[async_trait]
pub trait RedemptionRepository: Send + Sync {
    async fn insert_redemption(&self, redemption: Redemption) -> Result<(), StoreError>;

    async fn get_redemption(&self, id: &RedemptionId) -> Result<Option<Redemption>, StoreError>;

    async fn save_redemption(&self, redemption: &Redemption) -> Result<(), StoreError>;

    /// Requests by `user`, oldest first
    async fn redemptions_for(&self, user: &UserId) -> Result<Vec<Redemption>, StoreError>;
}

/// User notifications
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn push_notification(&self, notification: Notification) -> Result<(), StoreError>;

    async fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, StoreError>;
}

/// Everything the ledger needs from a backend
pub trait Store:
    UserRepository
    + TaskCatalog
    + CampaignRepository
    + ReferralRepository
    + TransactionLog
    + CompletionRepository
    + SubmissionRepository
    + RedemptionRepository
    + NotificationRepository
{
}

impl<T> Store for T where
    T: UserRepository
        + TaskCatalog
        + CampaignRepository
        + ReferralRepository
        + TransactionLog
        + CompletionRepository
        + SubmissionRepository
        + RedemptionRepository
        + NotificationRepository
{
}
