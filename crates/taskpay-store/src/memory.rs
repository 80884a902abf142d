//! In-memory store
//!
//! Keyed records live in `DashMap`s; append-only logs live behind
//! `parking_lot` locks so their order is the insertion order.

use crate::error::StoreError;
use crate::repository::{
    CampaignClaim, CampaignRepository, CompletionRepository, NotificationRepository,
    RedemptionRepository, ReferralRepository, SubmissionRepository, TaskCatalog, TransactionLog,
    UserRepository,
};
use crate::snapshot::{CompletionRecord, Snapshot};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use taskpay_core::{
    Campaign, CampaignId, CreditTransaction, Notification, Redemption, RedemptionId, Referral,
    Submission, SubmissionId, SubmissionStatus, Task, TaskId, User, UserId,
};

/// Store holding every record in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, User>,
    /// referral code -> owner
    codes: DashMap<String, UserId>,
    tasks: DashMap<TaskId, Task>,
    campaigns: DashMap<CampaignId, Campaign>,
    referrals: RwLock<Vec<Referral>>,
    transactions: Mutex<Vec<CreditTransaction>>,
    completions: DashSet<CompletionRecord>,
    submissions: DashMap<SubmissionId, Submission>,
    redemptions: DashMap<RedemptionId, Redemption>,
    notifications: Mutex<Vec<Notification>>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot
    ///
    /// # Errors
    /// `StoreError::Conflict` if the snapshot repeats a user id or referral code
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let store = Self::new();
        for user in snapshot.users {
            store.insert_user_sync(user)?;
        }
        for task in snapshot.tasks {
            store.tasks.insert(task.id.clone(), task);
        }
        for campaign in snapshot.campaigns {
            store.campaigns.insert(campaign.id.clone(), campaign);
        }
        *store.referrals.write() = snapshot.referrals;
        *store.transactions.lock() = snapshot.transactions;
        for record in snapshot.completions {
            store.completions.insert(record);
        }
        for submission in snapshot.submissions {
            store.submissions.insert(submission.id.clone(), submission);
        }
        for redemption in snapshot.redemptions {
            store.redemptions.insert(redemption.id.clone(), redemption);
        }
        *store.notifications.lock() = snapshot.notifications;
        Ok(store)
    }

    /// Capture every record, keyed collections sorted for stable output
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));

        let mut tasks: Vec<Task> = self.tasks.iter().map(|e| e.value().clone()).collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));

        let mut campaigns: Vec<Campaign> = self.campaigns.iter().map(|e| e.value().clone()).collect();
        campaigns.sort_by(|a, b| a.id.cmp(&b.id));

        let mut completions: Vec<CompletionRecord> = self.completions.iter().map(|r| r.key().clone()).collect();
        completions.sort();

        let mut submissions: Vec<Submission> = self.submissions.iter().map(|e| e.value().clone()).collect();
        submissions.sort_by(|a, b| (a.submitted_at, &a.id).cmp(&(b.submitted_at, &b.id)));

        let mut redemptions: Vec<Redemption> = self.redemptions.iter().map(|e| e.value().clone()).collect();
        redemptions.sort_by(|a, b| (a.requested_at, &a.id).cmp(&(b.requested_at, &b.id)));

        Snapshot {
            users,
            tasks,
            campaigns,
            referrals: self.referrals.read().clone(),
            transactions: self.transactions.lock().clone(),
            completions,
            submissions,
            redemptions,
            notifications: self.notifications.lock().clone(),
        }
    }

    fn insert_user_sync(&self, user: User) -> Result<(), StoreError> {
        if self.codes.contains_key(&user.referral_code) {
            return Err(StoreError::conflict("referral code", &user.referral_code));
        }
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::conflict("user", &user.id)),
            Entry::Vacant(slot) => {
                self.codes.insert(user.referral_code.clone(), user.id.clone());
                slot.insert(user);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>, StoreError> {
        let Some(owner) = self.codes.get(code).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&owner).map(|u| u.value().clone()))
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.insert_user_sync(user)
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[async_trait]
impl TaskCatalog for MemoryStore {
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.get(id).map(|t| t.value().clone()))
    }

    async fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        match self.tasks.entry(task.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::conflict("task", &task.id)),
            Entry::Vacant(slot) => {
                slot.insert(task);
                Ok(())
            }
        }
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.tasks.iter().map(|t| t.value().clone()).collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }
}

#[async_trait]
impl CampaignRepository for MemoryStore {
    async fn get_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, StoreError> {
        Ok(self.campaigns.get(id).map(|c| c.value().clone()))
    }

    async fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError> {
        match self.campaigns.entry(campaign.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::conflict("campaign", &campaign.id)),
            Entry::Vacant(slot) => {
                slot.insert(campaign);
                Ok(())
            }
        }
    }

    async fn claim_completion(&self, id: &CampaignId) -> Result<CampaignClaim, StoreError> {
        let Some(mut campaign) = self.campaigns.get_mut(id) else {
            return Ok(CampaignClaim::NotFound);
        };
        if campaign.remaining() == 0 {
            return Ok(CampaignClaim::Exhausted);
        }
        campaign.completions += 1;
        Ok(CampaignClaim::Claimed(campaign.clone()))
    }
}

#[async_trait]
impl ReferralRepository for MemoryStore {
    async fn insert_referral(&self, referral: Referral) -> Result<(), StoreError> {
        let mut referrals = self.referrals.write();
        if referrals.iter().any(|r| r.id == referral.id) {
            return Err(StoreError::conflict("referral", &referral.id));
        }
        referrals.push(referral);
        Ok(())
    }

    async fn referrals_by(&self, referrer: &UserId) -> Result<Vec<Referral>, StoreError> {
        Ok(self
            .referrals
            .read()
            .iter()
            .filter(|r| &r.referrer_id == referrer)
            .cloned()
            .collect())
    }

    async fn save_referral(&self, referral: &Referral) -> Result<(), StoreError> {
        let mut referrals = self.referrals.write();
        match referrals.iter_mut().find(|r| r.id == referral.id) {
            Some(existing) => *existing = referral.clone(),
            None => referrals.push(referral.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionLog for MemoryStore {
    async fn append(&self, tx: CreditTransaction) -> Result<(), StoreError> {
        self.transactions.lock().push(tx);
        Ok(())
    }

    async fn transactions_for(&self, user: &UserId) -> Result<Vec<CreditTransaction>, StoreError> {
        Ok(self
            .transactions
            .lock()
            .iter()
            .filter(|tx| &tx.user_id == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CompletionRepository for MemoryStore {
    async fn record_completion(&self, user: &UserId, task: &TaskId) -> Result<bool, StoreError> {
        Ok(self.completions.insert(CompletionRecord {
            user_id: user.clone(),
            task_id: task.clone(),
        }))
    }

    async fn has_completed(&self, user: &UserId, task: &TaskId) -> Result<bool, StoreError> {
        Ok(self.completions.contains(&CompletionRecord {
            user_id: user.clone(),
            task_id: task.clone(),
        }))
    }
}

#[async_trait]
impl SubmissionRepository for MemoryStore {
    async fn insert_submission(&self, submission: Submission) -> Result<(), StoreError> {
        match self.submissions.entry(submission.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::conflict("submission", &submission.id)),
            Entry::Vacant(slot) => {
                slot.insert(submission);
                Ok(())
            }
        }
    }

    async fn get_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        Ok(self.submissions.get(id).map(|s| s.value().clone()))
    }

    async fn save_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        self.submissions.insert(submission.id.clone(), submission.clone());
        Ok(())
    }

    async fn pending_submissions(&self) -> Result<Vec<Submission>, StoreError> {
        let mut pending: Vec<Submission> = self
            .submissions
            .iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .map(|s| s.value().clone())
            .collect();
        pending.sort_by(|a, b| (a.submitted_at, &a.id).cmp(&(b.submitted_at, &b.id)));
        Ok(pending)
    }

    async fn pending_for(&self, user: &UserId, task: &TaskId) -> Result<Option<Submission>, StoreError> {
        Ok(self
            .submissions
            .iter()
            .find(|s| s.status == SubmissionStatus::Pending && &s.user_id == user && &s.task_id == task)
            .map(|s| s.value().clone()))
    }
}

#[async_trait]
impl RedemptionRepository for MemoryStore {
    async fn insert_redemption(&self, redemption: Redemption) -> Result<(), StoreError> {
        match self.redemptions.entry(redemption.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::conflict("redemption", &redemption.id)),
            Entry::Vacant(slot) => {
                slot.insert(redemption);
                Ok(())
            }
        }
    }

    async fn get_redemption(&self, id: &RedemptionId) -> Result<Option<Redemption>, StoreError> {
        Ok(self.redemptions.get(id).map(|r| r.value().clone()))
    }

    async fn save_redemption(&self, redemption: &Redemption) -> Result<(), StoreError> {
        self.redemptions.insert(redemption.id.clone(), redemption.clone());
        Ok(())
    }

    async fn redemptions_for(&self, user: &UserId) -> Result<Vec<Redemption>, StoreError> {
        let mut found: Vec<Redemption> = self
            .redemptions
            .iter()
            .filter(|r| &r.user_id == user)
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| (a.requested_at, &a.id).cmp(&(b.requested_at, &b.id)));
        Ok(found)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn push_notification(&self, notification: Notification) -> Result<(), StoreError> {
        self.notifications.lock().push(notification);
        Ok(())
    }

    async fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, StoreError> {
        Ok(self
            .notifications
            .lock()
            .iter()
            .filter(|n| &n.user_id == user)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use taskpay_core::RewardType;

    #[tokio::test]
    async fn insert_and_lookup_user() {
        let store = MemoryStore::new();
        let user = User::new(UserId::from("u1"), "Bola");
        let code = user.referral_code.clone();
        store.insert_user(user.clone()).await.unwrap();

        assert_eq!(store.get_user(&user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(store.find_by_referral_code(&code).await.unwrap(), Some(user));
        assert_eq!(store.find_by_referral_code("REF-NOPE").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_user_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(User::new(UserId::from("u1"), "Bola")).await.unwrap();
        let err = store.insert_user(User::new(UserId::from("u1"), "Other")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn completion_recorded_once() {
        let store = MemoryStore::new();
        let (user, task) = (UserId::from("u1"), TaskId::from("t1"));

        assert!(!store.has_completed(&user, &task).await.unwrap());
        assert!(store.record_completion(&user, &task).await.unwrap());
        assert!(!store.record_completion(&user, &task).await.unwrap());
        assert!(store.has_completed(&user, &task).await.unwrap());
    }

    #[tokio::test]
    async fn campaign_claims_stop_at_budget() {
        let store = MemoryStore::new();
        let id = CampaignId::from("c1");
        store.insert_campaign(Campaign::new(id.clone(), "Acme", 1)).await.unwrap();

        assert!(matches!(store.claim_completion(&id).await.unwrap(), CampaignClaim::Claimed(c) if c.completions == 1));
        assert_eq!(store.claim_completion(&id).await.unwrap(), CampaignClaim::Exhausted);
        assert_eq!(
            store.claim_completion(&CampaignId::from("zz")).await.unwrap(),
            CampaignClaim::NotFound
        );
    }

    #[tokio::test]
    async fn referrals_filtered_by_referrer_and_saved_in_place() {
        let store = MemoryStore::new();
        let mut mine = Referral::new(UserId::from("r1"), UserId::from("u1"));
        store.insert_referral(mine.clone()).await.unwrap();
        store
            .insert_referral(Referral::new(UserId::from("r2"), UserId::from("u2")))
            .await
            .unwrap();

        mine.status = taskpay_core::ReferralStatus::TaskCompleted;
        store.save_referral(&mine).await.unwrap();

        let found = store.referrals_by(&UserId::from("r1")).await.unwrap();
        assert_eq!(found, vec![mine]);
    }

    #[tokio::test]
    async fn transactions_keep_insertion_order() {
        let store = MemoryStore::new();
        let user = UserId::from("u1");
        store.append(CreditTransaction::new(user.clone(), "first", 5)).await.unwrap();
        store.append(CreditTransaction::new(UserId::from("u2"), "other", 1)).await.unwrap();
        store.append(CreditTransaction::new(user.clone(), "second", -2)).await.unwrap();

        let amounts: Vec<i64> = store
            .transactions_for(&user)
            .await
            .unwrap()
            .into_iter()
            .map(|tx| tx.amount)
            .collect();
        assert_eq!(amounts, vec![5, -2]);
    }

    #[tokio::test]
    async fn pending_submissions_exclude_reviewed() {
        let store = MemoryStore::new();
        let pending = Submission::new(UserId::from("u1"), TaskId::from("t1"));
        let mut reviewed = Submission::new(UserId::from("u1"), TaskId::from("t2"));
        reviewed.status = SubmissionStatus::Approved;
        store.insert_submission(pending.clone()).await.unwrap();
        store.insert_submission(reviewed).await.unwrap();

        assert_eq!(store.pending_submissions().await.unwrap(), vec![pending]);
    }

    #[tokio::test]
    async fn pending_for_matches_user_and_task() {
        let store = MemoryStore::new();
        let (user, task) = (UserId::from("u1"), TaskId::from("t1"));
        let pending = Submission::new(user.clone(), task.clone());
        let mut reviewed = Submission::new(user.clone(), TaskId::from("t2"));
        reviewed.status = SubmissionStatus::Rejected;
        store.insert_submission(pending.clone()).await.unwrap();
        store.insert_submission(reviewed).await.unwrap();

        assert_eq!(store.pending_for(&user, &task).await.unwrap(), Some(pending));
        assert_eq!(store.pending_for(&user, &TaskId::from("t2")).await.unwrap(), None);
        assert_eq!(store.pending_for(&UserId::from("u2"), &task).await.unwrap(), None);
    }

    #[tokio::test]
    async fn snapshot_restores_store() {
        let store = MemoryStore::new();
        store.insert_user(User::new(UserId::from("u1"), "Bola")).await.unwrap();
        store
            .insert_task(Task::new(TaskId::from("t1"), "Login", RewardType::Credits, 5))
            .await
            .unwrap();
        store.record_completion(&UserId::from("u1"), &TaskId::from("t1")).await.unwrap();
        store.append(CreditTransaction::new(UserId::from("u1"), "Task: Login", 5)).await.unwrap();

        let snapshot = store.snapshot();
        let restored = MemoryStore::from_snapshot(snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert!(restored
            .has_completed(&UserId::from("u1"), &TaskId::from("t1"))
            .await
            .unwrap());
    }
}
