//! Core types for the reward ledger
//!
//! Defines the entities every ledger operation reads or writes:
//! - Identifiers (ULID-backed, transparent strings on the wire)
//! - Users and their balances
//! - Tasks, sponsored campaigns and proof submissions
//! - Referrals, ledger entries and notifications

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh identifier
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new().to_string())
            }

            /// Borrow the raw identifier
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Unique user identifier
    UserId
);
string_id!(
    /// Unique task identifier
    TaskId
);
string_id!(
    /// Sponsored campaign identifier
    CampaignId
);
string_id!(
    /// Referral record identifier
    ReferralId
);
string_id!(
    /// Ledger entry identifier
    TransactionId
);
string_id!(
    /// Proof submission identifier
    SubmissionId
);
string_id!(
    /// Redemption request identifier
    RedemptionId
);

/// Referral statistics kept on the referrer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralStats {
    /// Number of users who signed up with this user's code
    pub count: u64,
    /// Credits earned through referral bonuses
    pub credits_earned: i64,
}

/// A registered user and their balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Code other users enter at signup
    pub referral_code: String,
    pub credits: i64,
    pub data_balance_mb: i64,
    pub airtime_balance_ngn: Decimal,
    pub tasks_completed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<UserId>,
    #[serde(default)]
    pub referral_stats: ReferralStats,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user with zero balances
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        let referral_code = referral_code_for(&id);
        Self {
            id,
            name: name.into(),
            referral_code,
            credits: 0,
            data_balance_mb: 0,
            airtime_balance_ngn: Decimal::ZERO,
            tasks_completed: 0,
            referred_by: None,
            referral_stats: ReferralStats::default(),
            created_at: Utc::now(),
        }
    }

    /// With starting credits
    #[inline]
    #[must_use]
    pub fn with_credits(mut self, credits: i64) -> Self {
        self.credits = credits;
        self
    }

    /// With referrer
    #[inline]
    #[must_use]
    pub fn referred_by(mut self, referrer: UserId) -> Self {
        self.referred_by = Some(referrer);
        self
    }

    /// Snapshot of the three balances
    #[inline]
    #[must_use]
    pub fn balances(&self) -> Balances {
        Balances {
            credits: self.credits,
            data_balance_mb: self.data_balance_mb,
            airtime_balance_ngn: self.airtime_balance_ngn,
            tasks_completed: self.tasks_completed,
        }
    }
}

/// Derive a referral code from a user id.
///
/// Uses the last eight characters of the id, which for ULIDs is random data.
#[must_use]
pub fn referral_code_for(id: &UserId) -> String {
    let raw = id.as_str();
    let skip = raw.chars().count().saturating_sub(8);
    let suffix: String = raw.chars().skip(skip).collect();
    format!("REF-{}", suffix.to_uppercase())
}

/// Balance fields returned to callers after a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub credits: i64,
    pub data_balance_mb: i64,
    pub airtime_balance_ngn: Decimal,
    pub tasks_completed: u64,
}

/// What a task pays out in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    Credits,
    /// Mobile data, in megabytes
    Data,
    /// Mobile airtime, in naira
    Airtime,
}

impl std::fmt::Display for RewardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Credits => "credits",
            Self::Data => "data",
            Self::Airtime => "airtime",
        };
        f.write_str(s)
    }
}

/// Static task definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub reward_type: RewardType,
    /// Credits, megabytes or naira depending on `reward_type`
    pub reward_amount: i64,
    /// Completion must be reviewed before it pays out
    #[serde(default)]
    pub requires_proof: bool,
    /// May be completed more than once (daily logins)
    #[serde(default)]
    pub repeatable: bool,
    /// Advertiser campaign backing a sponsored task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<CampaignId>,
}

impl Task {
    /// Create a one-shot task
    #[must_use]
    pub fn new(id: TaskId, title: impl Into<String>, reward_type: RewardType, reward_amount: i64) -> Self {
        Self {
            id,
            title: title.into(),
            reward_type,
            reward_amount,
            requires_proof: false,
            repeatable: false,
            campaign: None,
        }
    }

    /// Mark as repeatable
    #[inline]
    #[must_use]
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Mark as requiring proof
    #[inline]
    #[must_use]
    pub fn with_proof(mut self) -> Self {
        self.requires_proof = true;
        self
    }

    /// Back by a sponsored campaign
    #[inline]
    #[must_use]
    pub fn sponsored_by(mut self, campaign: CampaignId) -> Self {
        self.campaign = Some(campaign);
        self
    }
}

/// Advertiser campaign funding sponsored tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub advertiser: String,
    /// Completions the advertiser has paid for
    pub max_completions: u64,
    pub completions: u64,
    pub active: bool,
}

impl Campaign {
    /// Create an active campaign
    #[must_use]
    pub fn new(id: CampaignId, advertiser: impl Into<String>, max_completions: u64) -> Self {
        Self {
            id,
            advertiser: advertiser.into(),
            max_completions,
            completions: 0,
            active: true,
        }
    }

    /// Completions left in the budget
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> u64 {
        if self.active {
            self.max_completions.saturating_sub(self.completions)
        } else {
            0
        }
    }
}

/// Referral progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    SignedUp,
    TaskCompleted,
}

/// Link between an inviting user and an invited user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    pub referrer_id: UserId,
    pub referee_id: UserId,
    pub status: ReferralStatus,
    pub created_at: DateTime<Utc>,
}

impl Referral {
    /// Create a referral in the `signed_up` state
    #[must_use]
    pub fn new(referrer_id: UserId, referee_id: UserId) -> Self {
        Self {
            id: ReferralId::new(),
            referrer_id,
            referee_id,
            status: ReferralStatus::SignedUp,
            created_at: Utc::now(),
        }
    }
}

/// Append-only credit ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub description: String,
    /// Signed credit delta
    pub amount: i64,
    pub date: DateTime<Utc>,
}

impl CreditTransaction {
    /// Create a ledger entry dated now
    #[must_use]
    pub fn new(user_id: UserId, description: impl Into<String>, amount: i64) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            description: description.into(),
            amount,
            date: Utc::now(),
        }
    }
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
}

/// User-facing notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn new(user_id: UserId, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            message: message.into(),
        }
    }
}

/// Requested outcome of a task completion call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Awaiting manual review of proof
    Pending,
    Completed,
}

/// Review state of a proof submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Proof of completion awaiting admin review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub user_id: UserId,
    pub task_id: TaskId,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    #[must_use]
    pub fn new(user_id: UserId, task_id: TaskId) -> Self {
        Self {
            id: SubmissionId::new(),
            user_id,
            task_id,
            status: SubmissionStatus::Pending,
            submitted_at: Utc::now(),
        }
    }
}

/// Paid generation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Image,
    Video,
    AdCopy,
    SocialPost,
}

impl std::fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::AdCopy => "ad copy",
            Self::SocialPost => "social post",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_transparent_strings() {
        let id = UserId::from("r1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"r1\"");
        assert_eq!(id.to_string(), "r1");
    }

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(TaskId::new(), TaskId::new());
    }

    #[test]
    fn referral_code_uses_id_suffix() {
        let code = referral_code_for(&UserId::from("user-abcdefgh"));
        assert_eq!(code, "REF-ABCDEFGH");
        assert_eq!(referral_code_for(&UserId::from("r1")), "REF-R1");
    }

    #[test]
    fn campaign_remaining() {
        let mut campaign = Campaign::new(CampaignId::from("c1"), "Acme", 2);
        assert_eq!(campaign.remaining(), 2);
        campaign.completions = 2;
        assert_eq!(campaign.remaining(), 0);
        campaign.completions = 0;
        campaign.active = false;
        assert_eq!(campaign.remaining(), 0);
    }

    #[test]
    fn reward_type_wire_names() {
        let json = serde_json::to_string(&RewardType::Airtime).unwrap();
        assert_eq!(json, "\"airtime\"");
        let task: Task = serde_json::from_str(
            r#"{"id":"t1","title":"Follow us","reward_type":"data","reward_amount":100}"#,
        )
        .unwrap();
        assert_eq!(task.reward_type, RewardType::Data);
        assert!(!task.repeatable);
        assert!(task.campaign.is_none());
    }
}
