//! Error types for the reward ledger
//!
//! Every ledger operation fails with [`LedgerError`]. Lookups that miss fail
//! before any state is touched, so an error never leaves a partial change.

use crate::types::{CampaignId, RedemptionId, SubmissionId, TaskId, UserId};

/// Main ledger error type
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// User id not present in the store
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// Task id not present in the catalog
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Campaign id not present in the store
    #[error("campaign not found: {0}")]
    CampaignNotFound(CampaignId),

    /// Submission id not present in the store
    #[error("submission not found: {0}")]
    SubmissionNotFound(SubmissionId),

    /// Redemption id not present in the store
    #[error("redemption not found: {0}")]
    RedemptionNotFound(RedemptionId),

    /// Referral code does not belong to any user
    #[error("unknown referral code: {0}")]
    UnknownReferralCode(String),

    /// Non-repeatable task was already settled for this user
    #[error("task {task} already completed by {user}")]
    AlreadyCompleted { user: UserId, task: TaskId },

    /// Task must go through proof review instead of settling directly
    #[error("task {0} requires proof review")]
    ProofRequired(TaskId),

    /// A submission for this non-repeatable task is already awaiting review
    #[error("task {task} already submitted for review by {user}")]
    AlreadySubmitted { user: UserId, task: TaskId },

    /// Sponsored campaign has no completions left
    #[error("campaign {0} has no budget left")]
    CampaignExhausted(CampaignId),

    /// Balance too small for a debit
    #[error("insufficient {balance} balance: requested {requested}, available {available}")]
    InsufficientBalance {
        balance: &'static str,
        requested: String,
        available: String,
    },

    /// Redemption below the configured minimum
    #[error("redemption below minimum: requested {requested}, minimum {minimum}")]
    BelowMinimum { requested: String, minimum: String },

    /// Illegal lifecycle transition
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Check if the error is a failed lookup
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::TaskNotFound(_)
                | Self::CampaignNotFound(_)
                | Self::SubmissionNotFound(_)
                | Self::RedemptionNotFound(_)
        )
    }

    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Create an invalid transition error from two debuggable states
    #[inline]
    pub fn invalid_transition(from: impl std::fmt::Debug, to: impl std::fmt::Debug) -> Self {
        Self::InvalidTransition {
            from: format!("{from:?}"),
            to: format!("{to:?}"),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
