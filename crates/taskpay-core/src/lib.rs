//! taskpay Core - reward ledger rules
//!
//! Entities and pure business rules of a credits-for-tasks platform:
//! - Settling task rewards into credits, data or airtime balances
//! - Paying referrers once, on their referee's first completed task
//! - Debiting and refunding redemption requests
//! - Charging credits for generations
//!
//! Functions here take values and return new values; persistence and locking
//! belong to `taskpay-ledger`.
//!
//! # Example
//!
//! ```rust
//! use taskpay_core::prelude::*;
//!
//! let user = User::new(UserId::from("u1"), "Bola").with_credits(10);
//! let task = Task::new(TaskId::from("t1"), "Daily login", RewardType::Credits, 5);
//!
//! let settlement = settle_completion(&user, &task, None, &ReferralRewards::default());
//! assert_eq!(settlement.user.credits, 15);
//! assert_eq!(settlement.user.tasks_completed, 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod redemption;
pub mod settlement;
pub mod spend;
pub mod types;

pub use config::{GenerationCosts, LedgerConfig, MinRedemption, ReferralRewards};
pub use error::{ConfigError, LedgerError};
pub use redemption::{Redemption, RedemptionRequest, RedemptionStatus, Resolution};
pub use settlement::{settle_completion, ReferrerBonus, ReferrerContext, Settlement, SettlementOutcome};
pub use spend::charge_generation;
pub use types::{
    Balances, Campaign, CampaignId, CompletionStatus, CreditTransaction, GenerationKind,
    Notification, NotificationKind, RedemptionId, Referral, ReferralId, ReferralStats,
    ReferralStatus, RewardType, Submission, SubmissionId, SubmissionStatus, Task, TaskId,
    TransactionId, User, UserId,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with taskpay Core
    pub use crate::{
        settle_completion, CompletionStatus, LedgerConfig, LedgerError, ReferralRewards,
        RedemptionRequest, RedemptionStatus, RewardType, Task, TaskId, User, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
