//! taskpay Ledger - the reward ledger service
//!
//! Runs the rules of `taskpay-core` against a `taskpay-store` backend:
//! - Registers users and referral links
//! - Settles task rewards and pays first-task referral bonuses
//! - Queues and reviews proof submissions
//! - Charges credits for generations
//! - Drives redemption requests through their lifecycle
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskpay_core::{CompletionStatus, LedgerConfig, RewardType, Task, TaskId};
//! use taskpay_ledger::RewardLedger;
//! use taskpay_store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = RewardLedger::new(Arc::new(MemoryStore::new()), LedgerConfig::default())?;
//! ledger.add_task(Task::new(TaskId::from("login"), "Daily login", RewardType::Credits, 5).repeatable()).await?;
//!
//! let user = ledger.register_user("Bola", None).await?;
//! let outcome = ledger
//!     .complete_task(&user.id, &TaskId::from("login"), CompletionStatus::Completed)
//!     .await?;
//! assert_eq!(outcome.map(|o| o.balances.credits), Some(5));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod ledger;
pub mod locks;

pub use ledger::{RedemptionOutcome, RewardLedger};
pub use locks::{UserGuards, UserLocks};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
