//! taskpay Store - repositories for the reward ledger
//!
//! Provides:
//! - Async repository traits for every ledger record
//! - [`MemoryStore`], a `dashmap`-backed implementation of all of them
//! - [`Snapshot`], a JSON image of a store for seeding and persistence

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod memory;
pub mod repository;
pub mod snapshot;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use repository::{
    CampaignClaim, CampaignRepository, CompletionRepository, NotificationRepository,
    RedemptionRepository, ReferralRepository, Store, SubmissionRepository, TaskCatalog,
    TransactionLog, UserRepository,
};
pub use snapshot::{CompletionRecord, Snapshot};
