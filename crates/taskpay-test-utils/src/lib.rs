//! Testing utilities for the taskpay workspace
//!
//! Shared fixtures for building stores and ledgers.

#![allow(missing_docs)]

use rust_decimal::Decimal;
use std::sync::Arc;
use taskpay_core::{
    Campaign, CampaignId, LedgerConfig, Referral, RewardType, Task, TaskId, User, UserId,
};
use taskpay_ledger::RewardLedger;
use taskpay_store::{MemoryStore, Snapshot};

pub type TestLedger = RewardLedger<MemoryStore>;

/// First-task referral bonus used by [`setup_test_ledger`]
pub const FIRST_TASK_BONUS: i64 = 50;

pub fn credit_task(id: &str, amount: i64) -> Task {
    Task::new(TaskId::from(id), format!("Task {id}"), RewardType::Credits, amount)
}

pub fn data_task(id: &str, megabytes: i64) -> Task {
    Task::new(TaskId::from(id), format!("Task {id}"), RewardType::Data, megabytes)
}

pub fn airtime_task(id: &str, naira: i64) -> Task {
    Task::new(TaskId::from(id), format!("Task {id}"), RewardType::Airtime, naira)
}

pub fn create_test_user(id: &str, credits: i64) -> User {
    User::new(UserId::from(id), format!("User {id}")).with_credits(credits)
}

pub fn create_test_user_with_balances(id: &str, data_mb: i64, airtime_ngn: i64) -> User {
    let mut user = create_test_user(id, 0);
    user.data_balance_mb = data_mb;
    user.airtime_balance_ngn = Decimal::from(airtime_ngn);
    user
}

/// Referrer `r1` with 100 credits and referee `u1` with 10 credits
pub fn referred_snapshot() -> Snapshot {
    let referrer = create_test_user("r1", 100);
    let referee = create_test_user("u1", 10).referred_by(referrer.id.clone());
    Snapshot {
        referrals: vec![Referral::new(referrer.id.clone(), referee.id.clone())],
        users: vec![referrer, referee],
        tasks: vec![
            credit_task("credits-5", 5),
            data_task("data-100", 100),
            airtime_task("airtime-200", 200),
            credit_task("login", 2).repeatable(),
            credit_task("proof", 30).with_proof(),
            credit_task("sponsored", 15).sponsored_by(CampaignId::from("c1")),
        ],
        campaigns: vec![Campaign::new(CampaignId::from("c1"), "Acme", 2)],
        ..Snapshot::default()
    }
}

pub fn setup_test_ledger(snapshot: Snapshot) -> TestLedger {
    let config = LedgerConfig::new().with_first_task_bonus(FIRST_TASK_BONUS);
    setup_test_ledger_with_config(snapshot, config)
}

pub fn setup_test_ledger_with_config(snapshot: Snapshot, config: LedgerConfig) -> TestLedger {
    let store = MemoryStore::from_snapshot(snapshot).expect("valid test snapshot");
    RewardLedger::new(Arc::new(store), config).expect("valid test config")
}
