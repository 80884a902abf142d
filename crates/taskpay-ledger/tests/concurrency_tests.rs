//! Concurrent settlement must not lose updates or double-pay

use futures::future::join_all;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use taskpay_core::{CompletionStatus, LedgerError, RedemptionRequest, TaskId, UserId};
use taskpay_store::Snapshot;
use taskpay_test_utils::{
    create_test_user, create_test_user_with_balances, credit_task, referred_snapshot,
    setup_test_ledger, TestLedger, FIRST_TASK_BONUS,
};

const N: usize = 32;

async fn complete_concurrently(
    ledger: &Arc<TestLedger>,
    user: &str,
    task: &str,
) -> Vec<Result<(), LedgerError>> {
    let handles = (0..N).map(|_| {
        let ledger = Arc::clone(ledger);
        let (user, task) = (UserId::from(user), TaskId::from(task));
        tokio::spawn(async move {
            ledger
                .complete_task(&user, &task, CompletionStatus::Completed)
                .await
                .map(|_| ())
        })
    });
    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_repeatable_completions_are_all_counted() {
    let ledger = Arc::new(setup_test_ledger(referred_snapshot()));

    let results = complete_concurrently(&ledger, "u1", "login").await;
    assert!(results.iter().all(Result::is_ok));

    let balances = ledger.balances(&UserId::from("u1")).await.unwrap();
    assert_eq!(balances.tasks_completed, N as u64);
    assert_eq!(balances.credits, 10 + 2 * N as i64);
    assert_eq!(ledger.transactions(&UserId::from("u1")).await.unwrap().len(), N);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_completions_pay_referrer_once() {
    let ledger = Arc::new(setup_test_ledger(referred_snapshot()));

    complete_concurrently(&ledger, "u1", "login").await;

    let referrer = ledger.user(&UserId::from("r1")).await.unwrap();
    assert_eq!(referrer.credits, 100 + FIRST_TASK_BONUS);
    assert_eq!(referrer.referral_stats.credits_earned, FIRST_TASK_BONUS);
    assert_eq!(ledger.transactions(&referrer.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_one_shot_completions_settle_once() {
    let ledger = Arc::new(setup_test_ledger(referred_snapshot()));

    let results = complete_concurrently(&ledger, "u1", "credits-5").await;
    let settled = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::AlreadyCompleted { .. })))
        .count();
    assert_eq!((settled, refused), (1, N - 1));

    let balances = ledger.balances(&UserId::from("u1")).await.unwrap();
    assert_eq!((balances.credits, balances.tasks_completed), (15, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_referees_of_one_referrer_each_pay_once() {
    let referrer = create_test_user("r1", 0);
    let referees: Vec<_> = (0..N)
        .map(|i| create_test_user(&format!("u{i}"), 0).referred_by(referrer.id.clone()))
        .collect();
    let snapshot = Snapshot {
        users: std::iter::once(referrer).chain(referees).collect(),
        tasks: vec![credit_task("credits-5", 5)],
        ..Snapshot::default()
    };
    let ledger = Arc::new(setup_test_ledger(snapshot));

    let handles = (0..N).map(|i| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            ledger
                .complete_task(
                    &UserId::from(format!("u{i}")),
                    &TaskId::from("credits-5"),
                    CompletionStatus::Completed,
                )
                .await
        })
    });
    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    let referrer = ledger.user(&UserId::from("r1")).await.unwrap();
    assert_eq!(referrer.credits, FIRST_TASK_BONUS * N as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemptions_never_overdraw() {
    let snapshot = Snapshot {
        users: vec![create_test_user_with_balances("u1", 500, 0)],
        ..Snapshot::default()
    };
    let ledger = Arc::new(setup_test_ledger(snapshot));

    let handles = (0..N).map(|_| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            ledger
                .request_redemption(&UserId::from("u1"), RedemptionRequest::Data { megabytes: 100 }, "0803")
                .await
        })
    });
    let accepted = join_all(handles)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(_))))
        .count();

    assert_eq!(accepted, 5);
    assert_eq!(ledger.balances(&UserId::from("u1")).await.unwrap().data_balance_mb, 0);
}
