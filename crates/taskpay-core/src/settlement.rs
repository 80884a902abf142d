//! Task reward settlement
//!
//! Pure arithmetic of completing a task: given the user, the task and (when
//! the user was referred) the referrer with their referrals, compute the new
//! records. Nothing here reads or writes a store; the ledger service loads the
//! inputs, runs [`settle_completion`] and persists the [`Settlement`].

use crate::config::ReferralRewards;
use crate::types::{
    Balances, CreditTransaction, Notification, NotificationKind, Referral, ReferralStatus,
    RewardType, Task, User,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Referrer side of a settlement
#[derive(Debug, Clone, Copy)]
pub struct ReferrerContext<'a> {
    /// The user named by `referred_by`
    pub referrer: &'a User,
    /// Referrals owned by that referrer
    pub referrals: &'a [Referral],
}

/// Result of settling one completed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// The completing user after settlement
    pub user: User,
    /// Ledger entry for a credits reward
    pub transaction: Option<CreditTransaction>,
    /// Notification for a data or airtime reward
    pub notification: Option<Notification>,
    /// Bonus paid to the referrer, if this was a referred first completion
    pub referrer_bonus: Option<ReferrerBonus>,
}

/// One-time first-task bonus paid to a referrer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerBonus {
    /// The referrer after the bonus
    pub referrer: User,
    /// Ledger entry on the referrer's account
    pub transaction: CreditTransaction,
    /// The referrer's referrals with the matching one flipped to
    /// `task_completed`; `None` when no record changed
    pub referrals: Option<Vec<Referral>>,
}

/// Caller-facing summary of a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub balances: Balances,
    pub transaction: Option<CreditTransaction>,
    pub notification: Option<Notification>,
    /// Present only when a referral changed state
    pub referrals: Option<Vec<Referral>>,
    /// Credits paid to the referrer
    pub referrer_bonus: Option<i64>,
}

impl From<&Settlement> for SettlementOutcome {
    fn from(settlement: &Settlement) -> Self {
        Self {
            balances: settlement.user.balances(),
            transaction: settlement.transaction.clone(),
            notification: settlement.notification.clone(),
            referrals: settlement
                .referrer_bonus
                .as_ref()
                .and_then(|bonus| bonus.referrals.clone()),
            referrer_bonus: settlement
                .referrer_bonus
                .as_ref()
                .map(|bonus| bonus.transaction.amount),
        }
    }
}

/// Settle a completed task for `user`.
///
/// The first-completion check reads `tasks_completed` before it is
/// incremented and applies to every reward type. `referrer` is `None` when the
/// user was not referred or the referrer no longer exists; in both cases no
/// bonus is paid.
#[must_use]
pub fn settle_completion(
    user: &User,
    task: &Task,
    referrer: Option<ReferrerContext<'_>>,
    rewards: &ReferralRewards,
) -> Settlement {
    let is_first_completion = user.tasks_completed == 0;
    let mut updated = user.clone();

    let (transaction, notification) = apply_reward(&mut updated, task);

    let referrer_bonus = match (is_first_completion, &user.referred_by, referrer) {
        (true, Some(referrer_id), Some(ctx)) if &ctx.referrer.id == referrer_id => {
            Some(pay_first_task_bonus(user, ctx, rewards.first_task))
        }
        _ => None,
    };

    updated.tasks_completed += 1;

    Settlement {
        user: updated,
        transaction,
        notification,
        referrer_bonus,
    }
}

fn apply_reward(user: &mut User, task: &Task) -> (Option<CreditTransaction>, Option<Notification>) {
    match task.reward_type {
        RewardType::Credits => {
            user.credits = user.credits.saturating_add(task.reward_amount);
            let tx = CreditTransaction::new(
                user.id.clone(),
                format!("Task: {}", task.title),
                task.reward_amount,
            );
            (Some(tx), None)
        }
        RewardType::Data => {
            user.data_balance_mb = user.data_balance_mb.saturating_add(task.reward_amount);
            let note = Notification::new(
                user.id.clone(),
                NotificationKind::Success,
                format!("You earned {}MB of data for \"{}\"", task.reward_amount, task.title),
            );
            (None, Some(note))
        }
        RewardType::Airtime => {
            user.airtime_balance_ngn += Decimal::from(task.reward_amount);
            let note = Notification::new(
                user.id.clone(),
                NotificationKind::Success,
                format!("You earned NGN {} of airtime for \"{}\"", task.reward_amount, task.title),
            );
            (None, Some(note))
        }
    }
}

fn pay_first_task_bonus(referee: &User, ctx: ReferrerContext<'_>, bonus: i64) -> ReferrerBonus {
    let mut referrer = ctx.referrer.clone();
    referrer.credits = referrer.credits.saturating_add(bonus);
    referrer.referral_stats.credits_earned = referrer.referral_stats.credits_earned.saturating_add(bonus);

    let mut changed = false;
    let referrals: Vec<Referral> = ctx
        .referrals
        .iter()
        .cloned()
        .map(|mut referral| {
            if referral.referrer_id == referrer.id
                && referral.referee_id == referee.id
                && referral.status != ReferralStatus::TaskCompleted
            {
                referral.status = ReferralStatus::TaskCompleted;
                changed = true;
            }
            referral
        })
        .collect();

    let transaction = CreditTransaction::new(
        referrer.id.clone(),
        format!("Referral bonus: {}", referee.name),
        bonus,
    );

    ReferrerBonus {
        referrer,
        transaction,
        referrals: changed.then_some(referrals),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskId, UserId};
    use proptest::prelude::*;

    fn rewards() -> ReferralRewards {
        ReferralRewards {
            first_task: 50,
            signup: 0,
        }
    }

    fn task(reward_type: RewardType, amount: i64) -> Task {
        Task::new(TaskId::from("t1"), "Follow us", reward_type, amount)
    }

    fn referred_pair() -> (User, User, Vec<Referral>) {
        let referrer = User::new(UserId::from("r1"), "Ada").with_credits(100);
        let user = User::new(UserId::from("u1"), "Bola")
            .with_credits(10)
            .referred_by(referrer.id.clone());
        let referrals = vec![
            Referral::new(referrer.id.clone(), UserId::from("u0")),
            Referral::new(referrer.id.clone(), user.id.clone()),
        ];
        (user, referrer, referrals)
    }

    #[test]
    fn credits_reward_adds_balance_and_ledger_entry() {
        let user = User::new(UserId::from("u1"), "Bola").with_credits(10);
        let settlement = settle_completion(&user, &task(RewardType::Credits, 5), None, &rewards());

        assert_eq!(settlement.user.credits, 15);
        assert_eq!(settlement.user.tasks_completed, 1);
        let tx = settlement.transaction.unwrap();
        assert_eq!(tx.amount, 5);
        assert_eq!(tx.description, "Task: Follow us");
        assert!(settlement.notification.is_none());
    }

    #[test]
    fn data_reward_notifies_without_ledger_entry() {
        let user = User::new(UserId::from("u1"), "Bola");
        let settlement = settle_completion(&user, &task(RewardType::Data, 100), None, &rewards());

        assert_eq!(settlement.user.data_balance_mb, 100);
        assert_eq!(settlement.user.credits, 0);
        assert!(settlement.transaction.is_none());
        assert_eq!(settlement.notification.unwrap().kind, NotificationKind::Success);
    }

    #[test]
    fn airtime_reward_notifies_without_ledger_entry() {
        let user = User::new(UserId::from("u1"), "Bola");
        let settlement = settle_completion(&user, &task(RewardType::Airtime, 200), None, &rewards());

        assert_eq!(settlement.user.airtime_balance_ngn, Decimal::from(200));
        assert!(settlement.transaction.is_none());
        assert!(settlement.notification.is_some());
    }

    #[test]
    fn referred_first_completion_pays_referrer() {
        let (user, referrer, referrals) = referred_pair();
        let ctx = ReferrerContext {
            referrer: &referrer,
            referrals: &referrals,
        };
        let settlement = settle_completion(&user, &task(RewardType::Credits, 5), Some(ctx), &rewards());

        assert_eq!(settlement.user.credits, 15);
        assert_eq!(settlement.user.tasks_completed, 1);

        let bonus = settlement.referrer_bonus.unwrap();
        assert_eq!(bonus.referrer.credits, 150);
        assert_eq!(bonus.referrer.referral_stats.credits_earned, 50);
        assert_eq!(bonus.transaction.amount, 50);
        let referrals = bonus.referrals.unwrap();
        assert_eq!(referrals[0].status, ReferralStatus::SignedUp);
        assert_eq!(referrals[1].status, ReferralStatus::TaskCompleted);
    }

    #[test]
    fn data_task_also_triggers_referral_bonus() {
        let (user, referrer, referrals) = referred_pair();
        let ctx = ReferrerContext {
            referrer: &referrer,
            referrals: &referrals,
        };
        let settlement = settle_completion(&user, &task(RewardType::Data, 100), Some(ctx), &rewards());
        assert!(settlement.referrer_bonus.is_some());
    }

    #[test]
    fn second_completion_does_not_pay_referrer() {
        let (mut user, referrer, referrals) = referred_pair();
        user.tasks_completed = 1;
        let ctx = ReferrerContext {
            referrer: &referrer,
            referrals: &referrals,
        };
        let settlement = settle_completion(&user, &task(RewardType::Credits, 5), Some(ctx), &rewards());

        assert!(settlement.referrer_bonus.is_none());
        assert_eq!(settlement.user.tasks_completed, 2);
    }

    #[test]
    fn missing_referrer_is_skipped() {
        let (user, _, _) = referred_pair();
        let settlement = settle_completion(&user, &task(RewardType::Credits, 5), None, &rewards());
        assert!(settlement.referrer_bonus.is_none());
        assert_eq!(settlement.user.credits, 15);
    }

    #[test]
    fn mismatched_referrer_is_ignored() {
        let (user, _, referrals) = referred_pair();
        let stranger = User::new(UserId::from("x9"), "Stranger");
        let ctx = ReferrerContext {
            referrer: &stranger,
            referrals: &referrals,
        };
        let settlement = settle_completion(&user, &task(RewardType::Credits, 5), Some(ctx), &rewards());
        assert!(settlement.referrer_bonus.is_none());
    }

    #[test]
    fn outcome_summarises_settlement() {
        let (user, referrer, referrals) = referred_pair();
        let ctx = ReferrerContext {
            referrer: &referrer,
            referrals: &referrals,
        };
        let settlement = settle_completion(&user, &task(RewardType::Credits, 5), Some(ctx), &rewards());
        let outcome = SettlementOutcome::from(&settlement);

        assert_eq!(outcome.balances.credits, 15);
        assert_eq!(outcome.referrer_bonus, Some(50));
        assert_eq!(outcome.referrals.map(|r| r.len()), Some(2));
    }

    #[test]
    fn outcome_omits_referrals_when_none_changed() {
        let (user, referrer, mut referrals) = referred_pair();
        referrals.pop();
        let ctx = ReferrerContext {
            referrer: &referrer,
            referrals: &referrals,
        };
        let settlement = settle_completion(&user, &task(RewardType::Credits, 5), Some(ctx), &rewards());
        let outcome = SettlementOutcome::from(&settlement);

        assert_eq!(outcome.referrer_bonus, Some(50));
        assert_eq!(outcome.referrals, None);
    }

    fn reward_type() -> impl Strategy<Value = RewardType> {
        prop_oneof![
            Just(RewardType::Credits),
            Just(RewardType::Data),
            Just(RewardType::Airtime),
        ]
    }

    proptest! {
        #[test]
        fn prop_reward_lands_in_matching_balance(
            kind in reward_type(),
            amount in 0i64..1_000_000,
            credits in 0i64..1_000_000,
            completed in 0u64..100,
        ) {
            let mut user = User::new(UserId::from("u1"), "Bola").with_credits(credits);
            user.tasks_completed = completed;
            let settlement = settle_completion(&user, &task(kind, amount), None, &rewards());

            prop_assert_eq!(settlement.user.tasks_completed, completed + 1);
            match kind {
                RewardType::Credits => {
                    prop_assert_eq!(settlement.user.credits, credits + amount);
                    prop_assert_eq!(settlement.transaction.map(|t| t.amount), Some(amount));
                }
                RewardType::Data => {
                    prop_assert_eq!(settlement.user.data_balance_mb, amount);
                    prop_assert_eq!(settlement.user.credits, credits);
                    prop_assert!(settlement.transaction.is_none());
                }
                RewardType::Airtime => {
                    prop_assert_eq!(settlement.user.airtime_balance_ngn, Decimal::from(amount));
                    prop_assert_eq!(settlement.user.credits, credits);
                    prop_assert!(settlement.transaction.is_none());
                }
            }
        }

        #[test]
        fn prop_bonus_only_on_first_completion(
            kind in reward_type(),
            completed in 0u64..5,
            bonus in 0i64..1_000,
        ) {
            let (mut user, referrer, referrals) = referred_pair();
            user.tasks_completed = completed;
            let ctx = ReferrerContext { referrer: &referrer, referrals: &referrals };
            let rewards = ReferralRewards { first_task: bonus, signup: 0 };
            let settlement = settle_completion(&user, &task(kind, 1), Some(ctx), &rewards);

            if completed == 0 {
                let paid = settlement.referrer_bonus.map(|b| b.referrer.credits);
                prop_assert_eq!(paid, Some(referrer.credits + bonus));
            } else {
                prop_assert!(settlement.referrer_bonus.is_none());
            }
        }
    }
}
