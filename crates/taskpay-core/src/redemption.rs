//! Redemption request lifecycle
//!
//! `pending -> completed` or `pending -> rejected`. The balance is debited
//! when the request is made; a rejection refunds the requested amount in full.

use crate::config::MinRedemption;
use crate::error::LedgerError;
use crate::types::{Notification, NotificationKind, RedemptionId, User, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Redemption state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    Pending,
    Completed,
    Rejected,
}

impl RedemptionStatus {
    /// No transition leaves this state
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }
}

/// What is being cashed out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RedemptionRequest {
    Data { megabytes: i64 },
    Airtime { naira: Decimal },
}

impl std::fmt::Display for RedemptionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data { megabytes } => write!(f, "{megabytes}MB of data"),
            Self::Airtime { naira } => write!(f, "NGN {naira} of airtime"),
        }
    }
}

/// A cash-out request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub id: RedemptionId,
    pub user_id: UserId,
    pub request: RedemptionRequest,
    /// Line the data or airtime is sent to
    pub phone_number: String,
    pub status: RedemptionStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Redemption {
    /// Create a pending redemption
    #[must_use]
    pub fn new(user_id: UserId, request: RedemptionRequest, phone_number: impl Into<String>) -> Self {
        Self {
            id: RedemptionId::new(),
            user_id,
            request,
            phone_number: phone_number.into(),
            status: RedemptionStatus::Pending,
            requested_at: Utc::now(),
            resolved_at: None,
        }
    }
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: RedemptionStatus) -> Vec<RedemptionStatus> {
    use RedemptionStatus::{Completed, Pending, Rejected};
    match from {
        Pending => vec![Completed, Rejected],
        Completed | Rejected => vec![],
    }
}

/// Validates a redemption state transition.
///
/// # Errors
/// `LedgerError::InvalidTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: RedemptionStatus, to: RedemptionStatus) -> Result<(), LedgerError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(LedgerError::invalid_transition(from, to))
    }
}

/// Debit `user` for a new request.
///
/// # Errors
/// - `LedgerError::BelowMinimum` for non-positive or too-small requests
/// - `LedgerError::InsufficientBalance` if the matching balance is short
pub fn debit(user: &User, request: &RedemptionRequest, min: &MinRedemption) -> Result<User, LedgerError> {
    let mut updated = user.clone();
    match *request {
        RedemptionRequest::Data { megabytes } => {
            if megabytes <= 0 || megabytes < min.data_mb {
                return Err(LedgerError::BelowMinimum {
                    requested: format!("{megabytes}MB"),
                    minimum: format!("{}MB", min.data_mb),
                });
            }
            if user.data_balance_mb < megabytes {
                return Err(LedgerError::InsufficientBalance {
                    balance: "data",
                    requested: megabytes.to_string(),
                    available: user.data_balance_mb.to_string(),
                });
            }
            updated.data_balance_mb -= megabytes;
        }
        RedemptionRequest::Airtime { naira } => {
            if naira <= Decimal::ZERO || naira < min.airtime_ngn {
                return Err(LedgerError::BelowMinimum {
                    requested: format!("NGN {naira}"),
                    minimum: format!("NGN {}", min.airtime_ngn),
                });
            }
            if user.airtime_balance_ngn < naira {
                return Err(LedgerError::InsufficientBalance {
                    balance: "airtime",
                    requested: naira.to_string(),
                    available: user.airtime_balance_ngn.to_string(),
                });
            }
            updated.airtime_balance_ngn -= naira;
        }
    }
    Ok(updated)
}

/// Result of moving a redemption out of `pending`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub redemption: Redemption,
    /// Set only on rejection, with the refund applied
    pub refunded_user: Option<User>,
    pub notification: Notification,
}

/// Resolve a pending redemption owned by `user`.
///
/// Rejection refunds the requested amount verbatim, regardless of what
/// happened to the balance since the request.
///
/// # Errors
/// `LedgerError::InvalidTransition` if the redemption is not pending or
/// `target` is `pending`
pub fn resolve(
    user: &User,
    redemption: &Redemption,
    target: RedemptionStatus,
) -> Result<Resolution, LedgerError> {
    validate_transition(redemption.status, target)?;

    let mut resolved = redemption.clone();
    resolved.status = target;
    resolved.resolved_at = Some(Utc::now());

    let (refunded_user, notification) = match target {
        RedemptionStatus::Completed => {
            let note = Notification::new(
                user.id.clone(),
                NotificationKind::Success,
                format!("Your redemption of {} has been sent", redemption.request),
            );
            (None, note)
        }
        _ => {
            let mut refunded = user.clone();
            match redemption.request {
                RedemptionRequest::Data { megabytes } => {
                    refunded.data_balance_mb = refunded.data_balance_mb.saturating_add(megabytes);
                }
                RedemptionRequest::Airtime { naira } => refunded.airtime_balance_ngn += naira,
            }
            let note = Notification::new(
                user.id.clone(),
                NotificationKind::Warning,
                format!(
                    "Your redemption of {} was rejected and the amount refunded",
                    redemption.request
                ),
            );
            (Some(refunded), note)
        }
    };

    Ok(Resolution {
        redemption: resolved,
        refunded_user,
        notification,
    })
}
