//! Spending credits on generations

use crate::config::GenerationCosts;
use crate::error::LedgerError;
use crate::types::{CreditTransaction, GenerationKind, User};

/// Charge `user` for one generation of `kind`.
///
/// # Errors
/// `LedgerError::InsufficientBalance` if credits do not cover the price
pub fn charge_generation(
    user: &User,
    kind: GenerationKind,
    costs: &GenerationCosts,
) -> Result<(User, CreditTransaction), LedgerError> {
    let cost = costs.cost_of(kind);
    if user.credits < cost {
        return Err(LedgerError::InsufficientBalance {
            balance: "credits",
            requested: cost.to_string(),
            available: user.credits.to_string(),
        });
    }

    let mut updated = user.clone();
    updated.credits -= cost;
    let tx = CreditTransaction::new(user.id.clone(), format!("Generation: {kind}"), -cost);
    Ok((updated, tx))
}
