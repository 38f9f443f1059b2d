//! Read-through access to the member budget ledger.

use csa_common::Money;
use log::trace;

use crate::traits::{BudgetLedger, CartManagement, LedgerError};

/// The settled part of the balance: payments in, orders out. This is the slow aggregate the cache covers;
/// the live cart total is subtracted on top of it at read time.
pub async fn settled_balance<B>(db: &B, user_id: i64) -> Result<Money, LedgerError>
where B: BudgetLedger {
    if let Some(cached) = db.cached_remaining(user_id).await? {
        return Ok(cached);
    }
    let payments = db.payments_total(user_id).await?;
    let orders = db.orders_total(user_id).await?;
    let balance = payments - orders;
    db.write_cached_remaining(user_id, balance).await?;
    trace!("📈️ Recomputed settled balance for user {user_id}: {balance}");
    Ok(balance)
}

/// What the member can still spend this period: settled balance minus what their cart already holds.
pub async fn remaining_budget<B>(db: &B, user_id: i64) -> Result<Money, LedgerError>
where B: BudgetLedger + CartManagement {
    let balance = settled_balance(db, user_id).await?;
    let carted = db
        .cart_lines(user_id)
        .await
        .map_err(|e| LedgerError::DatabaseError(e.to_string()))?
        .iter()
        .map(|l| l.total_price())
        .sum();
    Ok(balance - carted)
}

pub struct LedgerApi<B> {
    db: B,
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> LedgerApi<B>
where B: BudgetLedger + CartManagement
{
    pub async fn remaining_budget(&self, user_id: i64) -> Result<Money, LedgerError> {
        remaining_budget(&self.db, user_id).await
    }

    pub async fn payments_total(&self, user_id: i64) -> Result<Money, LedgerError> {
        self.db.payments_total(user_id).await
    }

    pub async fn orders_total(&self, user_id: i64) -> Result<Money, LedgerError> {
        self.db.orders_total(user_id).await
    }
}
