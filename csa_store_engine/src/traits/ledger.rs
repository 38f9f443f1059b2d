use csa_common::Money;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// The authoritative aggregates behind `remaining_budget`, plus the per-user cached copy.
///
/// The cache is eventually consistent: every ledger mutation flips a dirty flag, and reads recompute
/// from the aggregates whenever the flag is set or no cached value exists.
#[allow(async_fn_in_trait)]
pub trait BudgetLedger: Clone {
    /// Sum of the user's settled (non-pending) payments, credits included.
    async fn payments_total(&self, user_id: i64) -> Result<Money, LedgerError>;

    /// Sum of the user's order totals since the ledger epoch.
    async fn orders_total(&self, user_id: i64) -> Result<Money, LedgerError>;

    /// The cached remaining budget, or `None` when absent or dirty.
    async fn cached_remaining(&self, user_id: i64) -> Result<Option<Money>, LedgerError>;

    async fn write_cached_remaining(&self, user_id: i64, remaining: Money) -> Result<(), LedgerError>;

    async fn mark_budget_dirty(&self, user_id: i64) -> Result<(), LedgerError>;
}
