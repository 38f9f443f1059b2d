use chrono::{DateTime, Utc};
use csa_common::Money;
use thiserror::Error;

use crate::db_types::{NewPayment, Payment};

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A payment for user {user_id} of {amount} at {payment_date} already exists")]
    DuplicatePayment { user_id: i64, amount: Money, payment_date: DateTime<Utc> },
    #[error("No member profile for gateway customer {0}")]
    UnknownCustomer(String),
}

impl From<sqlx::Error> for PaymentError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// The outcome of settling a charge against the ledger.
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub payment: Payment,
    /// False when the event was a replay and nothing changed.
    pub newly_settled: bool,
    /// True when this is the user's first settled, non-credit payment.
    pub first_payment: bool,
}

#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone {
    /// Insert a payment record. (user, amount, payment_date) is the idempotency key; a second insert with
    /// the same key fails with [`PaymentError::DuplicatePayment`]. Marks the user's budget dirty.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentError>;

    /// Settle a charge. A pending payment matching the charge id (or, failing that, the (user, amount)
    /// pair) transitions to settled in place, preserving its record identity and pending-time date.
    /// Without a pending predecessor a fresh settled payment is inserted at `event_time`. Replays of an
    /// already-settled charge change nothing.
    async fn settle_payment(
        &self,
        user_id: i64,
        amount: Money,
        charge_id: &str,
        event_time: DateTime<Utc>,
    ) -> Result<SettledPayment, PaymentError>;

    async fn fetch_payments_for_user(&self, user_id: i64) -> Result<Vec<Payment>, PaymentError>;
}
