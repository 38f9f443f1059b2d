//! Payment records and the settle state machine for gateway charge events.

use chrono::{DateTime, Utc};
use csa_common::Money;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment},
    sqlite::db::ledger,
    traits::{PaymentError, SettledPayment},
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, PaymentError> {
    let result = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (user_id, payment_date, amount, pending, is_credit, charge_id, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(payment.user_id)
    .bind(payment.payment_date)
    .bind(payment.amount)
    .bind(payment.pending)
    .bind(payment.is_credit)
    .bind(&payment.charge_id)
    .bind(&payment.notes)
    .fetch_one(&mut *conn)
    .await;
    let row = match result {
        Ok(row) => row,
        Err(e) if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false) => {
            return Err(PaymentError::DuplicatePayment {
                user_id: payment.user_id,
                amount: payment.amount,
                payment_date: payment.payment_date,
            });
        },
        Err(e) => return Err(e.into()),
    };
    ledger::mark_budget_dirty(row.user_id, conn).await.map_err(|e| PaymentError::DatabaseError(e.to_string()))?;
    debug!("💰️ Recorded {} payment of {} for user {}", if row.pending { "pending" } else { "settled" }, row.amount, row.user_id);
    Ok(row)
}

async fn count_settled_charges(user_id: i64, conn: &mut SqliteConnection) -> Result<i64, PaymentError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM payments WHERE user_id = $1 AND pending = 0 AND is_credit = 0",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Settle a gateway charge. See the trait docs for the matching rules; the short version is: a pending
/// predecessor settles in place, a replay is a no-op, anything else becomes a fresh settled row.
pub async fn settle_payment(
    user_id: i64,
    amount: Money,
    charge_id: &str,
    event_time: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<SettledPayment, PaymentError> {
    // A pending payment already tagged with this charge id wins outright.
    let mut pending: Option<Payment> =
        sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 AND pending = 1 AND charge_id = $2")
            .bind(user_id)
            .bind(charge_id)
            .fetch_optional(&mut *conn)
            .await?;
    if pending.is_none() {
        // Fall back to the oldest pending payment of the same amount.
        pending = sqlx::query_as(
            r#"
            SELECT * FROM payments WHERE user_id = $1 AND pending = 1 AND amount = $2 AND charge_id IS NULL
            ORDER BY payment_date, id LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await?;
    }
    if let Some(p) = pending {
        let payment: Payment =
            sqlx::query_as("UPDATE payments SET pending = 0, charge_id = $1 WHERE id = $2 RETURNING *")
                .bind(charge_id)
                .bind(p.id)
                .fetch_one(&mut *conn)
                .await?;
        ledger::mark_budget_dirty(user_id, &mut *conn)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;
        let first_payment = !payment.is_credit && count_settled_charges(user_id, conn).await? == 1;
        debug!("💰️ Settled pending payment {} ({}) for user {user_id}", payment.id, payment.amount);
        return Ok(SettledPayment { payment, newly_settled: true, first_payment });
    }
    // Replays of an already-settled charge change nothing.
    let settled: Option<Payment> =
        sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 AND pending = 0 AND charge_id = $2")
            .bind(user_id)
            .bind(charge_id)
            .fetch_optional(&mut *conn)
            .await?;
    if let Some(payment) = settled {
        trace!("💰️ Charge {charge_id} for user {user_id} was already settled; ignoring the replay");
        return Ok(SettledPayment { payment, newly_settled: false, first_payment: false });
    }
    let new_payment = NewPayment::new(user_id, amount, event_time).with_charge_id(charge_id);
    let payment = insert_payment(new_payment, &mut *conn).await?;
    let first_payment = count_settled_charges(user_id, conn).await? == 1;
    Ok(SettledPayment { payment, newly_settled: true, first_payment })
}

pub async fn fetch_payments_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, PaymentError> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 ORDER BY payment_date, id")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}
