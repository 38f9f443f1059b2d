//! Budget aggregates and the per-user cached remaining balance.

use csa_common::Money;
use sqlx::SqliteConnection;

use crate::{db_types::ledger_epoch, traits::LedgerError};

/// Sum of settled payments. Credits count; pending charges do not.
pub async fn payments_total(user_id: i64, conn: &mut SqliteConnection) -> Result<Money, LedgerError> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE user_id = $1 AND pending = 0")
            .bind(user_id)
            .fetch_one(conn)
            .await?;
    Ok(Money::from_cents(total))
}

pub async fn orders_total(user_id: i64, conn: &mut SqliteConnection) -> Result<Money, LedgerError> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(total), 0) FROM orders WHERE user_id = $1 AND order_time >= $2")
            .bind(user_id)
            .bind(ledger_epoch())
            .fetch_one(conn)
            .await?;
    Ok(Money::from_cents(total))
}

/// The cached balance, or `None` when no row exists, the row is dirty, or no value was ever written.
pub async fn cached_remaining(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Money>, LedgerError> {
    let row: Option<(Option<i64>, bool)> =
        sqlx::query_as("SELECT remaining, dirty FROM budget_cache WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    let value = match row {
        Some((Some(remaining), false)) => Some(Money::from_cents(remaining)),
        _ => None,
    };
    Ok(value)
}

pub async fn write_cached_remaining(
    user_id: i64,
    remaining: Money,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO budget_cache (user_id, remaining, dirty, updated_at) VALUES ($1, $2, 0, CURRENT_TIMESTAMP)
        ON CONFLICT (user_id) DO UPDATE SET remaining = excluded.remaining, dirty = 0,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .bind(remaining)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_budget_dirty(user_id: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO budget_cache (user_id, remaining, dirty, updated_at) VALUES ($1, NULL, 1, CURRENT_TIMESTAMP)
        ON CONFLICT (user_id) DO UPDATE SET dirty = 1, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}
