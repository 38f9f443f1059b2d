//! Discount codes and their product/category scopes.

use sqlx::SqliteConnection;

use crate::{db_types::DiscountCode, traits::DiscountError};

pub async fn fetch_discount_code(
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<DiscountCode>, DiscountError> {
    let row =
        sqlx::query_as("SELECT * FROM discount_codes WHERE code = $1").bind(code).fetch_optional(conn).await?;
    Ok(row)
}

pub async fn upsert_discount_code(
    code: DiscountCode,
    conn: &mut SqliteConnection,
) -> Result<DiscountCode, DiscountError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO discount_codes (code, active, valid_from, valid_to, free_shipping, min_purchase, deduct,
            percent, target_total, uses_remaining)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (code) DO UPDATE SET
            active = excluded.active,
            valid_from = excluded.valid_from,
            valid_to = excluded.valid_to,
            free_shipping = excluded.free_shipping,
            min_purchase = excluded.min_purchase,
            deduct = excluded.deduct,
            percent = excluded.percent,
            target_total = excluded.target_total,
            uses_remaining = excluded.uses_remaining
        RETURNING *
        "#,
    )
    .bind(&code.code)
    .bind(code.active)
    .bind(code.valid_from)
    .bind(code.valid_to)
    .bind(code.free_shipping)
    .bind(code.min_purchase)
    .bind(code.deduct)
    .bind(code.percent)
    .bind(code.target_total)
    .bind(code.uses_remaining)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn set_scope_products(
    code_id: i64,
    product_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<(), DiscountError> {
    sqlx::query("DELETE FROM discount_code_products WHERE code_id = $1")
        .bind(code_id)
        .execute(&mut *conn)
        .await?;
    for product_id in product_ids {
        sqlx::query("INSERT INTO discount_code_products (code_id, product_id) VALUES ($1, $2)")
            .bind(code_id)
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn set_scope_categories(
    code_id: i64,
    category_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<(), DiscountError> {
    sqlx::query("DELETE FROM discount_code_categories WHERE code_id = $1")
        .bind(code_id)
        .execute(&mut *conn)
        .await?;
    for category_id in category_ids {
        sqlx::query("INSERT INTO discount_code_categories (code_id, category_id) VALUES ($1, $2)")
            .bind(code_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// The SKUs the code is scoped to: variations of its own products, plus variations of every product in its
/// categories. An empty result means the code is unscoped.
pub async fn discount_scope_skus(code_id: i64, conn: &mut SqliteConnection) -> Result<Vec<String>, DiscountError> {
    let skus = sqlx::query_scalar(
        r#"
        SELECT DISTINCT pv.sku
        FROM product_variations pv
        WHERE pv.product_id IN (
            SELECT product_id FROM discount_code_products WHERE code_id = $1
            UNION
            SELECT pc.product_id FROM product_categories pc
            JOIN discount_code_categories dcc ON dcc.category_id = pc.category_id
            WHERE dcc.code_id = $1
        )
        ORDER BY pv.sku
        "#,
    )
    .bind(code_id)
    .fetch_all(conn)
    .await?;
    Ok(skus)
}

pub async fn decrement_uses(code_id: i64, conn: &mut SqliteConnection) -> Result<(), DiscountError> {
    sqlx::query(
        r#"
        UPDATE discount_codes SET uses_remaining = uses_remaining - 1
        WHERE id = $1 AND uses_remaining IS NOT NULL AND uses_remaining > 0
        "#,
    )
    .bind(code_id)
    .execute(conn)
    .await?;
    Ok(())
}
