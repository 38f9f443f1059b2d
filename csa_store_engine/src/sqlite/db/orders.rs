//! Order rows and the cart-to-order conversion the close job drives.

use chrono::NaiveDate;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderItem, ReportLine},
    traits::{OrderError, StockDecrement},
};

pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO orders (user_id, order_time, drop_site, home_delivery, ship_first_name, ship_last_name,
            ship_address, ship_city, ship_zip, ship_phone, shipping_instructions, allow_substitutions,
            no_plastic_bags, attending_dinner, item_total, discount_total, shipping_total, total, discount_code)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        RETURNING *
        "#,
    )
    .bind(order.user_id)
    .bind(order.order_time)
    .bind(&order.drop_site)
    .bind(order.home_delivery)
    .bind(&order.ship_first_name)
    .bind(&order.ship_last_name)
    .bind(&order.ship_address)
    .bind(&order.ship_city)
    .bind(&order.ship_zip)
    .bind(&order.ship_phone)
    .bind(&order.shipping_instructions)
    .bind(order.allow_substitutions)
    .bind(order.no_plastic_bags)
    .bind(order.attending_dinner)
    .bind(order.item_total)
    .bind(order.discount_total)
    .bind(order.shipping_total)
    .bind(order.total)
    .bind(&order.discount_code)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn insert_order_item(
    order_id: i64,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, OrderError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO order_items (order_id, sku, description, category, vendor, vendor_price, unit_price, quantity,
            total_price, in_inventory, is_frozen)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(&item.sku)
    .bind(&item.description)
    .bind(&item.category)
    .bind(&item.vendor)
    .bind(item.vendor_price)
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(item.total_price)
    .bind(item.in_inventory)
    .bind(item.is_frozen)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Consume stock from a bounded (vendor, variation) row, clamping at zero. Unlimited rows are untouched.
pub async fn decrement_stock(dec: &StockDecrement, conn: &mut SqliteConnection) -> Result<(), OrderError> {
    sqlx::query(
        r#"
        UPDATE vendor_variations SET num_in_stock = MAX(num_in_stock - $1, 0)
        WHERE variation_id = $2 AND vendor_id = $3 AND num_in_stock IS NOT NULL
        "#,
    )
    .bind(dec.quantity)
    .bind(dec.variation_id)
    .bind(dec.vendor_id)
    .execute(conn)
    .await?;
    debug!("🧾️ Consumed {} units of variation {} from vendor {}", dec.quantity, dec.variation_id, dec.vendor_id);
    Ok(())
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, OrderError> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn orders_for_date(date: NaiveDate, conn: &mut SqliteConnection) -> Result<Vec<Order>, OrderError> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE date(order_time) = $1 ORDER BY id")
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn report_lines_for_date(
    date: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<Vec<ReportLine>, OrderError> {
    let lines = sqlx::query_as(
        r#"
        SELECT
            o.id AS order_id,
            o.user_id AS user_id,
            o.order_time AS order_time,
            COALESCE(o.ship_first_name, m.first_name) AS first_name,
            COALESCE(o.ship_last_name, m.last_name) AS last_name,
            o.drop_site AS drop_site,
            o.home_delivery AS home_delivery,
            o.ship_city AS city,
            o.ship_zip AS zip,
            o.ship_address AS address,
            o.ship_phone AS phone,
            o.shipping_instructions AS shipping_instructions,
            oi.sku AS sku,
            oi.description AS description,
            oi.category AS category,
            oi.vendor AS vendor,
            oi.vendor_price AS vendor_price,
            oi.unit_price AS unit_price,
            oi.quantity AS quantity,
            oi.total_price AS total_price,
            oi.in_inventory AS in_inventory,
            oi.is_frozen AS is_frozen
        FROM order_items oi
        JOIN orders o ON oi.order_id = o.id
        JOIN member_profiles m ON o.user_id = m.user_id
        WHERE date(o.order_time) = $1
        ORDER BY o.id, oi.id
        "#,
    )
    .bind(date.format("%Y-%m-%d").to_string())
    .fetch_all(conn)
    .await?;
    Ok(lines)
}
