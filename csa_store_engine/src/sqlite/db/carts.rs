//! Cart rows and the vendor-split allocation that backs them.

use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cart, CartItem, CartLine, CartVendorLine, VendorCartItem, EXTRA_ORDER_USER_ID},
    sqlite::db::catalog,
    traits::{CartError, ExtraOrderQuantity, VendorHolding},
};

pub async fn fetch_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Cart>, CartError> {
    let cart = sqlx::query_as("SELECT * FROM carts WHERE user_id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(cart)
}

pub async fn fetch_or_create_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<Cart, CartError> {
    if let Some(cart) = fetch_cart(user_id, &mut *conn).await? {
        return Ok(cart);
    }
    let cart = sqlx::query_as("INSERT INTO carts (user_id) VALUES ($1) RETURNING *")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    debug!("🛒️ Created cart for user {user_id}");
    Ok(cart)
}

pub async fn touch_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<(), CartError> {
    sqlx::query("UPDATE carts SET last_updated = CURRENT_TIMESTAMP WHERE id = $1").bind(cart_id).execute(conn).await?;
    Ok(())
}

pub async fn fetch_item(cart_item_id: i64, conn: &mut SqliteConnection) -> Result<Option<CartItem>, CartError> {
    let item =
        sqlx::query_as("SELECT * FROM cart_items WHERE id = $1").bind(cart_item_id).fetch_optional(conn).await?;
    Ok(item)
}

/// Fetch a cart item together with its owner's user id, for ownership checks on quantity updates.
pub async fn fetch_item_for_user(
    user_id: i64,
    cart_item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, CartError> {
    let item = sqlx::query_as(
        "SELECT ci.* FROM cart_items ci JOIN carts c ON ci.cart_id = c.id WHERE ci.id = $1 AND c.user_id = $2",
    )
    .bind(cart_item_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_or_create_item(
    cart_id: i64,
    variation_id: i64,
    conn: &mut SqliteConnection,
) -> Result<CartItem, CartError> {
    let existing: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 AND variation_id = $2")
            .bind(cart_id)
            .bind(variation_id)
            .fetch_optional(&mut *conn)
            .await?;
    if let Some(item) = existing {
        return Ok(item);
    }
    let item = sqlx::query_as("INSERT INTO cart_items (cart_id, variation_id) VALUES ($1, $2) RETURNING *")
        .bind(cart_id)
        .bind(variation_id)
        .fetch_one(conn)
        .await?;
    Ok(item)
}

/// The item's quantity is always the sum of its vendor splits.
pub async fn item_quantity(cart_item_id: i64, conn: &mut SqliteConnection) -> Result<i64, CartError> {
    let qty: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM vendor_cart_items WHERE cart_item_id = $1")
            .bind(cart_item_id)
            .fetch_one(conn)
            .await?;
    Ok(qty)
}

pub async fn vendor_items(cart_item_id: i64, conn: &mut SqliteConnection) -> Result<Vec<VendorCartItem>, CartError> {
    let items = sqlx::query_as("SELECT * FROM vendor_cart_items WHERE cart_item_id = $1 ORDER BY rank, id")
        .bind(cart_item_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// What every *other* cart item currently holds against this (vendor, variation) edge.
async fn holdings_elsewhere(
    variation_id: i64,
    vendor_id: i64,
    cart_item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, CartError> {
    let held: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(vci.quantity), 0)
        FROM vendor_cart_items vci
        JOIN cart_items ci ON vci.cart_item_id = ci.id
        WHERE ci.variation_id = $1 AND vci.vendor_id = $2 AND vci.cart_item_id != $3
        "#,
    )
    .bind(variation_id)
    .bind(vendor_id)
    .bind(cart_item_id)
    .fetch_one(conn)
    .await?;
    Ok(held)
}

async fn upsert_vendor_item(
    cart_item_id: i64,
    vendor_id: i64,
    quantity: i64,
    rank: i64,
    conn: &mut SqliteConnection,
) -> Result<(), CartError> {
    sqlx::query(
        r#"
        INSERT INTO vendor_cart_items (cart_item_id, vendor_id, quantity, rank) VALUES ($1, $2, $3, $4)
        ON CONFLICT (cart_item_id, vendor_id)
        DO UPDATE SET quantity = quantity + excluded.quantity, rank = excluded.rank
        "#,
    )
    .bind(cart_item_id)
    .bind(vendor_id)
    .bind(quantity)
    .bind(rank)
    .execute(conn)
    .await?;
    Ok(())
}

/// Split an increase of `delta` units across the variation's vendors in rank order, drawing each vendor
/// down to its live stock (bounded stock minus what other carts hold) before moving to the next.
///
/// The caller must run this inside a transaction: on [`CartError::NoStock`] /
/// [`CartError::NoStockQuantity`] partial splits have already been written and must be rolled back.
pub async fn allocate(
    cart_item_id: i64,
    variation_id: i64,
    sku: &str,
    delta: i64,
    conn: &mut SqliteConnection,
) -> Result<(), CartError> {
    let sequence = catalog::vendor_variations(variation_id, &mut *conn).await.map_err(|e| CartError::DatabaseError(e.to_string()))?;
    if sequence.is_empty() {
        return Err(CartError::NoStock(sku.to_string()));
    }
    let mut remaining = delta;
    for vv in &sequence {
        if remaining == 0 {
            break;
        }
        let take = match vv.num_in_stock {
            None => remaining,
            Some(stock) => {
                let held = holdings_elsewhere(variation_id, vv.vendor_id, cart_item_id, &mut *conn).await?;
                let live = (stock - held).max(0);
                remaining.min(live)
            },
        };
        if take > 0 {
            upsert_vendor_item(cart_item_id, vv.vendor_id, take, vv.rank, &mut *conn).await?;
            trace!("🛒️ Took {take} of {sku} from vendor {} (rank {})", vv.vendor_id, vv.rank);
            remaining -= take;
        }
    }
    if remaining > 0 {
        let available = delta - remaining;
        return Err(if available == 0 {
            CartError::NoStock(sku.to_string())
        } else {
            CartError::NoStockQuantity { sku: sku.to_string(), available }
        });
    }
    Ok(())
}

/// Like [`allocate`], but takes whatever is available instead of failing. Returns the quantity placed.
/// Used when re-running allocations after a stock change.
pub async fn allocate_up_to(
    cart_item_id: i64,
    variation_id: i64,
    want: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, CartError> {
    let sequence = catalog::vendor_variations(variation_id, &mut *conn).await.map_err(|e| CartError::DatabaseError(e.to_string()))?;
    let mut remaining = want;
    for vv in &sequence {
        if remaining == 0 {
            break;
        }
        let take = match vv.num_in_stock {
            None => remaining,
            Some(stock) => {
                let held = holdings_elsewhere(variation_id, vv.vendor_id, cart_item_id, &mut *conn).await?;
                remaining.min((stock - held).max(0))
            },
        };
        if take > 0 {
            upsert_vendor_item(cart_item_id, vv.vendor_id, take, vv.rank, &mut *conn).await?;
            remaining -= take;
        }
    }
    Ok(want - remaining)
}

/// Release `amount` units from the item, least-preferred vendors first. Splits that reach zero are deleted;
/// so is the item when it empties, and the cart when its last item goes.
pub async fn release(cart_item: &CartItem, amount: i64, conn: &mut SqliteConnection) -> Result<(), CartError> {
    let splits = sqlx::query_as::<_, VendorCartItem>(
        "SELECT * FROM vendor_cart_items WHERE cart_item_id = $1 ORDER BY rank DESC, id DESC",
    )
    .bind(cart_item.id)
    .fetch_all(&mut *conn)
    .await?;
    let mut remaining = amount;
    for split in splits {
        if remaining == 0 {
            break;
        }
        let dec = split.quantity.min(remaining);
        if dec == split.quantity {
            sqlx::query("DELETE FROM vendor_cart_items WHERE id = $1").bind(split.id).execute(&mut *conn).await?;
        } else {
            sqlx::query("UPDATE vendor_cart_items SET quantity = quantity - $1 WHERE id = $2")
                .bind(dec)
                .bind(split.id)
                .execute(&mut *conn)
                .await?;
        }
        remaining -= dec;
    }
    prune_item(cart_item, conn).await
}

/// Remove the item when it holds no quantity, and the cart when it holds no items.
pub async fn prune_item(cart_item: &CartItem, conn: &mut SqliteConnection) -> Result<(), CartError> {
    if item_quantity(cart_item.id, &mut *conn).await? == 0 {
        sqlx::query("DELETE FROM cart_items WHERE id = $1").bind(cart_item.id).execute(&mut *conn).await?;
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1")
            .bind(cart_item.cart_id)
            .fetch_one(&mut *conn)
            .await?;
        if left == 0 {
            sqlx::query("DELETE FROM carts WHERE id = $1").bind(cart_item.cart_id).execute(conn).await?;
            debug!("🛒️ Cart {} emptied out and was removed", cart_item.cart_id);
        }
    }
    Ok(())
}

const CART_LINE_SELECT: &str = r#"
    SELECT
        ci.id AS cart_item_id,
        c.user_id AS user_id,
        ci.variation_id AS variation_id,
        p.id AS product_id,
        pv.sku AS sku,
        CASE WHEN pv.title IS NULL THEN p.title ELSE p.title || ' - ' || pv.title END AS description,
        COALESCE((SELECT GROUP_CONCAT(cat.title, ';')
                  FROM product_categories pc JOIN categories cat ON cat.id = pc.category_id
                  WHERE pc.product_id = p.id), '') AS category,
        pv.unit_price AS unit_price,
        pv.vendor_price AS vendor_price,
        COALESCE((SELECT SUM(vci.quantity) FROM vendor_cart_items vci WHERE vci.cart_item_id = ci.id), 0) AS quantity,
        p.in_inventory AS in_inventory,
        pv.is_frozen AS is_frozen
    FROM cart_items ci
    JOIN carts c ON ci.cart_id = c.id
    JOIN product_variations pv ON ci.variation_id = pv.id
    JOIN products p ON pv.product_id = p.id
"#;

pub async fn cart_lines(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartLine>, CartError> {
    let sql = format!("{CART_LINE_SELECT} WHERE c.user_id = $1 ORDER BY ci.created_at, ci.id");
    let lines = sqlx::query_as(&sql).bind(user_id).fetch_all(conn).await?;
    Ok(lines)
}

pub async fn cart_vendor_lines(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartVendorLine>, CartError> {
    let lines = sqlx::query_as(
        r#"
        SELECT
            ci.id AS cart_item_id,
            ci.variation_id AS variation_id,
            vci.vendor_id AS vendor_id,
            pv.sku AS sku,
            CASE WHEN pv.title IS NULL THEN p.title ELSE p.title || ' - ' || pv.title END AS description,
            COALESCE((SELECT GROUP_CONCAT(cat.title, ';')
                      FROM product_categories pc JOIN categories cat ON cat.id = pc.category_id
                      WHERE pc.product_id = p.id), '') AS category,
            v.title AS vendor_title,
            pv.unit_price AS unit_price,
            pv.vendor_price AS vendor_price,
            vci.quantity AS quantity,
            p.in_inventory AS in_inventory,
            pv.is_frozen AS is_frozen,
            p.weekly_inventory AS weekly_inventory
        FROM vendor_cart_items vci
        JOIN cart_items ci ON vci.cart_item_id = ci.id
        JOIN carts c ON ci.cart_id = c.id
        JOIN vendors v ON vci.vendor_id = v.id
        JOIN product_variations pv ON ci.variation_id = pv.id
        JOIN products p ON pv.product_id = p.id
        WHERE c.user_id = $1
        ORDER BY ci.created_at, ci.id, vci.rank, vci.id
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

/// Cart items holding the given variation, oldest first. The order matters: it decides who keeps their
/// quantity when stock shrinks.
pub async fn items_for_variation(
    variation_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<(CartItem, i64)>, CartError> {
    let rows: Vec<(i64, i64, i64, chrono::DateTime<chrono::Utc>, i64)> = sqlx::query_as(
        r#"
        SELECT ci.id, ci.cart_id, ci.variation_id, ci.created_at, c.user_id
        FROM cart_items ci JOIN carts c ON ci.cart_id = c.id
        WHERE ci.variation_id = $1
        ORDER BY ci.created_at, ci.id
        "#,
    )
    .bind(variation_id)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, cart_id, variation_id, created_at, user_id)| {
            (CartItem { id, cart_id, variation_id, created_at }, user_id)
        })
        .collect())
}

pub async fn delete_vendor_items_for_item(cart_item_id: i64, conn: &mut SqliteConnection) -> Result<(), CartError> {
    sqlx::query("DELETE FROM vendor_cart_items WHERE cart_item_id = $1").bind(cart_item_id).execute(conn).await?;
    Ok(())
}

pub async fn clear_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<(), CartError> {
    sqlx::query(
        r#"
        DELETE FROM vendor_cart_items WHERE cart_item_id IN (
            SELECT ci.id FROM cart_items ci JOIN carts c ON ci.cart_id = c.id WHERE c.user_id = $1
        )"#,
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM carts WHERE user_id = $1").bind(user_id).execute(conn).await?;
    Ok(())
}

pub async fn clear_all_carts(conn: &mut SqliteConnection) -> Result<u64, CartError> {
    sqlx::query("DELETE FROM vendor_cart_items").execute(&mut *conn).await?;
    sqlx::query("DELETE FROM cart_items").execute(&mut *conn).await?;
    let res = sqlx::query("DELETE FROM carts").execute(conn).await?;
    Ok(res.rows_affected())
}

pub async fn set_attending_dinner(user_id: i64, count: i64, conn: &mut SqliteConnection) -> Result<(), CartError> {
    let cart = fetch_or_create_cart(user_id, &mut *conn).await?;
    sqlx::query("UPDATE carts SET attending_dinner = $1 WHERE id = $2")
        .bind(count)
        .bind(cart.id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Users with a non-empty cart, oldest cart first.
pub async fn carted_users(conn: &mut SqliteConnection) -> Result<Vec<i64>, CartError> {
    let users = sqlx::query_scalar(
        "SELECT c.user_id FROM carts c WHERE EXISTS (SELECT 1 FROM cart_items ci WHERE ci.cart_id = c.id) ORDER BY c.id",
    )
    .fetch_all(conn)
    .await?;
    Ok(users)
}

/// Carted quantity per vendor for one variation, summed over every cart. The close job uses this to see
/// which vendors still have live stock after the member orders are accounted for.
pub async fn vendor_holdings(variation_id: i64, conn: &mut SqliteConnection) -> Result<Vec<VendorHolding>, CartError> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT vci.vendor_id, COALESCE(SUM(vci.quantity), 0) AS held
        FROM vendor_cart_items vci
        JOIN cart_items ci ON vci.cart_item_id = ci.id
        WHERE ci.variation_id = $1
        GROUP BY vci.vendor_id
        "#,
    )
    .bind(variation_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(vendor_id, quantity)| VendorHolding { vendor_id, quantity }).collect())
}

/// Total carted quantity per variation carrying an over-order factor, across all member carts.
/// The synthetic extra cart itself is excluded so that reruns do not compound.
pub async fn extra_order_quantities(conn: &mut SqliteConnection) -> Result<Vec<ExtraOrderQuantity>, CartError> {
    let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT ci.variation_id, COALESCE(SUM(vci.quantity), 0) AS total, pv.extra_percent
        FROM cart_items ci
        JOIN carts c ON ci.cart_id = c.id
        JOIN product_variations pv ON ci.variation_id = pv.id
        LEFT JOIN vendor_cart_items vci ON vci.cart_item_id = ci.id
        WHERE pv.extra_percent > 0 AND c.user_id != $1
        GROUP BY ci.variation_id, pv.extra_percent
        ORDER BY ci.variation_id
        "#,
    )
    .bind(EXTRA_ORDER_USER_ID)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(variation_id, total_quantity, extra_percent)| ExtraOrderQuantity {
            variation_id,
            total_quantity,
            extra_percent,
        })
        .collect())
}
