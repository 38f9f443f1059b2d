//! Catalog rows: vendors, categories, products, variations and the stock edges between them.

use std::collections::HashMap;

use log::debug;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        Category,
        NewProduct,
        NewVariation,
        NewVendor,
        Product,
        ProductVariation,
        VariationInfo,
        Vendor,
        VendorVariation,
    },
    helpers::PackKeyInfo,
    traits::CatalogError,
};

pub async fn upsert_vendor(vendor: NewVendor, conn: &mut SqliteConnection) -> Result<Vendor, CatalogError> {
    let vendor = sqlx::query_as(
        r#"
        INSERT INTO vendors (title, email, auto_send_order) VALUES ($1, $2, $3)
        ON CONFLICT (title) DO UPDATE SET email = excluded.email, auto_send_order = excluded.auto_send_order
        RETURNING *
        "#,
    )
    .bind(vendor.title)
    .bind(vendor.email)
    .bind(vendor.auto_send_order)
    .fetch_one(conn)
    .await?;
    Ok(vendor)
}

pub async fn fetch_vendor(vendor_id: i64, conn: &mut SqliteConnection) -> Result<Option<Vendor>, CatalogError> {
    let vendor = sqlx::query_as("SELECT * FROM vendors WHERE id = $1").bind(vendor_id).fetch_optional(conn).await?;
    Ok(vendor)
}

pub async fn fetch_vendors(conn: &mut SqliteConnection) -> Result<Vec<Vendor>, CatalogError> {
    let vendors = sqlx::query_as("SELECT * FROM vendors ORDER BY title").fetch_all(conn).await?;
    Ok(vendors)
}

pub async fn fetch_or_create_category(title: &str, conn: &mut SqliteConnection) -> Result<Category, CatalogError> {
    let existing: Option<Category> =
        sqlx::query_as("SELECT * FROM categories WHERE title = $1").bind(title).fetch_optional(&mut *conn).await?;
    if let Some(cat) = existing {
        return Ok(cat);
    }
    let cat = sqlx::query_as("INSERT INTO categories (title) VALUES ($1) RETURNING *")
        .bind(title)
        .fetch_one(conn)
        .await?;
    Ok(cat)
}

pub async fn upsert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, CatalogError> {
    let row: Product = sqlx::query_as(
        r#"
        INSERT INTO products (title, slug, available, in_inventory, weekly_inventory, is_dairy, order_on_invoice)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (slug) DO UPDATE SET
            title = excluded.title,
            available = excluded.available,
            in_inventory = excluded.in_inventory,
            weekly_inventory = excluded.weekly_inventory,
            is_dairy = excluded.is_dairy,
            order_on_invoice = excluded.order_on_invoice
        RETURNING *
        "#,
    )
    .bind(&product.title)
    .bind(&product.slug)
    .bind(product.available)
    .bind(product.in_inventory)
    .bind(product.weekly_inventory)
    .bind(product.is_dairy)
    .bind(product.order_on_invoice)
    .fetch_one(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM product_categories WHERE product_id = $1").bind(row.id).execute(&mut *conn).await?;
    for title in &product.categories {
        let cat = fetch_or_create_category(title, &mut *conn).await?;
        sqlx::query("INSERT INTO product_categories (product_id, category_id) VALUES ($1, $2)")
            .bind(row.id)
            .bind(cat.id)
            .execute(&mut *conn)
            .await?;
    }
    debug!("🥬️ Upserted product {} ({})", row.title, row.slug);
    Ok(row)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, CatalogError> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn upsert_variation(
    variation: NewVariation,
    conn: &mut SqliteConnection,
) -> Result<ProductVariation, CatalogError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO product_variations (product_id, sku, title, unit_price, vendor_price, is_frozen, extra_percent,
            is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (sku) DO UPDATE SET
            product_id = excluded.product_id,
            title = excluded.title,
            unit_price = excluded.unit_price,
            vendor_price = excluded.vendor_price,
            is_frozen = excluded.is_frozen,
            extra_percent = excluded.extra_percent,
            is_default = excluded.is_default
        RETURNING *
        "#,
    )
    .bind(variation.product_id)
    .bind(&variation.sku)
    .bind(&variation.title)
    .bind(variation.unit_price)
    .bind(variation.vendor_price)
    .bind(variation.is_frozen)
    .bind(variation.extra_percent)
    .bind(variation.is_default)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn set_vendor_stock(
    variation_id: i64,
    vendor_id: i64,
    num_in_stock: Option<i64>,
    rank: i64,
    conn: &mut SqliteConnection,
) -> Result<VendorVariation, CatalogError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO vendor_variations (variation_id, vendor_id, num_in_stock, rank) VALUES ($1, $2, $3, $4)
        ON CONFLICT (variation_id, vendor_id) DO UPDATE SET num_in_stock = excluded.num_in_stock,
            rank = excluded.rank
        RETURNING *
        "#,
    )
    .bind(variation_id)
    .bind(vendor_id)
    .bind(num_in_stock)
    .bind(rank)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn vendor_variations(
    variation_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<VendorVariation>, CatalogError> {
    let rows = sqlx::query_as("SELECT * FROM vendor_variations WHERE variation_id = $1 ORDER BY rank, id")
        .bind(variation_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

async fn assemble_info(
    variation: ProductVariation,
    conn: &mut SqliteConnection,
) -> Result<Option<VariationInfo>, CatalogError> {
    let Some(product) = fetch_product(variation.product_id, &mut *conn).await? else {
        return Ok(None);
    };
    let categories = sqlx::query_as(
        r#"
        SELECT c.* FROM categories c
        JOIN product_categories pc ON pc.category_id = c.id
        WHERE pc.product_id = $1
        ORDER BY c.id
        "#,
    )
    .bind(product.id)
    .fetch_all(conn)
    .await?;
    Ok(Some(VariationInfo { variation, product, categories }))
}

pub async fn variation_by_sku(sku: &str, conn: &mut SqliteConnection) -> Result<Option<VariationInfo>, CatalogError> {
    let variation: Option<ProductVariation> =
        sqlx::query_as("SELECT * FROM product_variations WHERE sku = $1").bind(sku).fetch_optional(&mut *conn).await?;
    match variation {
        Some(v) => assemble_info(v, conn).await,
        None => Ok(None),
    }
}

pub async fn variation_by_id(
    variation_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<VariationInfo>, CatalogError> {
    let variation: Option<ProductVariation> = sqlx::query_as("SELECT * FROM product_variations WHERE id = $1")
        .bind(variation_id)
        .fetch_optional(&mut *conn)
        .await?;
    match variation {
        Some(v) => assemble_info(v, conn).await,
        None => Ok(None),
    }
}

/// Flip availability. Returns the ids of the product's variations for cart eviction.
pub async fn set_product_available(
    product_id: i64,
    available: bool,
    conn: &mut SqliteConnection,
) -> Result<Vec<i64>, CatalogError> {
    let res =
        sqlx::query("UPDATE products SET available = $1 WHERE id = $2").bind(available).bind(product_id).execute(&mut *conn).await?;
    if res.rows_affected() == 0 {
        return Err(CatalogError::ProductNotFound(product_id));
    }
    let ids = sqlx::query_scalar("SELECT id FROM product_variations WHERE product_id = $1 ORDER BY id")
        .bind(product_id)
        .fetch_all(conn)
        .await?;
    Ok(ids)
}

/// Pack-sort inputs for the given SKUs: the product's own invoice weight, plus the weight of its first
/// category and of that category's parent.
pub async fn pack_keys(
    skus: &[String],
    conn: &mut SqliteConnection,
) -> Result<HashMap<String, PackKeyInfo>, CatalogError> {
    if skus.is_empty() {
        return Ok(HashMap::new());
    }
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT
            pv.sku,
            p.order_on_invoice,
            (SELECT c.order_on_invoice FROM categories c
             JOIN product_categories pc ON pc.category_id = c.id
             WHERE pc.product_id = p.id ORDER BY c.id LIMIT 1) AS category_order,
            (SELECT parent.order_on_invoice FROM categories c
             JOIN product_categories pc ON pc.category_id = c.id
             JOIN categories parent ON c.parent_id = parent.id
             WHERE pc.product_id = p.id ORDER BY c.id LIMIT 1) AS parent_order
        FROM product_variations pv
        JOIN products p ON pv.product_id = p.id
        WHERE pv.sku IN (
        "#,
    );
    let mut separated = builder.separated(", ");
    for sku in skus {
        separated.push_bind(sku);
    }
    separated.push_unseparated(")");
    let rows: Vec<(String, Option<f64>, Option<f64>, Option<f64>)> =
        builder.build_query_as().fetch_all(conn).await?;
    let map = rows
        .into_iter()
        .map(|(sku, order_on_invoice, category_order, parent_order)| {
            (sku, PackKeyInfo { order_on_invoice, category_order, parent_order })
        })
        .collect();
    Ok(map)
}
