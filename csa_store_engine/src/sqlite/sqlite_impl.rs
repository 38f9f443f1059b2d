//! The SQLite backend. `SqliteDatabase` is a thin wrapper over a connection pool; all the behaviour lives in
//! the trait implementations below, which compose the low-level functions from [`crate::sqlite::db`] into
//! atomic transactions.

use std::{collections::HashMap, fmt::Debug};

use chrono::{DateTime, Utc};
use csa_common::Money;
use log::debug;
use sqlx::SqlitePool;

use crate::{
    db_types::{
        AchStatus,
        Cart,
        CartItem,
        CartLine,
        CartVendorLine,
        DiscountCode,
        MemberProfile,
        NewOrder,
        NewOrderItem,
        NewPayment,
        NewProduct,
        NewVariation,
        NewVendor,
        Order,
        OrderItem,
        Payment,
        PaymentMethod,
        Product,
        ProductVariation,
        RemovedCartItem,
        ReportLine,
        StockShortfall,
        VariationInfo,
        Vendor,
        VendorVariation,
    },
    helpers::PackKeyInfo,
    sqlite::db::{self, carts, catalog, discounts, ledger, members, orders, payments},
    traits::{
        BudgetLedger,
        CartError,
        CartManagement,
        CatalogError,
        CatalogManagement,
        DiscountError,
        DiscountManagement,
        ExtraOrderQuantity,
        LedgerError,
        MemberError,
        MemberManagement,
        OrderError,
        OrderManagement,
        PaymentError,
        PaymentGatewayDatabase,
        SettledPayment,
        StockDecrement,
        VendorHolding,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase").field("url", &self.url).finish()
    }
}

impl SqliteDatabase {
    /// Connect using the URL from `CSA_DATABASE_URL`, or the default path.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db::db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = db::new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

//--------------------------------------   CartManagement    ---------------------------------------------------------

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, user_id: i64) -> Result<Option<Cart>, CartError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_cart(user_id, &mut conn).await
    }

    async fn add_to_cart(&self, user_id: i64, variation_id: i64, delta: i64) -> Result<CartItem, CartError> {
        if delta <= 0 {
            return Err(CartError::InvalidOptions(format!("quantity delta must be positive, got {delta}")));
        }
        let mut tx = self.pool.begin().await?;
        let info = catalog::variation_by_id(variation_id, &mut tx)
            .await
            .map_err(|e| CartError::DatabaseError(e.to_string()))?
            .filter(|info| info.product.available)
            .ok_or_else(|| CartError::InvalidOptions(format!("variation {variation_id} is not for sale")))?;
        let cart = carts::fetch_or_create_cart(user_id, &mut tx).await?;
        let item = carts::fetch_or_create_item(cart.id, variation_id, &mut tx).await?;
        // On a stock failure the transaction is dropped uncommitted, so any partial split (and a freshly
        // created item or cart) never lands.
        carts::allocate(item.id, variation_id, &info.variation.sku, delta, &mut tx).await?;
        carts::touch_cart(cart.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🛒️ User {user_id} added {delta} x {} to their cart", info.variation.sku);
        Ok(item)
    }

    async fn set_quantity(&self, user_id: i64, cart_item_id: i64, quantity: i64) -> Result<(), CartError> {
        if quantity < 0 {
            return Err(CartError::InvalidOptions(format!("quantity must be non-negative, got {quantity}")));
        }
        let mut tx = self.pool.begin().await?;
        let item = carts::fetch_item_for_user(user_id, cart_item_id, &mut tx)
            .await?
            .ok_or(CartError::ItemNotFound(cart_item_id))?;
        let current = carts::item_quantity(item.id, &mut tx).await?;
        if quantity > current {
            let info = catalog::variation_by_id(item.variation_id, &mut tx)
                .await
                .map_err(|e| CartError::DatabaseError(e.to_string()))?
                .ok_or_else(|| CartError::InvalidOptions(format!("variation {} is gone", item.variation_id)))?;
            carts::allocate(item.id, item.variation_id, &info.variation.sku, quantity - current, &mut tx).await?;
        } else if quantity < current {
            carts::release(&item, current - quantity, &mut tx).await?;
        }
        if carts::fetch_cart(user_id, &mut tx).await?.is_some() {
            carts::touch_cart(item.cart_id, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: i64) -> Result<(), CartError> {
        let mut tx = self.pool.begin().await?;
        carts::clear_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🛒️ Cleared cart for user {user_id}");
        Ok(())
    }

    async fn clear_all_carts(&self) -> Result<u64, CartError> {
        let mut tx = self.pool.begin().await?;
        let count = carts::clear_all_carts(&mut tx).await?;
        tx.commit().await?;
        debug!("🛒️ Cleared {count} carts");
        Ok(count)
    }

    async fn set_attending_dinner(&self, user_id: i64, count: i64) -> Result<(), CartError> {
        let mut tx = self.pool.begin().await?;
        carts::set_attending_dinner(user_id, count, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn cart_lines(&self, user_id: i64) -> Result<Vec<CartLine>, CartError> {
        let mut conn = self.pool.acquire().await?;
        carts::cart_lines(user_id, &mut conn).await
    }

    async fn cart_vendor_lines(&self, user_id: i64) -> Result<Vec<CartVendorLine>, CartError> {
        let mut conn = self.pool.acquire().await?;
        carts::cart_vendor_lines(user_id, &mut conn).await
    }

    async fn carted_users(&self) -> Result<Vec<i64>, CartError> {
        let mut conn = self.pool.acquire().await?;
        carts::carted_users(&mut conn).await
    }

    async fn extra_order_quantities(&self) -> Result<Vec<ExtraOrderQuantity>, CartError> {
        let mut conn = self.pool.acquire().await?;
        carts::extra_order_quantities(&mut conn).await
    }

    async fn vendor_holdings(&self, variation_id: i64) -> Result<Vec<VendorHolding>, CartError> {
        let mut conn = self.pool.acquire().await?;
        carts::vendor_holdings(variation_id, &mut conn).await
    }
}

//--------------------------------------  CatalogManagement  ---------------------------------------------------------

impl CatalogManagement for SqliteDatabase {
    async fn upsert_vendor(&self, vendor: NewVendor) -> Result<Vendor, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::upsert_vendor(vendor, &mut conn).await
    }

    async fn fetch_vendor(&self, vendor_id: i64) -> Result<Option<Vendor>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_vendor(vendor_id, &mut conn).await
    }

    async fn fetch_vendors(&self) -> Result<Vec<Vendor>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_vendors(&mut conn).await
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let result = catalog::upsert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn upsert_variation(&self, variation: NewVariation) -> Result<ProductVariation, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::upsert_variation(variation, &mut conn).await
    }

    async fn set_vendor_stock(
        &self,
        variation_id: i64,
        vendor_id: i64,
        num_in_stock: Option<i64>,
        rank: i64,
    ) -> Result<VendorVariation, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        if catalog::fetch_vendor(vendor_id, &mut conn).await?.is_none() {
            return Err(CatalogError::VendorNotFound(vendor_id));
        }
        catalog::set_vendor_stock(variation_id, vendor_id, num_in_stock, rank, &mut conn).await
    }

    async fn variation_by_sku(&self, sku: &str) -> Result<Option<VariationInfo>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::variation_by_sku(sku, &mut conn).await
    }

    async fn variation_by_id(&self, variation_id: i64) -> Result<Option<VariationInfo>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::variation_by_id(variation_id, &mut conn).await
    }

    async fn vendor_variations(&self, variation_id: i64) -> Result<Vec<VendorVariation>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::vendor_variations(variation_id, &mut conn).await
    }

    async fn set_product_available(&self, product_id: i64, available: bool) -> Result<Vec<i64>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::set_product_available(product_id, available, &mut conn).await
    }

    async fn reallocate_variation(&self, variation_id: i64) -> Result<Vec<StockShortfall>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let info = catalog::variation_by_id(variation_id, &mut tx)
            .await?
            .ok_or_else(|| CatalogError::InvalidOptions(format!("variation {variation_id} does not exist")))?;
        let holders =
            carts::items_for_variation(variation_id, &mut tx).await.map_err(db_err::<CatalogError>)?;
        // Record everyone's previous quantity and wipe all splits first, so that later carts' stale
        // holdings cannot constrain earlier ones during the re-run.
        let mut previous = Vec::with_capacity(holders.len());
        for (item, user_id) in &holders {
            let qty = carts::item_quantity(item.id, &mut tx).await.map_err(db_err::<CatalogError>)?;
            carts::delete_vendor_items_for_item(item.id, &mut tx).await.map_err(db_err::<CatalogError>)?;
            previous.push((item.clone(), *user_id, qty));
        }
        let mut shortfalls = Vec::new();
        for (item, user_id, qty) in previous {
            let placed =
                carts::allocate_up_to(item.id, variation_id, qty, &mut tx).await.map_err(db_err::<CatalogError>)?;
            if placed < qty {
                shortfalls.push(StockShortfall {
                    user_id,
                    variation_id,
                    sku: info.variation.sku.clone(),
                    description: info.description(),
                    previous_quantity: qty,
                    new_quantity: placed,
                });
            }
            carts::prune_item(&item, &mut tx).await.map_err(db_err::<CatalogError>)?;
        }
        tx.commit().await?;
        if !shortfalls.is_empty() {
            debug!("🥬️ Stock change on variation {variation_id} reduced {} carts", shortfalls.len());
        }
        Ok(shortfalls)
    }

    async fn remove_variations_from_carts(&self, variation_ids: &[i64]) -> Result<Vec<RemovedCartItem>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let mut removed = Vec::new();
        for &variation_id in variation_ids {
            let Some(info) = catalog::variation_by_id(variation_id, &mut tx).await? else {
                continue;
            };
            let holders =
                carts::items_for_variation(variation_id, &mut tx).await.map_err(db_err::<CatalogError>)?;
            for (item, user_id) in holders {
                let quantity = carts::item_quantity(item.id, &mut tx).await.map_err(db_err::<CatalogError>)?;
                carts::delete_vendor_items_for_item(item.id, &mut tx).await.map_err(db_err::<CatalogError>)?;
                carts::prune_item(&item, &mut tx).await.map_err(db_err::<CatalogError>)?;
                removed.push(RemovedCartItem {
                    user_id,
                    variation_id,
                    sku: info.variation.sku.clone(),
                    description: info.description(),
                    quantity,
                });
            }
        }
        tx.commit().await?;
        Ok(removed)
    }

    async fn pack_keys(&self, skus: &[String]) -> Result<HashMap<String, PackKeyInfo>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::pack_keys(skus, &mut conn).await
    }
}

fn db_err<E: From<sqlx::Error>>(e: impl std::fmt::Display) -> E {
    E::from(sqlx::Error::Protocol(e.to_string()))
}

//--------------------------------------   OrderManagement   ---------------------------------------------------------

impl OrderManagement for SqliteDatabase {
    async fn convert_cart_to_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
        stock: Vec<StockDecrement>,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;
        let user_id = order.user_id;
        let order = orders::insert_order(order, &mut tx).await?;
        for item in &items {
            orders::insert_order_item(order.id, item, &mut tx).await?;
        }
        for dec in &stock {
            orders::decrement_stock(dec, &mut tx).await?;
        }
        carts::clear_cart(user_id, &mut tx).await.map_err(db_err::<OrderError>)?;
        ledger::mark_budget_dirty(user_id, &mut tx).await.map_err(db_err::<OrderError>)?;
        tx.commit().await?;
        debug!("🧾️ Converted cart for user {user_id} into order {} ({})", order.id, order.total);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_items(order_id, &mut conn).await
    }

    async fn orders_for_date(&self, date: chrono::NaiveDate) -> Result<Vec<Order>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        orders::orders_for_date(date, &mut conn).await
    }

    async fn report_lines_for_date(&self, date: chrono::NaiveDate) -> Result<Vec<ReportLine>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        orders::report_lines_for_date(date, &mut conn).await
    }
}

//--------------------------------------     BudgetLedger    ---------------------------------------------------------

impl BudgetLedger for SqliteDatabase {
    async fn payments_total(&self, user_id: i64) -> Result<Money, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::payments_total(user_id, &mut conn).await
    }

    async fn orders_total(&self, user_id: i64) -> Result<Money, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::orders_total(user_id, &mut conn).await
    }

    async fn cached_remaining(&self, user_id: i64) -> Result<Option<Money>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::cached_remaining(user_id, &mut conn).await
    }

    async fn write_cached_remaining(&self, user_id: i64, remaining: Money) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::write_cached_remaining(user_id, remaining, &mut conn).await
    }

    async fn mark_budget_dirty(&self, user_id: i64) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::mark_budget_dirty(user_id, &mut conn).await
    }
}

//-------------------------------------- PaymentGatewayDatabase -------------------------------------------------------

impl PaymentGatewayDatabase for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::insert_payment(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn settle_payment(
        &self,
        user_id: i64,
        amount: Money,
        charge_id: &str,
        event_time: DateTime<Utc>,
    ) -> Result<SettledPayment, PaymentError> {
        let mut tx = self.pool.begin().await?;
        let settled = payments::settle_payment(user_id, amount, charge_id, event_time, &mut tx).await?;
        tx.commit().await?;
        Ok(settled)
    }

    async fn fetch_payments_for_user(&self, user_id: i64) -> Result<Vec<Payment>, PaymentError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments_for_user(user_id, &mut conn).await
    }
}

//--------------------------------------  DiscountManagement ---------------------------------------------------------

impl DiscountManagement for SqliteDatabase {
    async fn fetch_discount_code(&self, code: &str) -> Result<Option<DiscountCode>, DiscountError> {
        let mut conn = self.pool.acquire().await?;
        discounts::fetch_discount_code(code, &mut conn).await
    }

    async fn upsert_discount_code(
        &self,
        code: DiscountCode,
        product_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<DiscountCode, DiscountError> {
        let mut tx = self.pool.begin().await?;
        let code = discounts::upsert_discount_code(code, &mut tx).await?;
        discounts::set_scope_products(code.id, product_ids, &mut tx).await?;
        discounts::set_scope_categories(code.id, category_ids, &mut tx).await?;
        tx.commit().await?;
        Ok(code)
    }

    async fn discount_scope_skus(&self, code_id: i64) -> Result<Vec<String>, DiscountError> {
        let mut conn = self.pool.acquire().await?;
        discounts::discount_scope_skus(code_id, &mut conn).await
    }

    async fn decrement_uses(&self, code_id: i64) -> Result<(), DiscountError> {
        let mut conn = self.pool.acquire().await?;
        discounts::decrement_uses(code_id, &mut conn).await
    }
}

//--------------------------------------  MemberManagement   ---------------------------------------------------------

impl MemberManagement for SqliteDatabase {
    async fn fetch_profile(&self, user_id: i64) -> Result<Option<MemberProfile>, MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::fetch_profile(user_id, &mut conn).await
    }

    async fn profile_by_customer_id(&self, customer_id: &str) -> Result<Option<MemberProfile>, MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::profile_by_customer_id(customer_id, &mut conn).await
    }

    async fn profile_by_email(&self, email: &str) -> Result<Option<MemberProfile>, MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::profile_by_email(email, &mut conn).await
    }

    async fn upsert_profile(&self, profile: MemberProfile) -> Result<MemberProfile, MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::upsert_profile(profile, &mut conn).await
    }

    async fn set_gateway_customer(&self, user_id: i64, customer_id: &str) -> Result<(), MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::set_gateway_customer(user_id, customer_id, &mut conn).await
    }

    async fn set_subscription(&self, user_id: i64, subscription_id: Option<&str>) -> Result<(), MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::set_subscription(user_id, subscription_id, &mut conn).await
    }

    async fn set_contribution(&self, user_id: i64, amount: Money, method: PaymentMethod) -> Result<(), MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::set_contribution(user_id, amount, method, &mut conn).await
    }

    async fn set_ach_status(&self, user_id: i64, status: AchStatus) -> Result<(), MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::set_ach_status(user_id, status, &mut conn).await
    }

    async fn set_paid_signup_fee(&self, user_id: i64, paid: bool) -> Result<(), MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::set_paid_signup_fee(user_id, paid, &mut conn).await
    }

    async fn set_start_date(&self, user_id: i64, date: DateTime<Utc>) -> Result<(), MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::set_start_date(user_id, date, &mut conn).await
    }

    async fn set_agreement_signed_by_email(&self, email: &str) -> Result<Option<MemberProfile>, MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::set_agreement_signed_by_email(email, &mut conn).await
    }

    async fn set_drop_site(&self, user_id: i64, drop_site: Option<&str>) -> Result<(), MemberError> {
        let mut conn = self.pool.acquire().await?;
        members::set_drop_site(user_id, drop_site, &mut conn).await
    }
}
