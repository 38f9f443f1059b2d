//! `CartApi` is the member-facing surface of the ordering engine. Every write runs the ordering gate
//! (agreement signed, drop site covered, window open) and, for subscribing members, the budget gate.

use std::fmt::Debug;

use chrono::Utc;
use log::{debug, info, warn};

use crate::{
    db_types::{CartItem, CartLine, MemberProfile},
    events::{EventProducers, OutOfStockEvent},
    helpers::{user_can_order, OrderWindow},
    store_api::{
        ledger_api,
        totals::{cart_totals, CartTotals, DeliveryFees, ScopedDiscount},
    },
    traits::{
        BudgetLedger,
        CartError,
        CartManagement,
        CatalogManagement,
        DiscountError,
        DiscountManagement,
        MemberManagement,
    },
};

/// A cart with its totals, ready for display or checkout.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
    pub attending_dinner: i64,
}

pub struct CartApi<B> {
    db: B,
    windows: Vec<OrderWindow>,
    fees: DeliveryFees,
    producers: EventProducers,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B, windows: Vec<OrderWindow>, fees: DeliveryFees, producers: EventProducers) -> Self {
        Self { db, windows, fees, producers }
    }
}

impl<B> CartApi<B>
where B: CartManagement + CatalogManagement + MemberManagement + DiscountManagement + BudgetLedger
{
    async fn gated_profile(&self, user_id: i64) -> Result<MemberProfile, CartError> {
        let profile = self
            .db
            .fetch_profile(user_id)
            .await
            .map_err(|e| CartError::DatabaseError(e.to_string()))?
            .ok_or(CartError::ProfileNotFound(user_id))?;
        user_can_order(&profile, Utc::now(), &self.windows)?;
        Ok(profile)
    }

    /// The budget gate applies to subscribing members only; pay-as-you-go members settle at the gateway.
    async fn check_budget(
        &self,
        profile: &MemberProfile,
        required: csa_common::Money,
    ) -> Result<(), CartError> {
        if !profile.is_subscriber() {
            return Ok(());
        }
        let remaining = ledger_api::remaining_budget(&self.db, profile.user_id)
            .await
            .map_err(|e| CartError::DatabaseError(e.to_string()))?;
        if required > remaining {
            info!("🛒️ User {} is over budget: {required} required, {remaining} remaining", profile.user_id);
            return Err(CartError::OverBudget { remaining, required });
        }
        Ok(())
    }

    pub async fn add_to_cart(&self, user_id: i64, variation_id: i64, quantity: i64) -> Result<CartItem, CartError> {
        let profile = self.gated_profile(user_id).await?;
        let info = self
            .db
            .variation_by_id(variation_id)
            .await
            .map_err(|e| CartError::DatabaseError(e.to_string()))?
            .ok_or_else(|| CartError::InvalidOptions(format!("variation {variation_id} is not for sale")))?;
        self.check_budget(&profile, info.variation.unit_price * quantity).await?;
        match self.db.add_to_cart(user_id, variation_id, quantity).await {
            Ok(item) => Ok(item),
            Err(err @ (CartError::NoStock(_) | CartError::NoStockQuantity { .. })) => {
                let available = match &err {
                    CartError::NoStockQuantity { available, .. } => *available,
                    _ => 0,
                };
                warn!("🛒️ Add to cart for user {user_id} ran {} dry ({available} left)", info.variation.sku);
                self.call_out_of_stock_hook(OutOfStockEvent {
                    sku: info.variation.sku.clone(),
                    description: info.description(),
                    requested: quantity,
                    available,
                })
                .await;
                Err(err)
            },
            Err(err) => Err(err),
        }
    }

    pub async fn set_quantity(&self, user_id: i64, cart_item_id: i64, quantity: i64) -> Result<(), CartError> {
        let profile = self.gated_profile(user_id).await?;
        let lines = self.db.cart_lines(user_id).await?;
        let line = lines
            .iter()
            .find(|l| l.cart_item_id == cart_item_id)
            .ok_or(CartError::ItemNotFound(cart_item_id))?;
        if quantity > line.quantity {
            self.check_budget(&profile, line.unit_price * (quantity - line.quantity)).await?;
        }
        self.db.set_quantity(user_id, cart_item_id, quantity).await
    }

    pub async fn clear_cart(&self, user_id: i64) -> Result<(), CartError> {
        self.db.clear_cart(user_id).await
    }

    pub async fn set_attending_dinner(&self, user_id: i64, count: i64) -> Result<(), CartError> {
        let _ = self.gated_profile(user_id).await?;
        self.db.set_attending_dinner(user_id, count).await
    }

    /// The cart with totals, using the discount code saved on the member's profile when it still checks out.
    pub async fn cart_summary(&self, user_id: i64) -> Result<CartSummary, CartError> {
        let profile = self
            .db
            .fetch_profile(user_id)
            .await
            .map_err(|e| CartError::DatabaseError(e.to_string()))?
            .ok_or(CartError::ProfileNotFound(user_id))?;
        let lines = self.db.cart_lines(user_id).await?;
        let discount = self.usable_discount(&profile, &lines).await.map_err(|e| CartError::DatabaseError(e.to_string()))?;
        let totals = cart_totals(&lines, discount.as_ref(), &profile, &self.fees);
        let attending_dinner = self.db.fetch_cart(user_id).await?.map(|c| c.attending_dinner).unwrap_or(0);
        Ok(CartSummary { lines, totals, attending_dinner })
    }

    /// Validate a code against the member's current cart and save it on their profile.
    pub async fn apply_discount_code(&self, user_id: i64, code: &str) -> Result<ScopedDiscount, DiscountError> {
        let mut profile = self
            .db
            .fetch_profile(user_id)
            .await
            .map_err(|e| DiscountError::DatabaseError(e.to_string()))?
            .ok_or_else(|| DiscountError::DatabaseError(format!("no profile for user {user_id}")))?;
        let lines =
            self.db.cart_lines(user_id).await.map_err(|e| DiscountError::DatabaseError(e.to_string()))?;
        let discount = validate_discount(&self.db, code, &lines).await?;
        profile.discount_code = Some(discount.code.code.clone());
        self.db.upsert_profile(profile).await.map_err(|e| DiscountError::DatabaseError(e.to_string()))?;
        debug!("🛒️ User {user_id} applied discount code {code}");
        Ok(discount)
    }

    pub async fn remove_discount_code(&self, user_id: i64) -> Result<(), CartError> {
        let mut profile = self
            .db
            .fetch_profile(user_id)
            .await
            .map_err(|e| CartError::DatabaseError(e.to_string()))?
            .ok_or(CartError::ProfileNotFound(user_id))?;
        profile.discount_code = None;
        self.db.upsert_profile(profile).await.map_err(|e| CartError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// The profile's saved code, if it still validates against the current cart. A saved code that no longer
    /// applies is silently skipped rather than blocking the summary.
    async fn usable_discount(
        &self,
        profile: &MemberProfile,
        lines: &[CartLine],
    ) -> Result<Option<ScopedDiscount>, DiscountError> {
        let Some(code) = profile.discount_code.as_deref() else {
            return Ok(None);
        };
        match validate_discount(&self.db, code, lines).await {
            Ok(discount) => Ok(Some(discount)),
            Err(DiscountError::DatabaseError(e)) => Err(DiscountError::DatabaseError(e)),
            Err(_) => Ok(None),
        }
    }

    async fn call_out_of_stock_hook(&self, event: OutOfStockEvent) {
        for emitter in &self.producers.out_of_stock_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}

/// Validate a discount code against a cart: it must exist, be live, meet its minimum purchase, and (when
/// scoped) match at least one carted SKU.
pub async fn validate_discount<B>(db: &B, code: &str, lines: &[CartLine]) -> Result<ScopedDiscount, DiscountError>
where B: DiscountManagement {
    let discount = db.fetch_discount_code(code).await?.ok_or_else(|| DiscountError::NotFound(code.to_string()))?;
    if !discount.is_live(Utc::now()) {
        return Err(DiscountError::NotLive(code.to_string()));
    }
    let item_total: csa_common::Money = lines.iter().map(|l| l.total_price()).sum();
    if let Some(min) = discount.min_purchase {
        if item_total < min {
            return Err(DiscountError::MinPurchase(min));
        }
    }
    let scope_skus = db.discount_scope_skus(discount.id).await?;
    if !scope_skus.is_empty() && !lines.iter().any(|l| scope_skus.contains(&l.sku)) {
        return Err(DiscountError::NotApplicable);
    }
    Ok(ScopedDiscount { code: discount, scope_skus })
}
