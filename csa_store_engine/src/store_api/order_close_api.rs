//! The weekly close: turn every live cart into an order, synthesize the farm's extra over-order, and reset
//! the store for the next cycle.

use std::{collections::HashMap, fmt::Debug};

use chrono::{DateTime, Duration, Utc};
use csa_common::Money;
use log::{error, info, warn};

use crate::{
    db_types::{MemberProfile, NewOrder, NewOrderItem, Order, EXTRA_ORDER_USER_ID},
    events::{EventProducers, OrderConfirmedEvent},
    store_api::{
        cart_api::validate_discount,
        totals::{cart_totals, DeliveryFees, ScopedDiscount},
    },
    traits::{
        CartManagement,
        CatalogManagement,
        DiscountError,
        DiscountManagement,
        MemberManagement,
        OrderError,
        OrderManagement,
        StockDecrement,
    },
};

/// Pickup day for orders written by a close, relative to the moment the close runs.
const PICKUP_OFFSET_DAYS: i64 = 1;

#[derive(Debug, Clone)]
pub struct CloseFailure {
    pub user_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct CloseSummary {
    pub order_ids: Vec<i64>,
    pub extra_order_id: Option<i64>,
    pub failures: Vec<CloseFailure>,
    pub carts_cleared: u64,
}

pub struct OrderCloseApi<B> {
    db: B,
    fees: DeliveryFees,
    producers: EventProducers,
}

impl<B> Debug for OrderCloseApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderCloseApi")
    }
}

impl<B> OrderCloseApi<B> {
    pub fn new(db: B, fees: DeliveryFees, producers: EventProducers) -> Self {
        Self { db, fees, producers }
    }
}

impl<B> OrderCloseApi<B>
where B: CartManagement + OrderManagement + CatalogManagement + MemberManagement + DiscountManagement
{
    /// Run the close. One member failing never aborts the cycle: the failure is recorded and the close moves
    /// on. Every cart, converted or not, is gone by the time this returns.
    pub async fn close_cycle(&self, now: DateTime<Utc>) -> Result<CloseSummary, OrderError> {
        let order_time = now + Duration::days(PICKUP_OFFSET_DAYS);
        let mut summary = CloseSummary::default();
        info!("🕰️ Closing the ordering cycle at {now}");

        // The extra order reads every live cart, so it must be synthesized before any of them convert.
        match self.synthesize_extra_order(order_time).await {
            Ok(id) => summary.extra_order_id = id,
            Err(e) => {
                error!("🕰️ Extra order synthesis failed: {e}");
                summary.failures.push(CloseFailure { user_id: EXTRA_ORDER_USER_ID, reason: e.to_string() });
            },
        }

        let users = self.db.carted_users().await.map_err(|e| OrderError::DatabaseError(e.to_string()))?;
        for user_id in users.into_iter().filter(|&u| u != EXTRA_ORDER_USER_ID) {
            match self.convert_member_cart(user_id, order_time).await {
                Ok(order) => {
                    summary.order_ids.push(order.id);
                },
                Err(e) => {
                    error!("🕰️ Could not convert cart for user {user_id}: {e}");
                    summary.failures.push(CloseFailure { user_id, reason: e.to_string() });
                },
            }
        }

        summary.carts_cleared =
            self.db.clear_all_carts().await.map_err(|e| OrderError::DatabaseError(e.to_string()))?;
        info!(
            "🕰️ Cycle closed: {} orders written, {} failures, {} leftover carts cleared",
            summary.order_ids.len(),
            summary.failures.len(),
            summary.carts_cleared
        );
        Ok(summary)
    }

    /// The farm's over-order: for every carted variation carrying an over-order factor, order an extra
    /// `round(total x percent / 100)` units under the reserved member. The extra follows the same ranked
    /// vendor split the member carts use, against live stock (bounded stock minus what the carts already
    /// hold), so it lands with the vendors who can actually supply it. No stock is consumed; this order
    /// *is* the buffer the factor exists for.
    async fn synthesize_extra_order(&self, order_time: DateTime<Utc>) -> Result<Option<i64>, OrderError> {
        let quantities =
            self.db.extra_order_quantities().await.map_err(|e| OrderError::DatabaseError(e.to_string()))?;
        let mut items = Vec::new();
        let mut titles: HashMap<i64, String> = HashMap::new();
        for eoq in quantities {
            let extra = (eoq.total_quantity * eoq.extra_percent + 50) / 100;
            if extra == 0 {
                continue;
            }
            let Some(info) = self
                .db
                .variation_by_id(eoq.variation_id)
                .await
                .map_err(|e| OrderError::DatabaseError(e.to_string()))?
            else {
                continue;
            };
            for (vendor_id, quantity) in self.split_extra(eoq.variation_id, &info.variation.sku, extra).await? {
                let vendor = match vendor_id {
                    Some(id) => self.vendor_title(id, &mut titles).await?,
                    None => "Farm".to_string(),
                };
                items.push(NewOrderItem {
                    sku: info.variation.sku.clone(),
                    description: info.description(),
                    category: info.category_string(),
                    vendor,
                    vendor_price: info.variation.vendor_price,
                    unit_price: info.variation.unit_price,
                    quantity,
                    total_price: info.variation.unit_price * quantity,
                    in_inventory: info.product.in_inventory,
                    is_frozen: info.variation.is_frozen,
                });
            }
        }
        if items.is_empty() {
            return Ok(None);
        }
        let item_total: Money = items.iter().map(|i| i.total_price).sum();
        let order = NewOrder {
            user_id: EXTRA_ORDER_USER_ID,
            order_time,
            drop_site: Some("Farm".to_string()),
            item_total,
            total: item_total,
            ..NewOrder::default()
        };
        let count = items.len();
        let order = self.db.convert_cart_to_order(order, items, Vec::new()).await?;
        info!("🕰️ Synthesized extra order {} with {count} lines ({item_total})", order.id);
        Ok(Some(order.id))
    }

    /// Allocate `extra` units across the variation's vendors in rank order, each vendor bounded by its
    /// live stock after the member carts are subtracted. Anything no vendor can cover falls back to the
    /// first-ranked vendor, and to the farm itself when the variation has no vendors at all.
    async fn split_extra(
        &self,
        variation_id: i64,
        sku: &str,
        extra: i64,
    ) -> Result<Vec<(Option<i64>, i64)>, OrderError> {
        let sequence =
            self.db.vendor_variations(variation_id).await.map_err(|e| OrderError::DatabaseError(e.to_string()))?;
        if sequence.is_empty() {
            return Ok(vec![(None, extra)]);
        }
        let held: HashMap<i64, i64> = self
            .db
            .vendor_holdings(variation_id)
            .await
            .map_err(|e| OrderError::DatabaseError(e.to_string()))?
            .into_iter()
            .map(|h| (h.vendor_id, h.quantity))
            .collect();
        let mut splits: Vec<(Option<i64>, i64)> = Vec::new();
        let mut remaining = extra;
        for vv in &sequence {
            if remaining == 0 {
                break;
            }
            let take = match vv.num_in_stock {
                None => remaining,
                Some(stock) => {
                    let live = (stock - held.get(&vv.vendor_id).copied().unwrap_or(0)).max(0);
                    remaining.min(live)
                },
            };
            if take > 0 {
                splits.push((Some(vv.vendor_id), take));
                remaining -= take;
            }
        }
        if remaining > 0 {
            // The buffer deliberately over-orders, so a shortfall across every vendor still gets ordered,
            // from the preferred vendor.
            let first = sequence[0].vendor_id;
            warn!("🕰️ No vendor has stock for {remaining} extra of {sku}; assigning them to vendor {first}");
            match splits.iter_mut().find(|(v, _)| *v == Some(first)) {
                Some(split) => split.1 += remaining,
                None => splits.insert(0, (Some(first), remaining)),
            }
        }
        Ok(splits)
    }

    async fn vendor_title(&self, vendor_id: i64, cache: &mut HashMap<i64, String>) -> Result<String, OrderError> {
        if let Some(title) = cache.get(&vendor_id) {
            return Ok(title.clone());
        }
        let vendor =
            self.db.fetch_vendor(vendor_id).await.map_err(|e| OrderError::DatabaseError(e.to_string()))?;
        let title = vendor.map(|v| v.title).unwrap_or_else(|| "Farm".to_string());
        cache.insert(vendor_id, title.clone());
        Ok(title)
    }

    async fn convert_member_cart(&self, user_id: i64, order_time: DateTime<Utc>) -> Result<Order, OrderError> {
        let profile = self
            .db
            .fetch_profile(user_id)
            .await
            .map_err(|e| OrderError::DatabaseError(e.to_string()))?
            .ok_or(OrderError::ProfileNotFound(user_id))?;
        let lines = self.db.cart_lines(user_id).await.map_err(|e| OrderError::DatabaseError(e.to_string()))?;
        if lines.is_empty() {
            return Err(OrderError::CartEmpty(user_id));
        }
        let vendor_lines =
            self.db.cart_vendor_lines(user_id).await.map_err(|e| OrderError::DatabaseError(e.to_string()))?;
        let attending_dinner = self
            .db
            .fetch_cart(user_id)
            .await
            .map_err(|e| OrderError::DatabaseError(e.to_string()))?
            .map(|c| c.attending_dinner)
            .unwrap_or(0);
        let discount = self.usable_discount(&profile, &lines).await?;
        let totals = cart_totals(&lines, discount.as_ref(), &profile, &self.fees);

        // Members attending the farm dinner collect their order there instead of at their drop site.
        let drop_site = if attending_dinner > 0 { Some("Farm".to_string()) } else { profile.drop_site.clone() };
        let order = NewOrder {
            user_id,
            order_time,
            drop_site,
            home_delivery: profile.home_delivery,
            ship_first_name: Some(profile.first_name.clone()),
            ship_last_name: Some(profile.last_name.clone()),
            ship_address: profile.delivery_address.clone(),
            ship_city: profile.delivery_city.clone(),
            ship_zip: profile.delivery_zip.clone(),
            ship_phone: profile.phone.clone(),
            shipping_instructions: profile.delivery_instructions.clone(),
            allow_substitutions: profile.allow_substitutions,
            no_plastic_bags: profile.no_plastic_bags,
            attending_dinner,
            item_total: totals.item_total,
            discount_total: totals.discount_total,
            shipping_total: totals.shipping_total,
            total: totals.total,
            discount_code: discount.as_ref().map(|d| d.code.code.clone()),
        };
        // Weekly-inventory products are restocked every cycle, so converting a cart does not consume them.
        let stock: Vec<StockDecrement> = vendor_lines
            .iter()
            .filter(|l| !l.weekly_inventory)
            .map(|l| StockDecrement { variation_id: l.variation_id, vendor_id: l.vendor_id, quantity: l.quantity })
            .collect();
        let items: Vec<NewOrderItem> = vendor_lines.into_iter().map(NewOrderItem::from).collect();
        let order = self.db.convert_cart_to_order(order, items, stock).await?;

        if let Some(discount) = &discount {
            if let Err(e) = self.db.decrement_uses(discount.code.id).await {
                warn!("🕰️ Could not decrement uses of code {}: {e}", discount.code.code);
            }
        }
        self.call_order_confirmed_hook(OrderConfirmedEvent {
            order: order.clone(),
            email: profile.email.clone(),
            pickup_date: order_time.date_naive(),
        })
        .await;
        Ok(order)
    }

    /// The profile's saved code, revalidated against the cart being converted. A code that no longer applies
    /// is dropped silently; only infrastructure errors abort the conversion.
    async fn usable_discount(
        &self,
        profile: &MemberProfile,
        lines: &[crate::db_types::CartLine],
    ) -> Result<Option<ScopedDiscount>, OrderError> {
        let Some(code) = profile.discount_code.as_deref() else {
            return Ok(None);
        };
        match validate_discount(&self.db, code, lines).await {
            Ok(discount) => Ok(Some(discount)),
            Err(DiscountError::DatabaseError(e)) => Err(OrderError::DatabaseError(e)),
            Err(e) => {
                warn!("🕰️ Discount code {code} for user {} no longer applies: {e}", profile.user_id);
                Ok(None)
            },
        }
    }

    async fn call_order_confirmed_hook(&self, event: OrderConfirmedEvent) {
        for emitter in &self.producers.order_confirmed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}
