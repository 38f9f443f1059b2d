//! `CatalogApi` layers cart side effects over catalog writes: a stock change re-runs affected allocations,
//! and withdrawing a product evicts it from live carts. Affected members are notified through the event hooks.

use std::{collections::HashMap, fmt::Debug};

use log::{info, warn};

use crate::{
    db_types::{
        NewProduct,
        NewVariation,
        NewVendor,
        Product,
        ProductVariation,
        RemovedCartItem,
        StockShortfall,
        VariationInfo,
        Vendor,
        VendorVariation,
    },
    events::{EventProducers, ItemUnavailableEvent, StockReducedEvent},
    helpers::PackKeyInfo,
    traits::{CatalogError, CatalogManagement, MemberManagement},
};

pub struct CatalogApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement + MemberManagement
{
    pub async fn upsert_vendor(&self, vendor: NewVendor) -> Result<Vendor, CatalogError> {
        self.db.upsert_vendor(vendor).await
    }

    pub async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        self.db.upsert_product(product).await
    }

    pub async fn upsert_variation(&self, variation: NewVariation) -> Result<ProductVariation, CatalogError> {
        self.db.upsert_variation(variation).await
    }

    pub async fn variation_by_sku(&self, sku: &str) -> Result<Option<VariationInfo>, CatalogError> {
        self.db.variation_by_sku(sku).await
    }

    pub async fn variation_by_id(&self, variation_id: i64) -> Result<Option<VariationInfo>, CatalogError> {
        self.db.variation_by_id(variation_id).await
    }

    pub async fn vendor_variations(&self, variation_id: i64) -> Result<Vec<VendorVariation>, CatalogError> {
        self.db.vendor_variations(variation_id).await
    }

    pub async fn pack_keys(&self, skus: &[String]) -> Result<HashMap<String, PackKeyInfo>, CatalogError> {
        self.db.pack_keys(skus).await
    }

    /// Update a (vendor, variation) stock bound and re-run the allocations that depend on it. Carts that
    /// lost quantity are reported and their owners notified.
    pub async fn set_vendor_stock(
        &self,
        variation_id: i64,
        vendor_id: i64,
        num_in_stock: Option<i64>,
        rank: i64,
    ) -> Result<Vec<StockShortfall>, CatalogError> {
        self.db.set_vendor_stock(variation_id, vendor_id, num_in_stock, rank).await?;
        let shortfalls = self.db.reallocate_variation(variation_id).await?;
        for shortfall in &shortfalls {
            warn!(
                "🥬️ Stock change cut user {}'s {} from {} to {}",
                shortfall.user_id, shortfall.sku, shortfall.previous_quantity, shortfall.new_quantity
            );
            if let Some(email) = self.email_for(shortfall.user_id).await {
                self.call_stock_reduced_hook(StockReducedEvent {
                    user_id: shortfall.user_id,
                    email,
                    sku: shortfall.sku.clone(),
                    description: shortfall.description.clone(),
                    new_quantity: shortfall.new_quantity,
                })
                .await;
            }
        }
        Ok(shortfalls)
    }

    /// Flip a product's availability. Withdrawing a product removes it from every live cart and notifies the
    /// affected members.
    pub async fn set_product_available(
        &self,
        product_id: i64,
        available: bool,
    ) -> Result<Vec<RemovedCartItem>, CatalogError> {
        let variation_ids = self.db.set_product_available(product_id, available).await?;
        if available {
            return Ok(Vec::new());
        }
        let removed = self.db.remove_variations_from_carts(&variation_ids).await?;
        info!("🥬️ Product {product_id} withdrawn; {} cart items removed", removed.len());
        for removal in &removed {
            if let Some(email) = self.email_for(removal.user_id).await {
                self.call_item_unavailable_hook(ItemUnavailableEvent {
                    user_id: removal.user_id,
                    email,
                    description: removal.description.clone(),
                    quantity: removal.quantity,
                })
                .await;
            }
        }
        Ok(removed)
    }

    async fn email_for(&self, user_id: i64) -> Option<String> {
        match self.db.fetch_profile(user_id).await {
            Ok(profile) => profile.map(|p| p.email),
            Err(e) => {
                warn!("🥬️ Could not look up profile {user_id} for notification: {e}");
                None
            },
        }
    }

    async fn call_stock_reduced_hook(&self, event: StockReducedEvent) {
        for emitter in &self.producers.stock_reduced_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_item_unavailable_hook(&self, event: ItemUnavailableEvent) {
        for emitter in &self.producers.item_unavailable_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}
