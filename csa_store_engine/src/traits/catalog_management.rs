use std::collections::HashMap;

use thiserror::Error;

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
    helpers::PackKeyInfo,
};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No variation matches the requested options: {0}")]
    InvalidOptions(String),
    #[error("Product {0} not found")]
    ProductNotFound(i64),
    #[error("Vendor {0} not found")]
    VendorNotFound(i64),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    async fn upsert_vendor(&self, vendor: NewVendor) -> Result<Vendor, CatalogError>;

    async fn fetch_vendor(&self, vendor_id: i64) -> Result<Option<Vendor>, CatalogError>;

    async fn fetch_vendors(&self) -> Result<Vec<Vendor>, CatalogError>;

    async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    async fn upsert_variation(&self, variation: NewVariation) -> Result<ProductVariation, CatalogError>;

    /// Create or update the (vendor, variation) stock edge. `num_in_stock = None` means unlimited.
    /// This does not touch existing carts; callers that shrink stock must follow up with
    /// [`Self::reallocate_variation`].
    async fn set_vendor_stock(
        &self,
        variation_id: i64,
        vendor_id: i64,
        num_in_stock: Option<i64>,
        rank: i64,
    ) -> Result<VendorVariation, CatalogError>;

    async fn variation_by_sku(&self, sku: &str) -> Result<Option<VariationInfo>, CatalogError>;

    async fn variation_by_id(&self, variation_id: i64) -> Result<Option<VariationInfo>, CatalogError>;

    /// The fill sequence for a variation: its vendor stock rows ordered by ascending rank.
    async fn vendor_variations(&self, variation_id: i64) -> Result<Vec<VendorVariation>, CatalogError>;

    /// Flip a product's availability. Returns the ids of its variations so that the caller can evict them
    /// from live carts when the product is withdrawn.
    async fn set_product_available(&self, product_id: i64, available: bool) -> Result<Vec<i64>, CatalogError>;

    /// Re-run the vendor-split allocation for every cart item holding this variation, in cart-item time
    /// order, against the current stock bounds. Carts that can no longer be filled in full are reduced
    /// (or dropped at zero) and reported so that their owners can be notified.
    async fn reallocate_variation(&self, variation_id: i64) -> Result<Vec<StockShortfall>, CatalogError>;

    /// Delete every cart item referencing one of the given variations, reporting what was removed.
    async fn remove_variations_from_carts(&self, variation_ids: &[i64]) -> Result<Vec<RemovedCartItem>, CatalogError>;

    /// Pack-sort inputs (product and category invoice weights) for the given SKUs.
    async fn pack_keys(&self, skus: &[String]) -> Result<HashMap<String, PackKeyInfo>, CatalogError>;
}
