use csa_common::Money;
use thiserror::Error;

use crate::db_types::DiscountCode;

#[derive(Debug, Clone, Error)]
pub enum DiscountError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Discount code {0} not found")]
    NotFound(String),
    #[error("Discount code {0} is not active")]
    NotLive(String),
    #[error("Cart total is below the code's minimum purchase of {0}")]
    MinPurchase(Money),
    #[error("The cart contains none of the products this code applies to")]
    NotApplicable,
}

impl From<sqlx::Error> for DiscountError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait DiscountManagement: Clone {
    async fn fetch_discount_code(&self, code: &str) -> Result<Option<DiscountCode>, DiscountError>;

    /// Insert or update a code, keyed on its `code` string, and replace its product/category scope.
    async fn upsert_discount_code(
        &self,
        code: DiscountCode,
        product_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<DiscountCode, DiscountError>;

    /// The SKUs the code applies to: variations of its own products plus variations of every product in
    /// its categories. Empty means the code is unscoped and applies to the whole cart.
    async fn discount_scope_skus(&self, code_id: i64) -> Result<Vec<String>, DiscountError>;

    /// Decrement `uses_remaining` by one when the code is bounded.
    async fn decrement_uses(&self, code_id: i64) -> Result<(), DiscountError>;
}
