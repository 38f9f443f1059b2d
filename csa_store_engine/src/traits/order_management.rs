use chrono::NaiveDate;
use thiserror::Error;

use crate::db_types::{NewOrder, NewOrderItem, Order, OrderItem, ReportLine};

#[derive(Debug, Clone, Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Cart for user {0} is empty")]
    CartEmpty(i64),
    #[error("Member profile {0} not found")]
    ProfileNotFound(i64),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Stock consumed from a (vendor, variation) row when a cart is converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
    pub variation_id: i64,
    pub vendor_id: i64,
    pub quantity: i64,
}

#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Atomically: insert the order and its items, decrement the given vendor stock rows (bounded rows
    /// only — unlimited rows are left NULL), delete the user's cart, and mark the user's budget dirty.
    async fn convert_cart_to_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
        stock: Vec<StockDecrement>,
    ) -> Result<Order, OrderError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderError>;

    async fn orders_for_date(&self, date: NaiveDate) -> Result<Vec<Order>, OrderError>;

    /// The day's order items joined with member and shipping context, the input to every sub-report.
    async fn report_lines_for_date(&self, date: NaiveDate) -> Result<Vec<ReportLine>, OrderError>;
}
