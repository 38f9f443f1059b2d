use csa_common::Money;
use thiserror::Error;

use crate::db_types::{Cart, CartItem, CartLine, CartVendorLine};

#[derive(Debug, Clone, Error)]
pub enum CartError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No variation matches the requested options: {0}")]
    InvalidOptions(String),
    #[error("{0} is out of stock")]
    NoStock(String),
    #[error("Only {available} of {sku} left in stock")]
    NoStockQuantity { sku: String, available: i64 },
    #[error("Insufficient budget: {required} required but only {remaining} remaining")]
    OverBudget { remaining: Money, required: Money },
    #[error("The ordering window is closed")]
    WindowClosed,
    #[error("The membership agreement has not been signed")]
    MembershipNotSigned,
    #[error("No ordering window is configured for drop site or zip: {0}")]
    InvalidDropSite(String),
    #[error("Cart item {0} not found")]
    ItemNotFound(i64),
    #[error("Member profile {0} not found")]
    ProfileNotFound(i64),
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Per-variation totals the close job uses to synthesize the weekly extra order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraOrderQuantity {
    pub variation_id: i64,
    pub total_quantity: i64,
    pub extra_percent: i64,
}

/// How much of a variation all carts together hold against one vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorHolding {
    pub vendor_id: i64,
    pub quantity: i64,
}

#[allow(async_fn_in_trait)]
pub trait CartManagement: Clone {
    async fn fetch_cart(&self, user_id: i64) -> Result<Option<Cart>, CartError>;

    /// Increase the quantity of `variation_id` in the user's cart by `delta > 0`, splitting the increase
    /// across the variation's vendors in rank order. Stock bounds count what other carts already hold.
    /// The whole delta is placed or the call fails with [`CartError::NoStock`] /
    /// [`CartError::NoStockQuantity`] and the cart is unchanged.
    async fn add_to_cart(&self, user_id: i64, variation_id: i64, delta: i64) -> Result<CartItem, CartError>;

    /// Set a cart item's quantity. Increases allocate like [`Self::add_to_cart`]; decreases release the
    /// least-preferred vendor splits first. At zero the item is removed, and the cart too when it empties.
    async fn set_quantity(&self, user_id: i64, cart_item_id: i64, quantity: i64) -> Result<(), CartError>;

    /// Delete all items and reset `attending_dinner`.
    async fn clear_cart(&self, user_id: i64) -> Result<(), CartError>;

    /// Clear every cart in the store. Returns the number of carts dropped.
    async fn clear_all_carts(&self) -> Result<u64, CartError>;

    async fn set_attending_dinner(&self, user_id: i64, count: i64) -> Result<(), CartError>;

    async fn cart_lines(&self, user_id: i64) -> Result<Vec<CartLine>, CartError>;

    /// The cart expanded to one line per vendor split, ready to become `OrderItem`s.
    async fn cart_vendor_lines(&self, user_id: i64) -> Result<Vec<CartVendorLine>, CartError>;

    /// Users with a non-empty cart, oldest cart first.
    async fn carted_users(&self) -> Result<Vec<i64>, CartError>;

    /// Total carted quantity per variation with a non-zero `extra_percent`, across all carts.
    async fn extra_order_quantities(&self) -> Result<Vec<ExtraOrderQuantity>, CartError>;

    /// Carted quantity per vendor for one variation, summed over every cart.
    async fn vendor_holdings(&self, variation_id: i64) -> Result<Vec<VendorHolding>, CartError>;
}
