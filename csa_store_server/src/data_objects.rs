use std::fmt::Display;

use csa_common::Money;
use csa_store_engine::{db_types::CartLine, CartSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//----------------------------------------   Cart   ----------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub variation_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetQuantityRequest {
    pub cart_item_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DinnerRequest {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRequest {
    pub code: String,
}

/// The wire form of a cart summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartResponse {
    pub lines: Vec<CartLine>,
    pub attending_dinner: i64,
    pub item_total: Money,
    pub discount_total: Money,
    pub shipping_total: Money,
    pub total: Money,
}

impl From<CartSummary> for CartResponse {
    fn from(summary: CartSummary) -> Self {
        Self {
            lines: summary.lines,
            attending_dinner: summary.attending_dinner,
            item_total: summary.totals.item_total,
            discount_total: summary.totals.discount_total,
            shipping_total: summary.totals.shipping_total,
            total: summary.totals.total,
        }
    }
}

//----------------------------------------   Budget   ----------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetResponse {
    pub payments_total: Money,
    pub orders_total: Money,
    pub remaining: Money,
}

//----------------------------------------   Profile   ----------------------------------------

/// Fields a member may change themselves. Everything absent is left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub phone: Option<String>,
    pub drop_site: Option<String>,
    pub home_delivery: Option<bool>,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_zip: Option<String>,
    pub delivery_instructions: Option<String>,
    pub allow_substitutions: Option<bool>,
    pub no_plastic_bags: Option<bool>,
    pub weekly_email: Option<bool>,
}

//----------------------------------------   Payments   ----------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Tokenized card or bank account from the gateway's browser SDK.
    pub source_token: String,
    /// Monthly contribution, in cents.
    pub amount: Money,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAmountRequest {
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSourceRequest {
    pub source_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub amount: Money,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyAchRequest {
    /// The two micro-deposit amounts, in cents.
    pub amounts: [i64; 2],
}

//----------------------------------------   Admin   ----------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUpdateRequest {
    pub vendor_id: i64,
    pub variation_id: i64,
    /// `None` clears the cap (untracked stock).
    pub num_in_stock: Option<i64>,
    /// Allocation rank of this vendor for the variation. Lower fills first.
    pub rank: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub product_id: i64,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditRequest {
    pub user_id: i64,
    pub amount: Money,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementRequest {
    pub email: String,
    pub name: String,
}
