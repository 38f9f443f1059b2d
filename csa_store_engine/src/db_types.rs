use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use csa_common::Money;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// Orders before this date predate the ledger and are excluded from budget aggregation.
pub fn ledger_epoch() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2017, 12, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// Reserved member id that carries the synthesized weekly extra order.
pub const EXTRA_ORDER_USER_ID: i64 = 0;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------      Vendor         ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub title: String,
    pub email: Option<String>,
    pub auto_send_order: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVendor {
    pub title: String,
    pub email: Option<String>,
    pub auto_send_order: bool,
}

//--------------------------------------     Category        ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub parent_id: Option<i64>,
    /// Sort weight on invoices and pack lists. Zero means "unset".
    pub order_on_invoice: f64,
}

//--------------------------------------      Product        ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub available: bool,
    pub in_inventory: bool,
    pub weekly_inventory: bool,
    pub is_dairy: bool,
    pub order_on_invoice: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub slug: String,
    pub available: bool,
    pub in_inventory: bool,
    pub weekly_inventory: bool,
    pub is_dairy: bool,
    pub order_on_invoice: Option<f64>,
    /// Category titles. Created on the fly if they do not exist yet.
    pub categories: Vec<String>,
}

//--------------------------------------  ProductVariation   ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProductVariation {
    pub id: i64,
    pub product_id: i64,
    pub sku: String,
    pub title: Option<String>,
    pub unit_price: Money,
    pub vendor_price: Money,
    pub is_frozen: bool,
    /// Percentage over-order factor for weight-variable items; 0 disables extra synthesis.
    pub extra_percent: i64,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVariation {
    pub product_id: i64,
    pub sku: String,
    pub title: Option<String>,
    pub unit_price: Money,
    pub vendor_price: Money,
    pub is_frozen: bool,
    pub extra_percent: i64,
    pub is_default: bool,
}

/// A variation with its product and categories joined in. This is the unit the cart engine works with, so that
/// price, availability and category data are always read through from the catalog rather than stored on the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariationInfo {
    pub variation: ProductVariation,
    pub product: Product,
    pub categories: Vec<Category>,
}

impl VariationInfo {
    pub fn description(&self) -> String {
        match &self.variation.title {
            Some(t) => format!("{} - {t}", self.product.title),
            None => self.product.title.clone(),
        }
    }

    /// The single category title, or a ';'-joined string when the product is multi-category.
    pub fn category_string(&self) -> String {
        self.categories.iter().map(|c| c.title.as_str()).collect::<Vec<_>>().join(";")
    }
}

//-------------------------------------- VendorVariation     ---------------------------------------------------------

/// The (vendor, variation) stock edge. `rank` orders the fill sequence; `num_in_stock = NULL` is unlimited.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VendorVariation {
    pub id: i64,
    pub variation_id: i64,
    pub vendor_id: i64,
    pub num_in_stock: Option<i64>,
    pub rank: i64,
}

//--------------------------------------        Cart         ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    pub attending_dinner: i64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub variation_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VendorCartItem {
    pub id: i64,
    pub cart_item_id: i64,
    pub vendor_id: i64,
    pub quantity: i64,
    pub rank: i64,
}

/// One cart item with its catalog fields read through and its vendor quantities summed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub cart_item_id: i64,
    pub user_id: i64,
    pub variation_id: i64,
    pub product_id: i64,
    pub sku: String,
    pub description: String,
    pub category: String,
    pub unit_price: Money,
    pub vendor_price: Money,
    pub quantity: i64,
    pub in_inventory: bool,
    pub is_frozen: bool,
}

impl CartLine {
    pub fn total_price(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// One vendor split of a cart item; the unit the close job explodes into `OrderItem`s.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartVendorLine {
    pub cart_item_id: i64,
    pub variation_id: i64,
    pub vendor_id: i64,
    pub sku: String,
    pub description: String,
    pub category: String,
    pub vendor_title: String,
    pub unit_price: Money,
    pub vendor_price: Money,
    pub quantity: i64,
    pub in_inventory: bool,
    pub is_frozen: bool,
    pub weekly_inventory: bool,
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created by the close job and not yet packed.
    Unprocessed,
    /// The order has been packed and delivered or picked up.
    Processed,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Unprocessed => write!(f, "Unprocessed"),
            OrderStatusType::Processed => write!(f, "Processed"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unprocessed" => Ok(Self::Unprocessed),
            "Processed" => Ok(Self::Processed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Unprocessed");
            OrderStatusType::Unprocessed
        })
    }
}

//--------------------------------------        Order        ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub order_time: DateTime<Utc>,
    pub status: OrderStatusType,
    pub drop_site: Option<String>,
    pub home_delivery: bool,
    pub ship_first_name: Option<String>,
    pub ship_last_name: Option<String>,
    pub ship_address: Option<String>,
    pub ship_city: Option<String>,
    pub ship_zip: Option<String>,
    pub ship_phone: Option<String>,
    pub shipping_instructions: Option<String>,
    pub allow_substitutions: bool,
    pub no_plastic_bags: bool,
    pub attending_dinner: i64,
    pub item_total: Money,
    pub discount_total: Money,
    pub shipping_total: Money,
    pub total: Money,
    pub discount_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: i64,
    pub order_time: DateTime<Utc>,
    pub drop_site: Option<String>,
    pub home_delivery: bool,
    pub ship_first_name: Option<String>,
    pub ship_last_name: Option<String>,
    pub ship_address: Option<String>,
    pub ship_city: Option<String>,
    pub ship_zip: Option<String>,
    pub ship_phone: Option<String>,
    pub shipping_instructions: Option<String>,
    pub allow_substitutions: bool,
    pub no_plastic_bags: bool,
    pub attending_dinner: i64,
    pub item_total: Money,
    pub discount_total: Money,
    pub shipping_total: Money,
    pub total: Money,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub sku: String,
    pub description: String,
    pub category: String,
    pub vendor: String,
    pub vendor_price: Money,
    pub unit_price: Money,
    pub quantity: i64,
    pub total_price: Money,
    pub in_inventory: bool,
    pub is_frozen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub sku: String,
    pub description: String,
    pub category: String,
    pub vendor: String,
    pub vendor_price: Money,
    pub unit_price: Money,
    pub quantity: i64,
    pub total_price: Money,
    pub in_inventory: bool,
    pub is_frozen: bool,
}

impl From<CartVendorLine> for NewOrderItem {
    fn from(line: CartVendorLine) -> Self {
        let total_price = line.unit_price * line.quantity;
        Self {
            sku: line.sku,
            description: line.description,
            category: line.category,
            vendor: line.vendor_title,
            vendor_price: line.vendor_price,
            unit_price: line.unit_price,
            quantity: line.quantity,
            total_price,
            in_inventory: line.in_inventory,
            is_frozen: line.is_frozen,
        }
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    /// The time the charge was created at the gateway, not the time we saw the event.
    pub payment_date: DateTime<Utc>,
    pub amount: Money,
    pub pending: bool,
    pub is_credit: bool,
    pub charge_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub user_id: i64,
    pub payment_date: DateTime<Utc>,
    pub amount: Money,
    pub pending: bool,
    pub is_credit: bool,
    pub charge_id: Option<String>,
    pub notes: Option<String>,
}

impl NewPayment {
    pub fn new(user_id: i64, amount: Money, payment_date: DateTime<Utc>) -> Self {
        Self { user_id, payment_date, amount, pending: false, is_credit: false, charge_id: None, notes: None }
    }

    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }

    pub fn credit(mut self) -> Self {
        self.is_credit = true;
        self
    }

    pub fn with_charge_id<S: Into<String>>(mut self, charge_id: S) -> Self {
        self.charge_id = Some(charge_id.into());
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

//--------------------------------------    PaymentMethod    ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    CreditCard,
    Ach,
    Crypto,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::CreditCard => write!(f, "CreditCard"),
            PaymentMethod::Ach => write!(f, "Ach"),
            PaymentMethod::Crypto => write!(f, "Crypto"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CreditCard" | "CC" => Ok(Self::CreditCard),
            "Ach" | "ACH" => Ok(Self::Ach),
            "Crypto" | "CRYPTO" => Ok(Self::Crypto),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------      AchStatus      ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum AchStatus {
    /// Source attached; micro-deposits not yet confirmed.
    New,
    Verifying,
    Verified,
    Failed,
}

impl Display for AchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AchStatus::New => write!(f, "New"),
            AchStatus::Verifying => write!(f, "Verifying"),
            AchStatus::Verified => write!(f, "Verified"),
            AchStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for AchStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(Self::New),
            "Verifying" => Ok(Self::Verifying),
            "Verified" => Ok(Self::Verified),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid ACH status: {s}"))),
        }
    }
}

impl From<String> for AchStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid ACH status: {value}. But this conversion cannot fail. Defaulting to New");
            AchStatus::New
        })
    }
}

//--------------------------------------    MemberProfile    ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemberProfile {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub monthly_contribution: Money,
    pub payment_method: Option<PaymentMethod>,
    pub gateway_customer_id: Option<String>,
    pub gateway_subscription_id: Option<String>,
    pub ach_status: AchStatus,
    pub paid_signup_fee: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub drop_site: Option<String>,
    pub home_delivery: bool,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_zip: Option<String>,
    pub delivery_instructions: Option<String>,
    pub signed_membership_agreement: bool,
    pub allow_substitutions: bool,
    pub no_plastic_bags: bool,
    pub can_order_dairy: bool,
    pub weekly_email: bool,
    pub discount_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MemberProfile {
    /// Members with a recurring contribution are the ones the budget gate applies to.
    pub fn is_subscriber(&self) -> bool {
        !self.monthly_contribution.is_zero()
    }
}

//--------------------------------------    DiscountCode     ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: i64,
    pub code: String,
    pub active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub free_shipping: bool,
    pub min_purchase: Option<Money>,
    pub deduct: Option<Money>,
    pub percent: Option<i64>,
    /// Reduce the discounted amount down to this total, rather than by a deduction or percentage.
    pub target_total: Option<Money>,
    pub uses_remaining: Option<i64>,
}

impl DiscountCode {
    /// A code is live when it is switched on, inside its validity window and not used up.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        if !self.active || self.uses_remaining == Some(0) {
            return false;
        }
        if self.valid_from.map(|from| now < from).unwrap_or(false) {
            return false;
        }
        !self.valid_to.map(|to| now > to).unwrap_or(false)
    }

    /// The reduction this code applies to `amount`: a fixed deduction when it fits, else the percentage,
    /// else whatever brings `amount` down to the target total, else zero.
    pub fn calculate(&self, amount: Money) -> Money {
        if let Some(deduct) = self.deduct {
            if deduct <= amount {
                return deduct;
            }
        }
        if let Some(percent) = self.percent {
            return amount.percent(percent);
        }
        if let Some(target) = self.target_total {
            if target < amount {
                return amount - target;
            }
        }
        Money::default()
    }
}

//--------------------------------------     ReportLine      ---------------------------------------------------------

/// One order item joined with its order's member and shipping context. The report pipeline is a set of pure
/// functions over the day's `ReportLine`s.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReportLine {
    pub order_id: i64,
    pub user_id: i64,
    pub order_time: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
    pub drop_site: Option<String>,
    pub home_delivery: bool,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub shipping_instructions: Option<String>,
    pub sku: String,
    pub description: String,
    pub category: String,
    pub vendor: String,
    pub vendor_price: Money,
    pub unit_price: Money,
    pub quantity: i64,
    pub total_price: Money,
    pub in_inventory: bool,
    pub is_frozen: bool,
}

impl ReportLine {
    pub fn category_contains(&self, needle: &str) -> bool {
        self.category.to_lowercase().split(';').any(|c| c.trim() == needle.to_lowercase())
    }
}

//-------------------------------------- Reallocation results ---------------------------------------------------------

/// A cart that lost quantity during a stock-change reallocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub user_id: i64,
    pub variation_id: i64,
    pub sku: String,
    pub description: String,
    pub previous_quantity: i64,
    pub new_quantity: i64,
}

/// A cart item removed because its product was withdrawn from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedCartItem {
    pub user_id: i64,
    pub variation_id: i64,
    pub sku: String,
    pub description: String,
    pub quantity: i64,
}
