use chrono::NaiveDate;
use csa_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// A product was withdrawn from the catalog while this member had it carted; the item has been removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUnavailableEvent {
    pub user_id: i64,
    pub email: String,
    pub description: String,
    pub quantity: i64,
}

/// A stock reduction forced a partial reallocation; the member's carted quantity shrank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReducedEvent {
    pub user_id: i64,
    pub email: String,
    pub sku: String,
    pub description: String,
    pub new_quantity: i64,
}

/// The close job turned this member's cart into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmedEvent {
    pub order: Order,
    pub email: String,
    pub pickup_date: NaiveDate,
}

/// The member's first payment settled; their membership has started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstPaymentEvent {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
}

/// The gateway reported a failed charge. The message is the gateway's user-facing text, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub user_id: i64,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCanceledEvent {
    pub user_id: i64,
    pub email: String,
}

/// An ACH charge entered the ledger as pending; settlement follows by webhook days later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchPendingEvent {
    pub user_id: i64,
    pub email: String,
    pub amount: Money,
}

/// Operator alert: an add-to-cart ran the variation's vendors dry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStockEvent {
    pub sku: String,
    pub description: String,
    pub requested: i64,
    pub available: i64,
}
