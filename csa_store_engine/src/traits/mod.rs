//! # Storage backend contracts
//!
//! This module defines the interface contracts a database backend must implement to drive the store engine.
//! Each trait covers one concern:
//!
//! * [`CatalogManagement`] — vendors, products, variations and per-vendor stock rows, including the
//!   stock-change reallocation that keeps live carts inside the new bounds.
//! * [`CartManagement`] — the persistent per-user cart and the vendor-split allocation that backs it.
//! * [`OrderManagement`] — the cart→order conversion at cycle close and the order-item queries the report
//!   pipeline runs on.
//! * [`BudgetLedger`] — payment/order aggregation and the per-user cached remaining budget.
//! * [`PaymentGatewayDatabase`] — idempotent consumption of asynchronous gateway charge events.
//! * [`DiscountManagement`] — discount codes, their product scope, and use counting.
//! * [`MemberManagement`] — member profiles and the gateway/agreement state hanging off them.
mod cart_management;
mod catalog_management;
mod discount_management;
mod ledger;
mod member_management;
mod order_management;
mod payment_gateway_database;

pub use cart_management::{CartError, CartManagement, ExtraOrderQuantity, VendorHolding};
pub use catalog_management::{CatalogError, CatalogManagement};
pub use discount_management::{DiscountError, DiscountManagement};
pub use ledger::{BudgetLedger, LedgerError};
pub use member_management::{MemberError, MemberManagement};
pub use order_management::{OrderError, OrderManagement, StockDecrement};
pub use payment_gateway_database::{PaymentError, PaymentGatewayDatabase, SettledPayment};
