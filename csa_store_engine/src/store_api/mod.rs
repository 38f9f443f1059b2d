//! The high-level store APIs. Each API is generic over a backend `B` implementing the traits it needs, so
//! the server (and the tests) can compose them over a single shared [`crate::SqliteDatabase`].

pub mod cart_api;
pub mod catalog_api;
pub mod ledger_api;
pub mod order_close_api;
pub mod payment_api;
pub mod report_api;
pub mod report_objects;
pub mod totals;

pub use cart_api::{validate_discount, CartApi, CartSummary};
pub use catalog_api::CatalogApi;
pub use ledger_api::{remaining_budget, settled_balance, LedgerApi};
pub use order_close_api::{CloseFailure, CloseSummary, OrderCloseApi};
pub use payment_api::PaymentApi;
pub use report_api::{ReportApi, ReportError};
pub use report_objects::ReportSettings;
pub use totals::{cart_totals, CartTotals, DeliveryFees, ScopedDiscount};
