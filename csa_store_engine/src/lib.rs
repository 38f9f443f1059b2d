//! CSA Store Engine
//!
//! The ordering engine behind a single-farm CSA member store. Members load a weekly cart against a running
//! budget; when the ordering window closes, every cart becomes an order, vendors are told what to bring, and
//! the pack shed gets its reports.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the only backend today. You should never
//!    need to touch the database directly; go through the store APIs instead. The exception is the data types
//!    used in the database, which are defined in [`mod@db_types`] and are public.
//! 2. The store traits ([`mod@traits`]). These are the seams a backend implements: catalog, carts, orders,
//!    the budget ledger, payments, discounts and member profiles.
//! 3. The store public API ([`mod@store_api`]). Cart flow with its ordering and budget gates, the weekly
//!    close job, gateway payment handling and the report pipeline. Each API is generic over the traits it
//!    needs.
//!
//! The engine also emits events at the interesting moments (a cart lost stock, an order was written, a first
//! payment settled). A simple actor framework lets callers hook into these events and send mail, post
//! metrics, or anything else, without the engine knowing about it.

pub mod db_types;
pub mod events;
pub mod helpers;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod store_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use store_api::{
    CartApi,
    CartSummary,
    CatalogApi,
    CloseSummary,
    LedgerApi,
    OrderCloseApi,
    PaymentApi,
    ReportApi,
    ReportError,
    ReportSettings,
};
pub use traits::{
    BudgetLedger,
    CartManagement,
    CatalogManagement,
    DiscountManagement,
    MemberManagement,
    OrderManagement,
    PaymentGatewayDatabase,
};
