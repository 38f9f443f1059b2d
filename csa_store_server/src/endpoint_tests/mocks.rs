use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use csa_common::Money;
use csa_store_engine::{
    db_types::{
        AchStatus,
        Cart,
        CartItem,
        CartLine,
        CartVendorLine,
        DiscountCode,
        MemberProfile,
        NewOrder,
        NewOrderItem,
        NewPayment,
        NewProduct,
        NewVariation,
        NewVendor,
        Order,
        OrderItem,
        Payment,
        PaymentMethod,
        Product,
        ProductVariation,
        RemovedCartItem,
        ReportLine,
        StockShortfall,
        VariationInfo,
        Vendor,
        VendorVariation,
    },
    helpers::PackKeyInfo,
    traits::{
        BudgetLedger,
        CartError,
        CartManagement,
        CatalogError,
        CatalogManagement,
        DiscountError,
        DiscountManagement,
        ExtraOrderQuantity,
        LedgerError,
        MemberError,
        MemberManagement,
        OrderError,
        OrderManagement,
        PaymentError,
        PaymentGatewayDatabase,
        SettledPayment,
        StockDecrement,
        VendorHolding,
    },
};
use mockall::mock;

// The engine traits all have a `Clone` supertrait, so the mock carries a clone expectation too.
// Flows that clone the backend (e.g. `PaymentService`) hand their expectations to the clone.
mock! {
    pub StoreDb {}

    impl Clone for StoreDb {
        fn clone(&self) -> Self;
    }

    impl CartManagement for StoreDb {
        async fn fetch_cart(&self, user_id: i64) -> Result<Option<Cart>, CartError>;
        async fn add_to_cart(&self, user_id: i64, variation_id: i64, delta: i64) -> Result<CartItem, CartError>;
        async fn set_quantity(&self, user_id: i64, cart_item_id: i64, quantity: i64) -> Result<(), CartError>;
        async fn clear_cart(&self, user_id: i64) -> Result<(), CartError>;
        async fn clear_all_carts(&self) -> Result<u64, CartError>;
        async fn set_attending_dinner(&self, user_id: i64, count: i64) -> Result<(), CartError>;
        async fn cart_lines(&self, user_id: i64) -> Result<Vec<CartLine>, CartError>;
        async fn cart_vendor_lines(&self, user_id: i64) -> Result<Vec<CartVendorLine>, CartError>;
        async fn carted_users(&self) -> Result<Vec<i64>, CartError>;
        async fn extra_order_quantities(&self) -> Result<Vec<ExtraOrderQuantity>, CartError>;
        async fn vendor_holdings(&self, variation_id: i64) -> Result<Vec<VendorHolding>, CartError>;
    }

    impl CatalogManagement for StoreDb {
        async fn upsert_vendor(&self, vendor: NewVendor) -> Result<Vendor, CatalogError>;
        async fn fetch_vendor(&self, vendor_id: i64) -> Result<Option<Vendor>, CatalogError>;
        async fn fetch_vendors(&self) -> Result<Vec<Vendor>, CatalogError>;
        async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;
        async fn upsert_variation(&self, variation: NewVariation) -> Result<ProductVariation, CatalogError>;
        async fn set_vendor_stock(&self, variation_id: i64, vendor_id: i64, num_in_stock: Option<i64>, rank: i64) -> Result<VendorVariation, CatalogError>;
        async fn variation_by_sku(&self, sku: &str) -> Result<Option<VariationInfo>, CatalogError>;
        async fn variation_by_id(&self, variation_id: i64) -> Result<Option<VariationInfo>, CatalogError>;
        async fn vendor_variations(&self, variation_id: i64) -> Result<Vec<VendorVariation>, CatalogError>;
        async fn set_product_available(&self, product_id: i64, available: bool) -> Result<Vec<i64>, CatalogError>;
        async fn reallocate_variation(&self, variation_id: i64) -> Result<Vec<StockShortfall>, CatalogError>;
        async fn remove_variations_from_carts(&self, variation_ids: &[i64]) -> Result<Vec<RemovedCartItem>, CatalogError>;
        async fn pack_keys(&self, skus: &[String]) -> Result<HashMap<String, PackKeyInfo>, CatalogError>;
    }

    impl DiscountManagement for StoreDb {
        async fn fetch_discount_code(&self, code: &str) -> Result<Option<DiscountCode>, DiscountError>;
        async fn upsert_discount_code(&self, code: DiscountCode, product_ids: &[i64], category_ids: &[i64]) -> Result<DiscountCode, DiscountError>;
        async fn discount_scope_skus(&self, code_id: i64) -> Result<Vec<String>, DiscountError>;
        async fn decrement_uses(&self, code_id: i64) -> Result<(), DiscountError>;
    }

    impl BudgetLedger for StoreDb {
        async fn payments_total(&self, user_id: i64) -> Result<Money, LedgerError>;
        async fn orders_total(&self, user_id: i64) -> Result<Money, LedgerError>;
        async fn cached_remaining(&self, user_id: i64) -> Result<Option<Money>, LedgerError>;
        async fn write_cached_remaining(&self, user_id: i64, remaining: Money) -> Result<(), LedgerError>;
        async fn mark_budget_dirty(&self, user_id: i64) -> Result<(), LedgerError>;
    }

    impl MemberManagement for StoreDb {
        async fn fetch_profile(&self, user_id: i64) -> Result<Option<MemberProfile>, MemberError>;
        async fn profile_by_customer_id(&self, customer_id: &str) -> Result<Option<MemberProfile>, MemberError>;
        async fn profile_by_email(&self, email: &str) -> Result<Option<MemberProfile>, MemberError>;
        async fn upsert_profile(&self, profile: MemberProfile) -> Result<MemberProfile, MemberError>;
        async fn set_gateway_customer(&self, user_id: i64, customer_id: &str) -> Result<(), MemberError>;
        async fn set_subscription<'a>(&self, user_id: i64, subscription_id: Option<&'a str>) -> Result<(), MemberError>;
        async fn set_contribution(&self, user_id: i64, amount: Money, method: PaymentMethod) -> Result<(), MemberError>;
        async fn set_ach_status(&self, user_id: i64, status: AchStatus) -> Result<(), MemberError>;
        async fn set_paid_signup_fee(&self, user_id: i64, paid: bool) -> Result<(), MemberError>;
        async fn set_start_date(&self, user_id: i64, date: DateTime<Utc>) -> Result<(), MemberError>;
        async fn set_agreement_signed_by_email(&self, email: &str) -> Result<Option<MemberProfile>, MemberError>;
        async fn set_drop_site<'a>(&self, user_id: i64, drop_site: Option<&'a str>) -> Result<(), MemberError>;
    }

    impl OrderManagement for StoreDb {
        async fn convert_cart_to_order(&self, order: NewOrder, items: Vec<NewOrderItem>, stock: Vec<StockDecrement>) -> Result<Order, OrderError>;
        async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderError>;
        async fn orders_for_date(&self, date: NaiveDate) -> Result<Vec<Order>, OrderError>;
        async fn report_lines_for_date(&self, date: NaiveDate) -> Result<Vec<ReportLine>, OrderError>;
    }

    impl PaymentGatewayDatabase for StoreDb {
        async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentError>;
        async fn settle_payment(&self, user_id: i64, amount: Money, charge_id: &str, event_time: DateTime<Utc>) -> Result<SettledPayment, PaymentError>;
        async fn fetch_payments_for_user(&self, user_id: i64) -> Result<Vec<Payment>, PaymentError>;
    }
}
