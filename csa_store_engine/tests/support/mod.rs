//! Shared scaffolding for the integration suites: a throwaway database, a seeded catalog and some fixtures.
#![allow(dead_code)]

use chrono::{Datelike, Utc};
use csa_common::Money;
use csa_store_engine::{
    db_types::{AchStatus, MemberProfile, NewProduct, NewVariation, NewVendor},
    helpers::OrderWindow,
    CatalogManagement,
    MemberManagement,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    debug!("🚀️ Test database ready at {url}");
}

pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("csa_store_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.pool().close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        error!("🚀️ Failed to drop database {url}: {e}");
    }
}

pub fn profile_fixture(user_id: i64) -> MemberProfile {
    MemberProfile {
        user_id,
        first_name: format!("Member{user_id}"),
        last_name: "Test".to_string(),
        email: format!("member{user_id}@test.example"),
        phone: None,
        monthly_contribution: Money::default(),
        payment_method: None,
        gateway_customer_id: None,
        gateway_subscription_id: None,
        ach_status: AchStatus::New,
        paid_signup_fee: true,
        start_date: None,
        drop_site: Some("Farm".to_string()),
        home_delivery: false,
        delivery_address: None,
        delivery_city: None,
        delivery_zip: None,
        delivery_instructions: None,
        signed_membership_agreement: true,
        allow_substitutions: true,
        no_plastic_bags: false,
        can_order_dairy: false,
        weekly_email: true,
        discount_code: None,
        created_at: Utc::now(),
    }
}

/// A window that is open right now (opened yesterday, closes tomorrow) for the "Farm" drop site.
pub fn open_window() -> OrderWindow {
    let today = Utc::now().weekday().number_from_monday();
    let yesterday = if today == 1 { 7 } else { today - 1 };
    let tomorrow = if today == 7 { 1 } else { today + 1 };
    OrderWindow::new(yesterday, "00:00", tomorrow, "23:59", vec!["Farm".to_string()], vec!["97448".to_string()])
        .expect("valid window")
}

/// A window for the "Farm" drop site that is guaranteed closed right now.
pub fn closed_window() -> OrderWindow {
    let today = Utc::now().weekday().number_from_monday();
    let in_two_days = (today + 1) % 7 + 1;
    let in_three_days = (today + 2) % 7 + 1;
    OrderWindow::new(
        in_two_days,
        "00:00",
        in_three_days,
        "00:30",
        vec!["Farm".to_string()],
        vec!["97448".to_string()],
    )
    .expect("valid window")
}

/// Ids handed back by [`seed_catalog`].
pub struct Catalog {
    pub field_farm: i64,
    pub valley_farm: i64,
    pub kale_product: i64,
    pub kale: i64,
    pub beef_product: i64,
    pub beef: i64,
    pub bread_product: i64,
    pub bread: i64,
}

/// Two vendors and three products:
/// - kale: $4.00, Vegetables, no stock edges yet (tests set them)
/// - beef: $12.00, Pasture Raised Meats, frozen, 10% over-order factor
/// - bread: $6.00, Bread, weekly inventory (never consumes stock at close)
pub async fn seed_catalog(db: &SqliteDatabase) -> Catalog {
    let field_farm = db
        .upsert_vendor(NewVendor { title: "Field Farm".into(), email: None, auto_send_order: false })
        .await
        .expect("vendor")
        .id;
    let valley_farm = db
        .upsert_vendor(NewVendor { title: "Valley Farm".into(), email: None, auto_send_order: false })
        .await
        .expect("vendor")
        .id;
    let kale_product = db
        .upsert_product(NewProduct {
            title: "Kale".into(),
            slug: "kale".into(),
            available: true,
            in_inventory: false,
            weekly_inventory: false,
            is_dairy: false,
            order_on_invoice: None,
            categories: vec!["Vegetables".into()],
        })
        .await
        .expect("product")
        .id;
    let kale = db
        .upsert_variation(NewVariation {
            product_id: kale_product,
            sku: "kale-bunch".into(),
            title: None,
            unit_price: Money::from_cents(400),
            vendor_price: Money::from_cents(250),
            is_frozen: false,
            extra_percent: 0,
            is_default: true,
        })
        .await
        .expect("variation")
        .id;
    let beef_product = db
        .upsert_product(NewProduct {
            title: "Ground Beef".into(),
            slug: "ground-beef".into(),
            available: true,
            in_inventory: true,
            weekly_inventory: false,
            is_dairy: false,
            order_on_invoice: None,
            categories: vec!["Pasture Raised Meats".into()],
        })
        .await
        .expect("product")
        .id;
    let beef = db
        .upsert_variation(NewVariation {
            product_id: beef_product,
            sku: "beef-lb".into(),
            title: Some("1 lb".into()),
            unit_price: Money::from_cents(1200),
            vendor_price: Money::from_cents(900),
            is_frozen: true,
            extra_percent: 10,
            is_default: true,
        })
        .await
        .expect("variation")
        .id;
    let bread_product = db
        .upsert_product(NewProduct {
            title: "Sourdough".into(),
            slug: "sourdough".into(),
            available: true,
            in_inventory: false,
            weekly_inventory: true,
            is_dairy: false,
            order_on_invoice: None,
            categories: vec!["Bread".into()],
        })
        .await
        .expect("product")
        .id;
    let bread = db
        .upsert_variation(NewVariation {
            product_id: bread_product,
            sku: "sourdough-loaf".into(),
            title: None,
            unit_price: Money::from_cents(600),
            vendor_price: Money::from_cents(400),
            is_frozen: false,
            extra_percent: 0,
            is_default: true,
        })
        .await
        .expect("variation")
        .id;
    Catalog { field_farm, valley_farm, kale_product, kale, beef_product, beef, bread_product, bread }
}

/// Insert a member profile with the standard fixture defaults.
pub async fn seed_member(db: &SqliteDatabase, user_id: i64) -> MemberProfile {
    db.upsert_profile(profile_fixture(user_id)).await.expect("profile")
}
