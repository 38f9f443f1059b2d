//! The weekly close: carts become orders, the extra order is synthesized, stock is consumed, carts reset.

use chrono::{Duration, Utc};
use csa_common::Money;
use csa_store_engine::{
    db_types::EXTRA_ORDER_USER_ID,
    events::EventProducers,
    store_api::{CartApi, DeliveryFees, OrderCloseApi},
    traits::{CartManagement, CatalogManagement, MemberManagement, OrderManagement},
    SqliteDatabase,
};

mod support;

use support::{open_window, seed_catalog, seed_member, setup, tear_down};

fn cart_api(db: &SqliteDatabase) -> CartApi<SqliteDatabase> {
    CartApi::new(db.clone(), vec![open_window()], DeliveryFees::default(), EventProducers::default())
}

fn close_api(db: &SqliteDatabase) -> OrderCloseApi<SqliteDatabase> {
    OrderCloseApi::new(db.clone(), DeliveryFees::default(), EventProducers::default())
}

#[tokio::test]
async fn close_converts_every_cart_and_clears_the_store() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    seed_member(&db, 2).await;
    db.set_vendor_stock(catalog.kale, catalog.field_farm, Some(10), 1).await.unwrap();

    let carts = cart_api(&db);
    carts.add_to_cart(1, catalog.kale, 3).await.unwrap();
    carts.add_to_cart(2, catalog.kale, 2).await.unwrap();

    let now = Utc::now();
    let summary = close_api(&db).close_cycle(now).await.unwrap();
    assert_eq!(summary.order_ids.len(), 2);
    assert!(summary.failures.is_empty());
    assert!(db.carted_users().await.unwrap().is_empty());

    let order = db.fetch_order(summary.order_ids[0]).await.unwrap().unwrap();
    assert_eq!(order.user_id, 1);
    assert_eq!(order.item_total, Money::from_cents(1200));
    assert_eq!(order.total, Money::from_cents(1200));
    // pickup is the day after the close
    assert_eq!(order.order_time.date_naive(), (now + Duration::days(1)).date_naive());
    let items = db.fetch_order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].vendor, "Field Farm");
    assert_eq!(items[0].category, "Vegetables");

    // converting consumed the stock
    let stock = db.vendor_variations(catalog.kale).await.unwrap();
    assert_eq!(stock[0].num_in_stock, Some(5));
    tear_down(db).await;
}

#[tokio::test]
async fn extra_order_rounds_the_over_order_factor() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    seed_member(&db, 2).await;
    db.set_vendor_stock(catalog.beef, catalog.field_farm, Some(50), 1).await.unwrap();

    let carts = cart_api(&db);
    // 8 + 7 = 15 lbs carted at a 10% factor -> round(1.5) = 2 extra
    carts.add_to_cart(1, catalog.beef, 8).await.unwrap();
    carts.add_to_cart(2, catalog.beef, 7).await.unwrap();

    let summary = close_api(&db).close_cycle(Utc::now()).await.unwrap();
    let extra_id = summary.extra_order_id.expect("extra order");
    let extra = db.fetch_order(extra_id).await.unwrap().unwrap();
    assert_eq!(extra.user_id, EXTRA_ORDER_USER_ID);
    assert_eq!(extra.drop_site.as_deref(), Some("Farm"));
    let items = db.fetch_order_items(extra_id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].vendor, "Field Farm");

    // the extra order consumed no stock; only the member orders did
    let stock = db.vendor_variations(catalog.beef).await.unwrap();
    assert_eq!(stock[0].num_in_stock, Some(35));
    tear_down(db).await;
}

#[tokio::test]
async fn extra_order_follows_the_vendor_split_past_a_drained_vendor() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    seed_member(&db, 2).await;
    db.set_vendor_stock(catalog.beef, catalog.field_farm, Some(10), 1).await.unwrap();
    db.set_vendor_stock(catalog.beef, catalog.valley_farm, Some(50), 2).await.unwrap();

    // 15 lbs carted: the first 10 drain Field Farm, the next 5 spill to Valley Farm
    let carts = cart_api(&db);
    carts.add_to_cart(1, catalog.beef, 8).await.unwrap();
    carts.add_to_cart(2, catalog.beef, 7).await.unwrap();

    let summary = close_api(&db).close_cycle(Utc::now()).await.unwrap();
    let extra_id = summary.extra_order_id.expect("extra order");
    let items = db.fetch_order_items(extra_id).await.unwrap();
    // the 2 extra lbs must come from the vendor that still has live stock
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].vendor, "Valley Farm");
    assert_eq!(items[0].quantity, 2);
    tear_down(db).await;
}

#[tokio::test]
async fn rerunning_the_close_writes_nothing_new() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    db.set_vendor_stock(catalog.kale, catalog.field_farm, Some(10), 1).await.unwrap();

    cart_api(&db).add_to_cart(1, catalog.kale, 3).await.unwrap();

    let close = close_api(&db);
    let now = Utc::now();
    let first = close.close_cycle(now).await.unwrap();
    assert_eq!(first.order_ids.len(), 1);
    let stock_after_first = db.vendor_variations(catalog.kale).await.unwrap()[0].num_in_stock;

    // all carts are gone, so a second run converts nothing and touches nothing
    let second = close.close_cycle(now).await.unwrap();
    assert!(second.order_ids.is_empty());
    assert!(second.extra_order_id.is_none());
    assert!(second.failures.is_empty());
    assert_eq!(second.carts_cleared, 0);
    let pickup = (now + Duration::days(1)).date_naive();
    assert_eq!(db.orders_for_date(pickup).await.unwrap().len(), 1);
    assert_eq!(db.vendor_variations(catalog.kale).await.unwrap()[0].num_in_stock, stock_after_first);
    tear_down(db).await;
}

#[tokio::test]
async fn no_extra_order_when_nothing_carries_a_factor() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    db.set_vendor_stock(catalog.kale, catalog.field_farm, None, 1).await.unwrap();

    cart_api(&db).add_to_cart(1, catalog.kale, 3).await.unwrap();
    let summary = close_api(&db).close_cycle(Utc::now()).await.unwrap();
    assert!(summary.extra_order_id.is_none());
    tear_down(db).await;
}

#[tokio::test]
async fn weekly_inventory_products_never_consume_stock() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    db.set_vendor_stock(catalog.bread, catalog.field_farm, Some(20), 1).await.unwrap();

    cart_api(&db).add_to_cart(1, catalog.bread, 4).await.unwrap();
    close_api(&db).close_cycle(Utc::now()).await.unwrap();

    let stock = db.vendor_variations(catalog.bread).await.unwrap();
    assert_eq!(stock[0].num_in_stock, Some(20));
    tear_down(db).await;
}

#[tokio::test]
async fn one_broken_cart_does_not_abort_the_cycle() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    db.set_vendor_stock(catalog.kale, catalog.field_farm, None, 1).await.unwrap();

    let carts = cart_api(&db);
    carts.add_to_cart(1, catalog.kale, 2).await.unwrap();
    // user 2 has a cart but no profile
    seed_member(&db, 2).await;
    carts.add_to_cart(2, catalog.kale, 1).await.unwrap();
    sqlx::query("DELETE FROM member_profiles WHERE user_id = 2").execute(db.pool()).await.unwrap();

    let summary = close_api(&db).close_cycle(Utc::now()).await.unwrap();
    assert_eq!(summary.order_ids.len(), 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].user_id, 2);
    // the broken cart is still gone afterwards
    assert!(db.carted_users().await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn dinner_attendance_reroutes_the_order_to_the_farm() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    let mut profile = support::profile_fixture(1);
    profile.drop_site = Some("Farm".to_string());
    db.upsert_profile(profile).await.unwrap();
    db.set_vendor_stock(catalog.kale, catalog.field_farm, None, 1).await.unwrap();

    let carts = cart_api(&db);
    carts.add_to_cart(1, catalog.kale, 1).await.unwrap();
    carts.set_attending_dinner(1, 2).await.unwrap();

    let summary = close_api(&db).close_cycle(Utc::now()).await.unwrap();
    let order = db.fetch_order(summary.order_ids[0]).await.unwrap().unwrap();
    assert_eq!(order.attending_dinner, 2);
    assert_eq!(order.drop_site.as_deref(), Some("Farm"));
    tear_down(db).await;
}
