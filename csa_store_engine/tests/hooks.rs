//! Event hooks firing off the store APIs.

use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use chrono::Utc;
use csa_store_engine::{
    events::{EventHandlers, EventHooks},
    store_api::{CartApi, CatalogApi, DeliveryFees, OrderCloseApi, PaymentApi},
    traits::{CatalogManagement, MemberManagement},
};
use csa_common::Money;
use log::info;

mod support;

use support::{open_window, seed_catalog, seed_member, setup, tear_down};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

async fn settle(count: &HookCalled, expected: i32) {
    // handlers run on their own tasks; give them a moment
    for _ in 0..50 {
        if count.count() >= expected {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(count.count(), expected);
}

#[tokio::test]
async fn out_of_stock_hook_fires_on_a_failed_add() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    db.set_vendor_stock(catalog.kale, catalog.field_farm, Some(1), 1).await.unwrap();

    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_out_of_stock(move |ev| {
        info!("🪝️ {ev:?}");
        event_copy.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let carts = CartApi::new(db.clone(), vec![open_window()], DeliveryFees::default(), producers);
    carts.add_to_cart(1, catalog.kale, 5).await.unwrap_err();
    settle(&event, 1).await;
    tear_down(db).await;
}

#[tokio::test]
async fn stock_reduced_hook_reaches_the_affected_member() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    db.set_vendor_stock(catalog.kale, catalog.field_farm, Some(5), 1).await.unwrap();

    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_stock_reduced(move |ev| {
        assert_eq!(ev.user_id, 1);
        assert_eq!(ev.new_quantity, 2);
        event_copy.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let carts =
        CartApi::new(db.clone(), vec![open_window()], DeliveryFees::default(), Default::default());
    carts.add_to_cart(1, catalog.kale, 5).await.unwrap();
    let catalog_api = CatalogApi::new(db.clone(), producers);
    catalog_api.set_vendor_stock(catalog.kale, catalog.field_farm, Some(2), 1).await.unwrap();
    settle(&event, 1).await;
    tear_down(db).await;
}

#[tokio::test]
async fn order_confirmed_hook_fires_per_converted_cart() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    seed_member(&db, 1).await;
    seed_member(&db, 2).await;
    db.set_vendor_stock(catalog.kale, catalog.field_farm, None, 1).await.unwrap();

    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_order_confirmed(move |ev| {
        info!("🪝️ order {} confirmed for {}", ev.order.id, ev.email);
        event_copy.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let carts =
        CartApi::new(db.clone(), vec![open_window()], DeliveryFees::default(), Default::default());
    carts.add_to_cart(1, catalog.kale, 1).await.unwrap();
    carts.add_to_cart(2, catalog.kale, 2).await.unwrap();
    let close = OrderCloseApi::new(db.clone(), DeliveryFees::default(), producers);
    close.close_cycle(Utc::now()).await.unwrap();
    settle(&event, 2).await;
    tear_down(db).await;
}

#[tokio::test]
async fn first_payment_hook_fires_once() {
    let db = setup().await;
    seed_member(&db, 1).await;
    db.set_gateway_customer(1, "cus_1").await.unwrap();

    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_first_payment(move |ev| {
        assert_eq!(ev.user_id, 1);
        event_copy.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let payments = PaymentApi::new(db.clone(), producers);
    payments.charge_settled("cus_1", Money::from_dollars(10), "ch_1", Utc::now(), None).await.unwrap();
    payments.charge_settled("cus_1", Money::from_dollars(10), "ch_2", Utc::now(), None).await.unwrap();
    settle(&event, 1).await;
    // the replay and the second charge never re-fire the hook
    assert_eq!(event.count(), 1);
    tear_down(db).await;
}
