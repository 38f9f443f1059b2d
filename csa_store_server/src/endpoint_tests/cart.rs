use actix_web::{http::StatusCode, web, web::ServiceConfig};
use csa_common::Money;
use csa_store_engine::{
    db_types::CartLine,
    events::EventProducers,
    store_api::DeliveryFees,
    test_utils::profile_fixture,
    CartApi,
};
use serde_json::json;

use super::helpers::{get_request, member_token, post_request};
use crate::{
    data_objects::CartResponse,
    endpoint_tests::mocks::MockStoreDb,
    routes::{AddToCartRoute, CartRoute},
};

#[actix_web::test]
async fn fetch_cart_with_totals() {
    let _ = env_logger::try_init().ok();
    let token = member_token(42);
    let (status, body) = get_request(&token, "/cart", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let cart: CartResponse = serde_json::from_str(&body).expect("Bad cart JSON");
    assert_eq!(cart.lines.len(), 2);
    assert_eq!(cart.attending_dinner, 0);
    // 2 x $3.50 + 1 x $12.00, no discount, no home delivery
    assert_eq!(cart.item_total, Money::from_cents(1900));
    assert_eq!(cart.discount_total, Money::default());
    assert_eq!(cart.shipping_total, Money::default());
    assert_eq!(cart.total, Money::from_cents(1900));
}

#[actix_web::test]
async fn add_to_cart_without_signed_agreement() {
    let _ = env_logger::try_init().ok();
    let token = member_token(7);
    let body = json!({ "variation_id": 10, "quantity": 1 });
    let err = post_request(&token, "/cart", &body, configure_unsigned).await.expect_err("Expected error");
    assert!(err.contains("membership agreement"), "Got: {err}");
}

fn cart_line(cart_item_id: i64, sku: &str, unit_price: Money, quantity: i64) -> CartLine {
    CartLine {
        cart_item_id,
        user_id: 42,
        variation_id: cart_item_id,
        product_id: cart_item_id,
        sku: sku.to_string(),
        description: sku.to_string(),
        category: "Vegetables".to_string(),
        unit_price,
        vendor_price: unit_price,
        quantity,
        in_inventory: false,
        is_frozen: false,
    }
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_profile().returning(|user_id| Ok(Some(profile_fixture(user_id))));
    db.expect_cart_lines().returning(|_| {
        Ok(vec![
            cart_line(1, "CARROTS-1LB", Money::from_cents(350), 2),
            cart_line(2, "HONEY-16OZ", Money::from_cents(1200), 1),
        ])
    });
    db.expect_fetch_cart().returning(|_| Ok(None));
    let api = CartApi::new(db, vec![], DeliveryFees::default(), EventProducers::default());
    cfg.service(CartRoute::<MockStoreDb>::new()).app_data(web::Data::new(api));
}

fn configure_unsigned(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_profile().returning(|user_id| {
        let mut profile = profile_fixture(user_id);
        profile.signed_membership_agreement = false;
        Ok(Some(profile))
    });
    let api = CartApi::new(db, vec![], DeliveryFees::default(), EventProducers::default());
    cfg.service(AddToCartRoute::<MockStoreDb>::new()).app_data(web::Data::new(api));
}
