use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use csa_common::Money;
use csa_store_engine::{
    db_types::Payment,
    events::EventProducers,
    store_api::DeliveryFees,
    OrderCloseApi,
    PaymentApi,
};
use serde_json::json;

use super::helpers::{admin_token, member_token, post_request};
use crate::endpoint_tests::mocks::MockStoreDb;
use crate::routes::{CloseCycleRoute, IssueCreditRoute};

#[actix_web::test]
async fn members_cannot_close_the_cycle() {
    let _ = env_logger::try_init().ok();
    let token = member_token(42);
    let err = post_request(&token, "/close", &json!({}), configure_close).await.expect_err("Expected error");
    assert!(err.contains("Insufficient permissions"), "Got: {err}");
}

#[actix_web::test]
async fn admins_close_an_empty_cycle() {
    let _ = env_logger::try_init().ok();
    let token = admin_token(1);
    let (status, body) = post_request(&token, "/close", &json!({}), configure_close).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let summary: serde_json::Value = serde_json::from_str(&body).expect("Bad close JSON");
    assert_eq!(summary["orders"], json!([]));
    assert_eq!(summary["extra_order_id"], json!(null));
    assert_eq!(summary["carts_cleared"], json!(0));
    assert_eq!(summary["failures"], json!([]));
}

#[actix_web::test]
async fn admins_issue_manual_credits() {
    let _ = env_logger::try_init().ok();
    let token = admin_token(1);
    let body = json!({ "user_id": 42, "amount": 2500, "notes": "Returned jar deposit" });
    let (status, body) = post_request(&token, "/credit", &body, configure_credit).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let payment: Payment = serde_json::from_str(&body).expect("Bad payment JSON");
    assert_eq!(payment.user_id, 42);
    assert_eq!(payment.amount, Money::from_cents(2500));
    assert!(payment.is_credit);
}

#[actix_web::test]
async fn members_cannot_issue_credits() {
    let _ = env_logger::try_init().ok();
    let token = member_token(42);
    let body = json!({ "user_id": 42, "amount": 2500 });
    let err = post_request(&token, "/credit", &body, configure_credit).await.expect_err("Expected error");
    assert!(err.contains("Insufficient permissions"), "Got: {err}");
}

fn configure_close(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_extra_order_quantities().returning(|| Ok(vec![]));
    db.expect_carted_users().returning(|| Ok(vec![]));
    db.expect_clear_all_carts().returning(|| Ok(0));
    let api = OrderCloseApi::new(db, DeliveryFees::default(), EventProducers::default());
    cfg.service(CloseCycleRoute::<MockStoreDb>::new()).app_data(web::Data::new(api));
}

fn configure_credit(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_insert_payment().returning(|new| {
        Ok(Payment {
            id: 1,
            user_id: new.user_id,
            payment_date: new.payment_date,
            amount: new.amount,
            pending: new.pending,
            is_credit: new.is_credit,
            charge_id: new.charge_id,
            notes: new.notes,
            created_at: Utc::now(),
        })
    });
    let api = PaymentApi::new(db, EventProducers::default());
    cfg.service(IssueCreditRoute::<MockStoreDb>::new()).app_data(web::Data::new(api));
}
