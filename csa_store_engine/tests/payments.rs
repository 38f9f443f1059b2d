//! The payment ledger: pending ACH charges, idempotent settlement, and gateway event handling.

use chrono::{Duration, Utc};
use csa_common::Money;
use csa_store_engine::{
    db_types::{AchStatus, NewPayment},
    events::EventProducers,
    store_api::PaymentApi,
    traits::{PaymentError, PaymentGatewayDatabase},
    MemberManagement,
    SqliteDatabase,
};

mod support;

use support::{seed_member, setup, tear_down};

fn payment_api(db: &SqliteDatabase) -> PaymentApi<SqliteDatabase> {
    PaymentApi::new(db.clone(), EventProducers::default())
}

async fn seed_customer(db: &SqliteDatabase, user_id: i64, customer_id: &str) {
    seed_member(db, user_id).await;
    db.set_gateway_customer(user_id, customer_id).await.unwrap();
}

#[tokio::test]
async fn duplicate_payment_key_is_rejected() {
    let db = setup().await;
    seed_member(&db, 1).await;
    let date = Utc::now();
    let payment = NewPayment::new(1, Money::from_dollars(50), date);
    db.insert_payment(payment.clone()).await.unwrap();
    let err = db.insert_payment(payment).await.unwrap_err();
    assert!(matches!(err, PaymentError::DuplicatePayment { user_id: 1, .. }), "got {err:?}");
    tear_down(db).await;
}

#[tokio::test]
async fn pending_charge_settles_in_place() {
    let db = setup().await;
    seed_customer(&db, 1, "cus_1").await;
    let api = payment_api(&db);

    let charge_date = Utc::now() - Duration::days(3);
    let pending = api.record_pending_charge("cus_1", Money::from_dollars(100), "ch_1", charge_date).await.unwrap();
    assert!(pending.pending);

    let settled =
        api.charge_settled("cus_1", Money::from_dollars(100), "ch_1", Utc::now(), None).await.unwrap().unwrap();
    assert!(settled.newly_settled);
    assert!(settled.first_payment);
    // same record, same date; only the pending flag flipped
    assert_eq!(settled.payment.id, pending.id);
    assert_eq!(settled.payment.payment_date, pending.payment_date);
    assert!(!settled.payment.pending);
    tear_down(db).await;
}

#[tokio::test]
async fn pending_charge_matches_by_amount_without_a_charge_id() {
    let db = setup().await;
    seed_customer(&db, 1, "cus_1").await;
    let date = Utc::now() - Duration::days(2);
    let pending =
        db.insert_payment(NewPayment::new(1, Money::from_dollars(75), date).pending()).await.unwrap();

    let settled = db.settle_payment(1, Money::from_dollars(75), "ch_77", Utc::now()).await.unwrap();
    assert!(settled.newly_settled);
    assert_eq!(settled.payment.id, pending.id);
    assert_eq!(settled.payment.charge_id.as_deref(), Some("ch_77"));
    tear_down(db).await;
}

#[tokio::test]
async fn replayed_settlement_changes_nothing() {
    let db = setup().await;
    seed_customer(&db, 1, "cus_1").await;
    let api = payment_api(&db);

    let first =
        api.charge_settled("cus_1", Money::from_dollars(60), "ch_9", Utc::now(), None).await.unwrap().unwrap();
    assert!(first.newly_settled);
    let replay =
        api.charge_settled("cus_1", Money::from_dollars(60), "ch_9", Utc::now(), None).await.unwrap().unwrap();
    assert!(!replay.newly_settled);
    assert!(!replay.first_payment);
    assert_eq!(replay.payment.id, first.payment.id);
    assert_eq!(db.fetch_payments_for_user(1).await.unwrap().len(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn fresh_settlement_without_a_pending_predecessor_inserts() {
    let db = setup().await;
    seed_customer(&db, 1, "cus_1").await;
    let api = payment_api(&db);
    let event_time = Utc::now();
    let settled =
        api.charge_settled("cus_1", Money::from_dollars(40), "ch_2", event_time, None).await.unwrap().unwrap();
    assert!(settled.newly_settled);
    assert_eq!(settled.payment.payment_date, event_time);
    tear_down(db).await;
}

#[tokio::test]
async fn only_the_first_settled_charge_is_flagged() {
    let db = setup().await;
    seed_customer(&db, 1, "cus_1").await;
    let api = payment_api(&db);
    let first =
        api.charge_settled("cus_1", Money::from_dollars(10), "ch_a", Utc::now(), None).await.unwrap().unwrap();
    assert!(first.first_payment);
    let second =
        api.charge_settled("cus_1", Money::from_dollars(10), "ch_b", Utc::now(), None).await.unwrap().unwrap();
    assert!(!second.first_payment);
    // the first settlement stamps the membership start date
    let profile = db.fetch_profile(1).await.unwrap().unwrap();
    assert!(profile.start_date.is_some());
    tear_down(db).await;
}

#[tokio::test]
async fn signup_fee_flips_the_flag_and_skips_the_ledger() {
    let db = setup().await;
    let mut profile = support::profile_fixture(1);
    profile.paid_signup_fee = false;
    db.upsert_profile(profile).await.unwrap();
    db.set_gateway_customer(1, "cus_1").await.unwrap();

    let api = payment_api(&db);
    let result = api
        .charge_settled("cus_1", Money::from_dollars(50), "ch_s", Utc::now(), Some("Signup fee"))
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(db.fetch_profile(1).await.unwrap().unwrap().paid_signup_fee);
    assert!(db.fetch_payments_for_user(1).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn unknown_customer_is_an_error() {
    let db = setup().await;
    let api = payment_api(&db);
    let err = api.charge_settled("cus_nope", Money::from_dollars(1), "ch_x", Utc::now(), None).await.unwrap_err();
    assert!(matches!(err, PaymentError::UnknownCustomer(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn subscription_and_ach_events_update_the_profile() {
    let db = setup().await;
    seed_customer(&db, 1, "cus_1").await;
    db.set_subscription(1, Some("sub_1")).await.unwrap();

    let api = payment_api(&db);
    api.ach_status_changed("cus_1", AchStatus::Verified).await.unwrap();
    api.subscription_canceled("cus_1").await.unwrap();

    let profile = db.fetch_profile(1).await.unwrap().unwrap();
    assert_eq!(profile.ach_status, AchStatus::Verified);
    assert!(profile.gateway_subscription_id.is_none());
    tear_down(db).await;
}
