use actix_web::{http::StatusCode, web, web::ServiceConfig};
use csa_common::{Money, Secret};
use csa_store_engine::{
    db_types::{AchStatus, PaymentMethod},
    events::EventProducers,
    test_utils::profile_fixture,
};
use stripe_tools::{StripeApi, StripeConfig};

use super::helpers::{member_token, post_request};
use crate::{
    config::PaymentFees,
    data_objects::SubscribeRequest,
    endpoint_tests::mocks::MockStoreDb,
    integrations::gateway::PaymentService,
    routes::SubscribeRoute,
};

#[actix_web::test]
async fn ach_subscription_waits_for_verification() {
    let _ = env_logger::try_init().ok();
    let body = SubscribeRequest {
        source_token: "btok_test_1".to_string(),
        amount: Money::from_dollars(250),
        payment_method: "ACH".to_string(),
    };
    let (status, body) = post_request(&member_token(42), "/payment/subscription", &body, configure_ach)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Verify the micro-deposits"), "Got: {body}");
}

fn configure_ach(cfg: &mut ServiceConfig) {
    let stripe = StripeApi::new(StripeConfig {
        api_key: Secret::new("sk_test_0000".to_string()),
        webhook_secret: Secret::new("whsec_test_0000".to_string()),
        api_version: "2024-04-10".to_string(),
    })
    .unwrap();
    let mut db = MockStoreDb::new();
    db.expect_clone().returning(MockStoreDb::new);
    db.expect_fetch_profile().returning(|user_id| {
        let mut profile = profile_fixture(user_id);
        profile.gateway_customer_id = Some("cus_42".to_string());
        Ok(Some(profile))
    });
    db.expect_set_contribution()
        .withf(|_, amount, method| *amount == Money::from_dollars(250) && *method == PaymentMethod::Ach)
        .times(1)
        .returning(|_, _, _| Ok(()));
    db.expect_set_ach_status()
        .withf(|_, status| *status == AchStatus::New)
        .times(1)
        .returning(|_, _| Ok(()));
    // No set_subscription expectation: a bank-account signup must not reach the gateway until the
    // micro-deposits are confirmed, so any such call fails this test.
    let service = PaymentService::new(stripe, db, EventProducers::default(), PaymentFees::default());
    cfg.service(SubscribeRoute::<MockStoreDb>::new()).app_data(web::Data::new(service));
}
