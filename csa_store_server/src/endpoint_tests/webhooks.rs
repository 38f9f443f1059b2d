use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use csa_common::Secret;
use csa_store_engine::{
    db_types::Payment,
    events::EventProducers,
    test_utils::profile_fixture,
    traits::SettledPayment,
};
use serde_json::json;
use signrequest_tools::{event_hash, SignRequestApi, SignRequestConfig};
use stripe_tools::{sign_payload, StripeApi, StripeConfig};

use super::helpers::webhook_request;
use crate::{
    config::PaymentFees,
    endpoint_tests::mocks::MockStoreDb,
    integrations::gateway::PaymentService,
    middleware::GatewaySignatureMiddlewareFactory,
    routes::{GatewayWebhookRoute, MemberApi, SignrequestWebhookRoute},
};

// Test-only gateway and signing credentials. DO NOT re-use these anywhere.
const WEBHOOK_SECRET: &str = "whsec_test_0123456789abcdef";
const SIGNING_TOKEN: &str = "sr_test_token_0123456789abcdef";

#[actix_web::test]
async fn gateway_webhook_rejects_unsigned_requests() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "id": "evt_1", "type": "charge.succeeded", "created": 0, "data": { "object": {} } });
    let err = webhook_request("/webhook/gateway", body.to_string(), vec![], configure_gateway)
        .await
        .expect_err("Expected error");
    assert!(err.contains("No gateway signature"), "Got: {err}");
}

#[actix_web::test]
async fn gateway_webhook_rejects_a_forged_signature() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "id": "evt_1", "type": "charge.succeeded", "created": 0, "data": { "object": {} } });
    let headers = vec![("Stripe-Signature", format!("t={},v1=deadbeef", Utc::now().timestamp()))];
    let err = webhook_request("/webhook/gateway", body.to_string(), headers, configure_gateway)
        .await
        .expect_err("Expected error");
    assert!(err.contains("Invalid gateway signature"), "Got: {err}");
}

#[actix_web::test]
async fn gateway_webhook_settles_a_signed_charge() {
    let _ = env_logger::try_init().ok();
    let created = Utc::now().timestamp();
    let payload = json!({
        "id": "evt_42",
        "type": "charge.succeeded",
        "created": created,
        "data": { "object": {
            "id": "ch_42",
            "amount": 2500,
            "currency": "usd",
            "customer": "cus_42",
            "status": "succeeded",
            "created": created,
        }},
    })
    .to_string();
    let timestamp = Utc::now().timestamp();
    let signature = sign_payload(&payload, timestamp, WEBHOOK_SECRET).unwrap();
    let headers = vec![("Stripe-Signature", format!("t={timestamp},v1={signature}"))];
    let (status, body) =
        webhook_request("/webhook/gateway", payload, headers, configure_gateway).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"success\":true"), "Got: {body}");
    assert!(body.contains("ch_42"), "Got: {body}");
}

#[actix_web::test]
async fn signing_webhook_rejects_a_forged_hash() {
    let _ = env_logger::try_init().ok();
    let event = json!({
        "event_type": "signed",
        "timestamp": "1724400000",
        "event_hash": "deadbeef",
    });
    let (status, body) = webhook_request("/webhook/signrequest", event.to_string(), vec![], configure_signing)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Invalid event hash"), "Got: {body}");
}

#[actix_web::test]
async fn signing_webhook_ignores_other_events() {
    let _ = env_logger::try_init().ok();
    let hash = event_hash("1724400000", "viewed", SIGNING_TOKEN).unwrap();
    let event = json!({
        "event_type": "viewed",
        "timestamp": "1724400000",
        "event_hash": hash,
    });
    let (status, body) = webhook_request("/webhook/signrequest", event.to_string(), vec![], configure_signing)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Ignored viewed"), "Got: {body}");
}

#[actix_web::test]
async fn signing_webhook_records_the_agreement() {
    let _ = env_logger::try_init().ok();
    let hash = event_hash("1724400000", "signed", SIGNING_TOKEN).unwrap();
    let event = json!({
        "event_type": "signed",
        "timestamp": "1724400000",
        "event_hash": hash,
        "document": {
            "uuid": "doc-1",
            "signrequest": {
                "uuid": "sr-1",
                "signers": [{ "email": "member42@test.example", "signed": true }],
            },
        },
    });
    let (status, body) = webhook_request("/webhook/signrequest", event.to_string(), vec![], configure_signing)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Agreement recorded"), "Got: {body}");
}

fn configure_gateway(cfg: &mut ServiceConfig) {
    let stripe = StripeApi::new(StripeConfig {
        api_key: Secret::new("sk_test_0000".to_string()),
        webhook_secret: Secret::new(WEBHOOK_SECRET.to_string()),
        api_version: "2024-04-10".to_string(),
    })
    .unwrap();
    // PaymentService clones the backend for its PaymentApi; the webhook flow runs on the clone.
    let mut db = MockStoreDb::new();
    db.expect_clone().returning(|| {
        let mut inner = MockStoreDb::new();
        inner.expect_profile_by_customer_id().returning(|_| {
            let mut profile = profile_fixture(42);
            profile.gateway_customer_id = Some("cus_42".to_string());
            profile.start_date = Some(Utc::now());
            Ok(Some(profile))
        });
        inner.expect_settle_payment().returning(|user_id, amount, charge_id, event_time| {
            Ok(SettledPayment {
                payment: Payment {
                    id: 1,
                    user_id,
                    payment_date: event_time,
                    amount,
                    pending: false,
                    is_credit: false,
                    charge_id: Some(charge_id.to_string()),
                    notes: None,
                    created_at: Utc::now(),
                },
                newly_settled: true,
                first_payment: false,
            })
        });
        inner
    });
    let service = PaymentService::new(stripe, db, EventProducers::default(), PaymentFees::default());
    let scope = web::scope("/webhook/gateway")
        .wrap(GatewaySignatureMiddlewareFactory::new(Secret::new(WEBHOOK_SECRET.to_string()), true))
        .app_data(web::Data::new(service))
        .service(GatewayWebhookRoute::<MockStoreDb>::new());
    cfg.service(scope);
}

fn configure_signing(cfg: &mut ServiceConfig) {
    let signer = SignRequestApi::new(SignRequestConfig {
        api_token: Secret::new(SIGNING_TOKEN.to_string()),
        template_url: "https://signrequest.com/api/v1/templates/test/".to_string(),
        from_email: "farm@test.example".to_string(),
    })
    .unwrap();
    let mut db = MockStoreDb::new();
    db.expect_set_agreement_signed_by_email().returning(|email| {
        let mut profile = profile_fixture(42);
        profile.email = email.to_string();
        profile.signed_membership_agreement = true;
        Ok(Some(profile))
    });
    let scope = web::scope("/webhook/signrequest")
        .app_data(web::Data::new(MemberApi::new(db)))
        .app_data(web::Data::new(signer))
        .service(SignrequestWebhookRoute::<MockStoreDb>::new());
    cfg.service(scope);
}
