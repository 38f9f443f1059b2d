use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use csa_store_engine::{db_types::MemberProfile, test_utils::profile_fixture};
use log::debug;

use super::helpers::{get_request, member_token, TEST_API_SECRET};
use crate::{
    auth::{issue_token, Role},
    endpoint_tests::mocks::MockStoreDb,
    routes::{MemberApi, MyProfileRoute},
};

#[actix_web::test]
async fn fetch_my_profile_no_token() {
    let _ = env_logger::try_init().ok();
    let err = get_request("", "/profile", configure).await.expect_err("Expected error");
    assert!(err.contains("No access token"), "Got: {err}");
}

#[actix_web::test]
async fn fetch_my_profile_expired_token() {
    let _ = env_logger::try_init().ok();
    let expired = Utc::now() - Duration::hours(2);
    let token = issue_token(42, &[Role::Member], expired, TEST_API_SECRET).unwrap();
    debug!("Calling /profile with expired token {token}");
    let err = get_request(&token, "/profile", configure).await.expect_err("Expected error");
    assert!(err.contains("expired"), "Got: {err}");
}

#[actix_web::test]
async fn fetch_my_profile_tampered_token() {
    let _ = env_logger::try_init().ok();
    let token = member_token(42);
    // A different user id invalidates the signature
    let forged = token.replacen("42", "1", 1);
    let err = get_request(&forged, "/profile", configure).await.expect_err("Expected error");
    assert!(err.contains("signature is invalid"), "Got: {err}");
}

#[actix_web::test]
async fn fetch_my_profile() {
    let _ = env_logger::try_init().ok();
    let token = member_token(42);
    let (status, body) = get_request(&token, "/profile", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let profile: MemberProfile = serde_json::from_str(&body).expect("Bad profile JSON");
    assert_eq!(profile.user_id, 42);
    assert_eq!(profile.email, "member42@test.example");
}

#[actix_web::test]
async fn fetch_my_profile_unknown_member() {
    let _ = env_logger::try_init().ok();
    let token = member_token(99);
    let err = get_request(&token, "/profile", configure_no_profile).await.expect_err("Expected error");
    assert!(err.contains("Member profile 99"), "Got: {err}");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_profile().returning(|user_id| Ok(Some(profile_fixture(user_id))));
    cfg.service(MyProfileRoute::<MockStoreDb>::new()).app_data(web::Data::new(MemberApi::new(db)));
}

fn configure_no_profile(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_profile().returning(|_| Ok(None));
    cfg.service(MyProfileRoute::<MockStoreDb>::new()).app_data(web::Data::new(MemberApi::new(db)));
}
