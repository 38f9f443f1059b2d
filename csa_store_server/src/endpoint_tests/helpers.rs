use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{Duration, Utc};
use csa_common::Secret;
use log::debug;
use serde::Serialize;

use crate::{
    auth::{issue_token, Role, AUTH_HEADER},
    middleware::AuthMiddlewareFactory,
};

// Test signing secret for issuing tokens. DO NOT re-use this key anywhere.
pub const TEST_API_SECRET: &str = "test-only-api-secret-0123456789abcdefghij";

pub fn member_token(user_id: i64) -> String {
    issue_token(user_id, &[Role::Member], Utc::now() + Duration::hours(1), TEST_API_SECRET).unwrap()
}

pub fn admin_token(user_id: i64) -> String {
    issue_token(user_id, &[Role::Member, Role::Admin], Utc::now() + Duration::hours(1), TEST_API_SECRET).unwrap()
}

pub async fn get_request(
    auth_header: &str,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::get().uri(path);
    if !auth_header.is_empty() {
        req = req.insert_header((AUTH_HEADER, auth_header));
    }
    debug!("GET {path}");
    call_authenticated(req, configure).await
}

pub async fn post_request<T: Serialize>(
    auth_header: &str,
    path: &str,
    body: &T,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post().uri(path).set_json(body);
    if !auth_header.is_empty() {
        req = req.insert_header((AUTH_HEADER, auth_header));
    }
    debug!("POST {path}");
    call_authenticated(req, configure).await
}

/// Webhook endpoints sit outside the access-token scope, so the app is built without the auth
/// middleware. The body goes through verbatim; signature headers are the caller's problem.
pub async fn webhook_request(
    path: &str,
    body: String,
    headers: Vec<(&'static str, String)>,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body);
    for (name, value) in headers {
        req = req.insert_header((name, value));
    }
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    extract_response(test::try_call_service(&service, req.to_request()).await)
}

async fn call_authenticated(
    req: TestRequest,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let app = App::new()
        .wrap(AuthMiddlewareFactory::new(Secret::new(TEST_API_SECRET.to_string())))
        .configure(configure);
    let service = test::init_service(app).await;
    extract_response(test::try_call_service(&service, req.to_request()).await)
}

fn extract_response<B: MessageBody>(
    result: Result<actix_web::dev::ServiceResponse<B>, actix_web::Error>,
) -> Result<(StatusCode, String), String> {
    let (_, res) = result.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let bytes = res.into_body().try_into_bytes().map_err(|_| "Could not read response body".to_string())?;
    Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
}
