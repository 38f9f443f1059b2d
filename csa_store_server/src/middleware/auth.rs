//! Access token middleware.
//!
//! Wraps the `/api` scope. It validates the `csa_access_token` header against the shared API secret and
//! stores the decoded [`TokenClaims`] in the request extensions, where handlers and the ACL middleware
//! read them. Requests without a valid token are rejected with 401.

use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use chrono::Utc;
use csa_common::Secret;
use futures::future::{ready, LocalBoxFuture, Ready};
use log::debug;

use crate::{
    auth::{validate_token, AUTH_HEADER},
    errors::{AuthError, ServerError},
};

pub struct AuthMiddlewareFactory {
    api_secret: Secret<String>,
}

impl AuthMiddlewareFactory {
    pub fn new(api_secret: Secret<String>) -> Self {
        AuthMiddlewareFactory { api_secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { api_secret: self.api_secret.clone(), service: Rc::new(service) }))
    }
}

pub struct AuthMiddlewareService<S> {
    api_secret: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.api_secret.reveal().clone();
        Box::pin(async move {
            let token = req
                .headers()
                .get(AUTH_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    debug!("🔐️ No access token on request to {}", req.path());
                    ServerError::AuthenticationError(AuthError::ValidationError("No access token".to_string()))
                })?
                .to_string();
            let claims = validate_token(&token, &secret, Utc::now()).map_err(ServerError::AuthenticationError)?;
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
