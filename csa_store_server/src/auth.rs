//! Access token handling.
//!
//! The storefront authenticates members itself and mints access tokens with the shared `CSA_API_SECRET`.
//! A token is `{user_id}.{roles}.{expiry}.{signature}`, where `roles` is a comma-separated role list,
//! `expiry` is a unix timestamp, and `signature` is the url-safe base64 HMAC-SHA256 of the first three
//! fields (joined by dots) under the shared secret.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{config::AuthConfig, errors::AuthError};

type HmacSha256 = Hmac<Sha256>;

/// The header carrying the access token.
pub const AUTH_HEADER: &str = "csa_access_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Member,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            s => Err(AuthError::PoorlyFormattedToken(format!("Unknown role: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: i64,
    pub roles: Vec<Role>,
    pub expiry: DateTime<Utc>,
}

impl TokenClaims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    config: AuthConfig,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { config: config.clone() }
    }

    pub fn issue(&self, user_id: i64, roles: &[Role]) -> Result<String, AuthError> {
        let expiry = Utc::now() + self.config.token_lifetime;
        issue_token(user_id, roles, expiry, self.config.api_secret.reveal())
    }
}

pub fn issue_token(
    user_id: i64,
    roles: &[Role],
    expiry: DateTime<Utc>,
    secret: &str,
) -> Result<String, AuthError> {
    let roles = roles.iter().map(Role::to_string).collect::<Vec<String>>().join(",");
    let message = format!("{user_id}.{roles}.{}", expiry.timestamp());
    let signature = sign_message(&message, secret)?;
    Ok(format!("{message}.{signature}"))
}

/// Check the token's signature and expiry and return its claims.
pub fn validate_token(token: &str, secret: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 4 {
        return Err(AuthError::PoorlyFormattedToken(format!("Expected 4 fields, got {}", parts.len())));
    }
    let message = format!("{}.{}.{}", parts[0], parts[1], parts[2]);
    let expected = sign_message(&message, secret)?;
    // Signature first, so nothing in a forged token is ever parsed.
    if parts[3] != expected {
        return Err(AuthError::ValidationError("Signature mismatch".to_string()));
    }
    let user_id =
        parts[0].parse::<i64>().map_err(|e| AuthError::PoorlyFormattedToken(format!("Bad user id: {e}")))?;
    let roles = parts[1]
        .split(',')
        .filter(|s| !s.is_empty())
        .map(Role::from_str)
        .collect::<Result<Vec<Role>, AuthError>>()?;
    let ts = parts[2].parse::<i64>().map_err(|e| AuthError::PoorlyFormattedToken(format!("Bad expiry: {e}")))?;
    let expiry = Utc
        .timestamp_opt(ts, 0)
        .single()
        .ok_or_else(|| AuthError::PoorlyFormattedToken(format!("Bad expiry timestamp: {ts}")))?;
    if expiry <= now {
        return Err(AuthError::TokenExpired);
    }
    Ok(TokenClaims { user_id, roles, expiry })
}

fn sign_message(message: &str, secret: &str) -> Result<String, AuthError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AuthError::ValidationError(e.to_string()))?;
    mac.update(message.as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(base64::encode_config(digest, base64::URL_SAFE_NO_PAD))
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    const SECRET: &str = "an-ordinary-test-secret";

    #[test]
    fn round_trip_preserves_the_claims() {
        let expiry = Utc::now() + Duration::hours(2);
        let token = issue_token(42, &[Role::Member, Role::Admin], expiry, SECRET).unwrap();
        let claims = validate_token(&token, SECRET, Utc::now()).unwrap();
        assert_eq!(claims.user_id, 42);
        assert!(claims.has_role(Role::Member));
        assert!(claims.has_role(Role::Admin));
        assert_eq!(claims.expiry.timestamp(), expiry.timestamp());
    }

    #[test]
    fn tampered_user_id_fails_validation() {
        let expiry = Utc::now() + Duration::hours(2);
        let token = issue_token(42, &[Role::Member], expiry, SECRET).unwrap();
        let forged = token.replacen("42.", "1.", 1);
        let err = validate_token(&forged, SECRET, Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
    }

    #[test]
    fn wrong_secret_fails_validation() {
        let expiry = Utc::now() + Duration::hours(2);
        let token = issue_token(42, &[Role::Member], expiry, SECRET).unwrap();
        let err = validate_token(&token, "some-other-secret", Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let expiry = Utc::now() - Duration::minutes(1);
        let token = issue_token(42, &[Role::Member], expiry, SECRET).unwrap();
        let err = validate_token(&token, SECRET, Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn garbage_is_poorly_formatted() {
        let err = validate_token("not-a-token", SECRET, Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::PoorlyFormattedToken(_)));
    }
}
