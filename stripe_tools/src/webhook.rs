//! Webhook signature verification.
//!
//! The gateway signs each webhook delivery with a `Stripe-Signature` header of the form
//! `t=<unix time>,v1=<hmac>`, where the HMAC-SHA256 is taken over `"{t}.{body}"` with the
//! endpoint's webhook secret as the key. Events older than the tolerance are rejected to blunt
//! replay of captured deliveries.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    helpers::{hex_bytes, hex_digest},
    GatewayEvent,
    StripeApiError,
};

pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Verify the signature header against the raw request body and deserialize the event.
pub fn construct_event(
    payload: &str,
    signature_header: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<GatewayEvent, StripeApiError> {
    let (timestamp, signature) = parse_header(signature_header)?;
    verify_signature(payload, timestamp, secret, &signature)?;
    let age = now.timestamp() - timestamp;
    if age > SIGNATURE_TOLERANCE_SECS {
        return Err(StripeApiError::SignatureError(format!("Event is {age}s old, outside tolerance")));
    }
    serde_json::from_str(payload).map_err(|e| StripeApiError::JsonError(e.to_string()))
}

/// Constant-time check of the header's hex signature against the expected HMAC.
fn verify_signature(
    payload: &str,
    timestamp: i64,
    secret: &str,
    signature_hex: &str,
) -> Result<(), StripeApiError> {
    let signature = hex_bytes(signature_hex)
        .ok_or_else(|| StripeApiError::SignatureError("Signature mismatch".to_string()))?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeApiError::SignatureError(e.to_string()))?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| StripeApiError::SignatureError("Signature mismatch".to_string()))
}

/// The signed message is the delivery timestamp and the raw body, joined by a dot.
pub fn sign_payload(payload: &str, timestamp: i64, secret: &str) -> Result<String, StripeApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeApiError::SignatureError(e.to_string()))?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    Ok(hex_digest(&mac.finalize().into_bytes()))
}

fn parse_header(header: &str) -> Result<(i64, String), StripeApiError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => {
                timestamp =
                    Some(v.parse::<i64>().map_err(|e| StripeApiError::SignatureError(e.to_string()))?);
            },
            Some(("v1", v)) => signature = Some(v.to_string()),
            _ => {},
        }
    }
    match (timestamp, signature) {
        (Some(t), Some(s)) => Ok((t, s)),
        _ => Err(StripeApiError::SignatureError("Malformed signature header".to_string())),
    }
}
