//! Webhook event verification.
//!
//! Each event carries an `event_hash`: HMAC-SHA256 over the concatenation of the event timestamp
//! and the event type, keyed with the account's API token. An event whose hash does not match was
//! not produced by the signing service.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{SignRequestApiError, SignRequestEvent};

type HmacSha256 = Hmac<Sha256>;

pub fn event_hash(timestamp: &str, event_type: &str, api_token: &str) -> Result<String, SignRequestApiError> {
    let mut mac = HmacSha256::new_from_slice(api_token.as_bytes())
        .map_err(|e| SignRequestApiError::SignatureError(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(event_type.as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

pub fn verify_event(event: &SignRequestEvent, api_token: &str) -> Result<(), SignRequestApiError> {
    let expected = event_hash(&event.timestamp, &event.event_type, api_token)?;
    if event.event_hash == expected {
        Ok(())
    } else {
        Err(SignRequestApiError::SignatureError(format!(
            "Hash mismatch on {} event at {}",
            event.event_type, event.timestamp
        )))
    }
}
