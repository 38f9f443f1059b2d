use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signer {
    pub email: String,
    #[serde(default)]
    pub signed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequest {
    pub uuid: String,
    #[serde(default)]
    pub signers: Vec<Signer>,
}

/// A webhook event from the signing service. `event_hash` is HMAC-SHA256 over
/// `"{timestamp}{event_type}"`, keyed with the account's API token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequestEvent {
    pub event_type: String,
    pub timestamp: String,
    pub event_hash: String,
    #[serde(default)]
    pub document: Option<EventDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDocument {
    pub uuid: String,
    #[serde(default)]
    pub signrequest: Option<SignRequest>,
}

impl SignRequestEvent {
    /// Email of the first signer who has signed, if the event carries one.
    pub fn signer_email(&self) -> Option<&str> {
        self.document
            .as_ref()
            .and_then(|d| d.signrequest.as_ref())
            .and_then(|sr| sr.signers.iter().find(|s| s.signed))
            .map(|s| s.email.as_str())
    }
}
