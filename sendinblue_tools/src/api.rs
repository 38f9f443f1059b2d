use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
    StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{Contact, ContactUpdate, SendinblueApiError, SendinblueConfig, TransactionalEmail};

const BASE_URL: &str = "https://api.brevo.com/v3";

/// Transactional-mail and contact-list client.
///
/// The client keeps a consecutive-server-error count so callers can notice a degraded mail
/// service: every 5xx response increments it, any success resets it.
#[derive(Clone)]
pub struct SendinblueApi {
    config: SendinblueConfig,
    client: Arc<Client>,
    consecutive_errors: Arc<AtomicU32>,
}

impl SendinblueApi {
    pub fn new(config: SendinblueConfig) -> Result<Self, SendinblueApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| SendinblueApiError::Initialization(e.to_string()))?;
        headers.insert("api-key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SendinblueApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), consecutive_errors: Arc::new(AtomicU32::new(0)) })
    }

    pub fn consecutive_server_errors(&self) -> u32 {
        self.consecutive_errors.load(Ordering::Relaxed)
    }

    pub fn is_degraded(&self) -> bool {
        self.consecutive_server_errors() >= self.config.error_threshold
    }

    async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, SendinblueApiError> {
        let url = format!("{BASE_URL}{path}");
        trace!("✉️ Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| SendinblueApiError::RestResponseError(e.to_string()))?;
        let status = response.status();
        if status.is_server_error() {
            let n = self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("✉️ Mail service returned {status}. {n} consecutive server errors.");
        } else {
            self.consecutive_errors.store(0, Ordering::Relaxed);
        }
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return serde_json::from_value(Value::Null)
                    .map_err(|e| SendinblueApiError::JsonError(e.to_string()));
            }
            response.json::<T>().await.map_err(|e| SendinblueApiError::JsonError(e.to_string()))
        } else {
            let message =
                response.text().await.map_err(|e| SendinblueApiError::RestResponseError(e.to_string()))?;
            Err(SendinblueApiError::QueryError { status: status.as_u16(), message })
        }
    }

    pub async fn send_transactional(&self, email: TransactionalEmail) -> Result<String, SendinblueApiError> {
        debug!("✉️ Sending \"{}\" to {}", email.subject, email.to);
        let mut to = json!({ "email": email.to });
        if let Some(name) = &email.to_name {
            to["name"] = json!(name);
        }
        let body = json!({
            "sender": { "name": self.config.sender_name, "email": self.config.sender_email },
            "to": [to],
            "subject": email.subject,
            "htmlContent": email.html_content,
        });
        let result = self.rest_query::<Value>(Method::POST, "/smtp/email", Some(body)).await?;
        let message_id = result["messageId"].as_str().unwrap_or_default().to_string();
        info!("✉️ Sent \"{}\" to {}: {message_id}", email.subject, email.to);
        Ok(message_id)
    }

    pub async fn get_contact(&self, email: &str) -> Result<Option<Contact>, SendinblueApiError> {
        let path = format!("/contacts/{email}");
        match self.rest_query::<Contact>(Method::GET, &path, None).await {
            Ok(contact) => Ok(Some(contact)),
            Err(SendinblueApiError::QueryError { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Bring a contact's list membership and attributes in line with the desired state, creating
    /// the contact if needed. Idempotent: when the remote contact already matches, no write is
    /// issued at all.
    pub async fn update_or_add_contact(
        &self,
        email: &str,
        attributes: HashMap<String, Value>,
        add_lists: &[i64],
        remove_lists: &[i64],
    ) -> Result<ContactUpdate, SendinblueApiError> {
        let existing = self.get_contact(email).await?;
        let update = plan_update(existing.as_ref(), &attributes, add_lists, remove_lists);
        if update.is_noop() {
            trace!("✉️ Contact {email} already up to date");
            return Ok(update);
        }
        if update.create {
            debug!("✉️ Creating contact {email}");
            let body = json!({
                "email": email,
                "attributes": attributes,
                "listIds": update.link_lists,
                "updateEnabled": true,
            });
            self.rest_query::<Value>(Method::POST, "/contacts", Some(body)).await?;
        } else {
            debug!(
                "✉️ Updating contact {email}: +{:?} -{:?}",
                update.link_lists, update.unlink_lists
            );
            let path = format!("/contacts/{email}");
            let body = json!({
                "attributes": attributes,
                "listIds": update.link_lists,
                "unlinkListIds": update.unlink_lists,
            });
            self.rest_query::<Value>(Method::PUT, &path, Some(body)).await?;
        }
        info!("✉️ Contact {email} synced");
        Ok(update)
    }
}

fn plan_update(
    existing: Option<&Contact>,
    attributes: &HashMap<String, Value>,
    add_lists: &[i64],
    remove_lists: &[i64],
) -> ContactUpdate {
    match existing {
        None => ContactUpdate {
            create: true,
            link_lists: add_lists.to_vec(),
            unlink_lists: Vec::new(),
            set_attributes: !attributes.is_empty(),
        },
        Some(contact) => {
            let link_lists: Vec<i64> =
                add_lists.iter().copied().filter(|id| !contact.list_ids.contains(id)).collect();
            let unlink_lists: Vec<i64> =
                remove_lists.iter().copied().filter(|id| contact.list_ids.contains(id)).collect();
            let set_attributes = attributes.iter().any(|(k, v)| contact.attributes.get(k) != Some(v));
            ContactUpdate { create: false, link_lists, unlink_lists, set_attributes }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn contact(lists: &[i64]) -> Contact {
        Contact { email: "member@test.example".to_string(), list_ids: lists.to_vec(), attributes: HashMap::new() }
    }

    #[test]
    fn missing_contact_is_created_with_the_target_lists() {
        let update = plan_update(None, &HashMap::new(), &[3, 7], &[4]);
        assert!(update.create);
        assert_eq!(update.link_lists, vec![3, 7]);
        assert!(update.unlink_lists.is_empty());
    }

    #[test]
    fn dropsite_switch_moves_between_lists() {
        let update = plan_update(Some(&contact(&[4])), &HashMap::new(), &[3], &[4]);
        assert_eq!(update.link_lists, vec![3]);
        assert_eq!(update.unlink_lists, vec![4]);
    }

    #[test]
    fn matching_contact_is_a_noop() {
        let update = plan_update(Some(&contact(&[3])), &HashMap::new(), &[3], &[4]);
        assert!(update.is_noop());
    }

    #[test]
    fn attribute_drift_forces_a_write() {
        let mut attributes = HashMap::new();
        attributes.insert("FIRSTNAME".to_string(), json!("Alex"));
        let update = plan_update(Some(&contact(&[3])), &attributes, &[3], &[]);
        assert!(!update.is_noop());
        assert!(update.set_attributes);
    }
}
