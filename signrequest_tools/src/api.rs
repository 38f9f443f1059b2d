use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{SignRequest, SignRequestApiError, SignRequestConfig};

const BASE_URL: &str = "https://signrequest.com/api/v1";

#[derive(Clone)]
pub struct SignRequestApi {
    config: SignRequestConfig,
    client: Arc<Client>,
}

impl SignRequestApi {
    pub fn new(config: SignRequestConfig) -> Result<Self, SignRequestApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let token = format!("Token {}", config.api_token.reveal());
        let val = HeaderValue::from_str(&token).map_err(|e| SignRequestApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SignRequestApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn api_token(&self) -> &str {
        self.config.api_token.reveal()
    }

    async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, SignRequestApiError> {
        let url = format!("{BASE_URL}{path}");
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| SignRequestApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| SignRequestApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message =
                response.text().await.map_err(|e| SignRequestApiError::RestResponseError(e.to_string()))?;
            Err(SignRequestApiError::QueryError { status, message })
        }
    }

    /// Send the membership agreement to a prospective member for signature.
    pub async fn send_agreement(&self, email: &str, name: &str) -> Result<SignRequest, SignRequestApiError> {
        debug!("Sending membership agreement to {email}");
        let body = json!({
            "template": self.config.template_url,
            "from_email": self.config.from_email,
            "signers": [{ "email": email, "display_name": name }],
        });
        let request = self.rest_query::<SignRequest>(Method::POST, "/signrequest-quick-create/", Some(body)).await?;
        info!("Membership agreement {} sent to {email}", request.uuid);
        Ok(request)
    }

    pub async fn get_signrequest(&self, uuid: &str) -> Result<SignRequest, SignRequestApiError> {
        let path = format!("/signrequests/{uuid}/");
        self.rest_query::<SignRequest>(Method::GET, &path, None).await
    }
}
