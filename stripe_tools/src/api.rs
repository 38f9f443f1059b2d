use std::sync::Arc;

use csa_common::{Money, STORE_CURRENCY_CODE_LOWER};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{config::StripeConfig, helpers::stripe_amount, Charge, Customer, Plan, Source, StripeApiError, Subscription};

const BASE_URL: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.api_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        let version =
            HeaderValue::from_str(&config.api_version).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert("Stripe-Version", version);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// The gateway's REST API takes form-encoded bodies and returns JSON.
    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, StripeApiError> {
        let url = format!("{BASE_URL}{path}");
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(query_error(status, message))
        }
    }

    pub async fn create_customer(&self, email: &str, source_token: &str) -> Result<Customer, StripeApiError> {
        debug!("Creating customer for {email}");
        let form = [("email", email.to_string()), ("source", source_token.to_string())];
        let customer = self.rest_query::<Customer>(Method::POST, "/customers", &form).await?;
        info!("Created customer {}", customer.id);
        Ok(customer)
    }

    pub async fn get_customer(&self, customer_id: &str) -> Result<Customer, StripeApiError> {
        let path = format!("/customers/{customer_id}");
        self.rest_query::<Customer>(Method::GET, &path, &[]).await
    }

    /// Attach a new payment source and make it the default. The previous source stays on file at
    /// the gateway; the caller decides what the swap means for ACH verification.
    pub async fn update_source(&self, customer_id: &str, source_token: &str) -> Result<Customer, StripeApiError> {
        debug!("Updating payment source for {customer_id}");
        let path = format!("/customers/{customer_id}");
        let form = [("source", source_token.to_string())];
        let customer = self.rest_query::<Customer>(Method::POST, &path, &form).await?;
        info!("Updated payment source for {customer_id}");
        Ok(customer)
    }

    pub async fn fetch_source(&self, customer_id: &str, source_id: &str) -> Result<Source, StripeApiError> {
        let path = format!("/customers/{customer_id}/sources/{source_id}");
        self.rest_query::<Source>(Method::GET, &path, &[]).await
    }

    /// Submit the two micro-deposit amounts (in cents) that verify an ACH bank account.
    pub async fn verify_source(
        &self,
        customer_id: &str,
        source_id: &str,
        amounts: [i64; 2],
    ) -> Result<Source, StripeApiError> {
        debug!("Verifying source {source_id} for {customer_id}");
        let path = format!("/customers/{customer_id}/sources/{source_id}/verify");
        let form = [("amounts[]", amounts[0].to_string()), ("amounts[]", amounts[1].to_string())];
        let source = self.rest_query::<Source>(Method::POST, &path, &form).await?;
        info!("Source {source_id} verification state: {}", source.status.as_deref().unwrap_or("unknown"));
        Ok(source)
    }

    /// Plans are keyed by their monthly amount, so members on the same contribution share one.
    pub async fn create_plan(&self, plan_id: &str, amount: Money) -> Result<Plan, StripeApiError> {
        debug!("Creating plan {plan_id} for {amount}");
        let form = [
            ("id", plan_id.to_string()),
            ("amount", stripe_amount(amount)),
            ("currency", STORE_CURRENCY_CODE_LOWER.to_string()),
            ("interval", "month".to_string()),
            ("product[name]", "CSA monthly contribution".to_string()),
        ];
        self.rest_query::<Plan>(Method::POST, "/plans", &form).await
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<Plan>, StripeApiError> {
        let path = format!("/plans/{plan_id}");
        match self.rest_query::<Plan>(Method::GET, &path, &[]).await {
            Ok(plan) => Ok(Some(plan)),
            Err(StripeApiError::QueryError { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_subscription(&self, customer_id: &str, plan_id: &str) -> Result<Subscription, StripeApiError> {
        debug!("Creating subscription for {customer_id} on plan {plan_id}");
        let form = [("customer", customer_id.to_string()), ("items[0][plan]", plan_id.to_string())];
        let subscription = self.rest_query::<Subscription>(Method::POST, "/subscriptions", &form).await?;
        info!("Created subscription {} for {customer_id}", subscription.id);
        Ok(subscription)
    }

    /// Swap a subscription onto a new plan without prorating the current period.
    pub async fn update_subscription(&self, subscription_id: &str, plan_id: &str) -> Result<Subscription, StripeApiError> {
        debug!("Moving subscription {subscription_id} to plan {plan_id}");
        let current = self.get_subscription_item(subscription_id).await?;
        let path = format!("/subscriptions/{subscription_id}");
        let form = [
            ("items[0][id]", current),
            ("items[0][plan]", plan_id.to_string()),
            ("proration_behavior", "none".to_string()),
        ];
        self.rest_query::<Subscription>(Method::POST, &path, &form).await
    }

    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<Subscription, StripeApiError> {
        debug!("Cancelling subscription {subscription_id}");
        let path = format!("/subscriptions/{subscription_id}");
        let subscription = self.rest_query::<Subscription>(Method::DELETE, &path, &[]).await?;
        info!("Cancelled subscription {subscription_id}");
        Ok(subscription)
    }

    /// One-off charge against the customer's default source. Card declines come back with the
    /// gateway's user-facing message, verbatim.
    pub async fn charge(
        &self,
        customer_id: &str,
        amount: Money,
        description: &str,
    ) -> Result<Charge, StripeApiError> {
        debug!("Charging {customer_id} {amount}: {description}");
        let form = [
            ("customer", customer_id.to_string()),
            ("amount", stripe_amount(amount)),
            ("currency", STORE_CURRENCY_CODE_LOWER.to_string()),
            ("description", description.to_string()),
        ];
        let charge = self.rest_query::<Charge>(Method::POST, "/charges", &form).await?;
        info!("Charge {} for {customer_id} is {}", charge.id, charge.status);
        Ok(charge)
    }

    async fn get_subscription_item(&self, subscription_id: &str) -> Result<String, StripeApiError> {
        let path = format!("/subscriptions/{subscription_id}");
        let value = self.rest_query::<Value>(Method::GET, &path, &[]).await?;
        value["items"]["data"][0]["id"].as_str().map(String::from).ok_or(StripeApiError::EmptyResponse)
    }

    pub fn webhook_secret(&self) -> &str {
        self.config.webhook_secret.reveal()
    }
}

/// Card errors carry the gateway's member-facing decline message; everything else is opaque.
fn query_error(status: u16, message: String) -> StripeApiError {
    if let Ok(body) = serde_json::from_str::<Value>(&message) {
        let error = &body["error"];
        if error["type"].as_str() == Some("card_error") {
            let msg = error["message"].as_str().unwrap_or("Your card was declined.").to_string();
            return StripeApiError::CardError(msg);
        }
    }
    StripeApiError::QueryError { status, message }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn card_errors_surface_the_gateway_message() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card has insufficient funds."}}"#;
        let err = query_error(402, body.to_string());
        assert!(matches!(err, StripeApiError::CardError(ref m) if m == "Your card has insufficient funds."));
    }

    #[test]
    fn other_errors_stay_opaque() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"No such customer"}}"#;
        let err = query_error(404, body.to_string());
        assert!(matches!(err, StripeApiError::QueryError { status: 404, .. }));
    }
}
