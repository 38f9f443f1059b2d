use csa_common::Secret;
use log::*;

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub api_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub api_version: String,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_key = Secret::new(std::env::var("CSA_STRIPE_API_KEY").unwrap_or_else(|_| {
            warn!("CSA_STRIPE_API_KEY not set, using (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("CSA_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("CSA_STRIPE_WEBHOOK_SECRET not set, using (probably useless) default");
            "whsec_00000000000000".to_string()
        }));
        let api_version = std::env::var("CSA_STRIPE_API_VERSION").unwrap_or_else(|_| {
            warn!("CSA_STRIPE_API_VERSION not set, using 2024-04-10 as default");
            "2024-04-10".to_string()
        });
        Self { api_key, webhook_secret, api_version }
    }
}
