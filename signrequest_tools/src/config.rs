use csa_common::Secret;
use log::*;

#[derive(Debug, Clone, Default)]
pub struct SignRequestConfig {
    pub api_token: Secret<String>,
    /// Template document the membership agreement is sent from.
    pub template_url: String,
    pub from_email: String,
}

impl SignRequestConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_token = Secret::new(std::env::var("CSA_SIGNREQUEST_API_KEY").unwrap_or_else(|_| {
            warn!("CSA_SIGNREQUEST_API_KEY not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let template_url = std::env::var("CSA_SIGNREQUEST_TEMPLATE").unwrap_or_else(|_| {
            warn!("CSA_SIGNREQUEST_TEMPLATE not set, using (probably useless) default");
            "https://signrequest.com/api/v1/templates/00000000/".to_string()
        });
        let from_email = std::env::var("CSA_SIGNREQUEST_FROM_EMAIL").unwrap_or_else(|_| {
            warn!("CSA_SIGNREQUEST_FROM_EMAIL not set, using store@example.com as default");
            "store@example.com".to_string()
        });
        Self { api_token, template_url, from_email }
    }
}
