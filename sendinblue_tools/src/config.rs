use csa_common::Secret;
use log::*;

#[derive(Debug, Clone)]
pub struct SendinblueConfig {
    pub api_key: Secret<String>,
    pub sender_name: String,
    pub sender_email: String,
    /// Consecutive 5xx responses before the client reports itself unhealthy.
    pub error_threshold: u32,
}

impl Default for SendinblueConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::default(),
            sender_name: "CSA Store".to_string(),
            sender_email: "store@example.com".to_string(),
            error_threshold: 5,
        }
    }
}

impl SendinblueConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_key = Secret::new(std::env::var("CSA_SENDINBLUE_API_KEY").unwrap_or_else(|_| {
            warn!("CSA_SENDINBLUE_API_KEY not set, using (probably useless) default");
            "xkeysib-00000000000000".to_string()
        }));
        let sender_name = std::env::var("CSA_MAIL_SENDER_NAME").unwrap_or_else(|_| "CSA Store".to_string());
        let sender_email = std::env::var("CSA_MAIL_SENDER_EMAIL").unwrap_or_else(|_| {
            warn!("CSA_MAIL_SENDER_EMAIL not set, using store@example.com as default");
            "store@example.com".to_string()
        });
        let error_threshold = std::env::var("CSA_MAIL_ERROR_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        Self { api_key, sender_name, sender_email, error_threshold }
    }
}
