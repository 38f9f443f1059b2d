//! Server configuration.
//!
//! Everything is loaded from environment variables with the `CSA_` prefix. Structured values (ordering
//! windows, per-zip delivery fees, mailing list assignments) are JSON.

use std::{collections::HashMap, env};

use chrono::Duration;
use csa_common::{Money, Secret};
use csa_store_engine::{helpers::OrderWindow, store_api::DeliveryFees, ReportSettings};
use log::*;
use rand::{distributions::Alphanumeric, Rng};
use sendinblue_tools::SendinblueConfig;
use signrequest_tools::SignRequestConfig;
use stripe_tools::StripeConfig;

const DEFAULT_CSA_HOST: &str = "127.0.0.1";
const DEFAULT_CSA_PORT: u16 = 4480;
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::hours(24);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// The weekly ordering windows, keyed to drop sites and home-delivery zips.
    pub order_windows: Vec<OrderWindow>,
    pub delivery_fees: DeliveryFees,
    pub report_settings: ReportSettings,
    /// When false, gateway webhook signatures are not checked. Only ever disable this in tests.
    pub gateway_webhook_checks: bool,
    pub payment_fees: PaymentFees,
    pub mail_lists: MailListConfig,
    /// Farm staff who get stock alerts and vendor-order send failures.
    pub operator_alerts: Vec<String>,
    pub stripe: StripeConfig,
    pub sendinblue: SendinblueConfig,
    pub signrequest: SignRequestConfig,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Shared with the storefront, which mints member access tokens with it.
    pub api_secret: Secret<String>,
    pub token_lifetime: Duration,
    /// Users who are granted the admin role on top of their member role.
    pub admin_users: Vec<i64>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let secret: String = rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        warn!(
            "🪛️ A random API secret was generated for this run. Tokens minted by the storefront will not \
             validate against it. Set CSA_API_SECRET to the shared secret."
        );
        Self { api_secret: Secret::new(secret), token_lifetime: DEFAULT_TOKEN_LIFETIME, admin_users: Vec::new() }
    }
}

/// Fee policy for one-off charges and new memberships.
#[derive(Clone, Copy, Debug)]
pub struct PaymentFees {
    /// Charged once, when a member starts their first card subscription.
    pub signup_fee: Money,
    /// One-off charges below this are rejected.
    pub minimum_charge: Money,
}

impl Default for PaymentFees {
    fn default() -> Self {
        Self { signup_fee: Money::from_cents(5000), minimum_charge: Money::from_cents(2000) }
    }
}

/// Mailing list assignments for the contact sync: one list for all members, plus one list per drop site.
#[derive(Clone, Debug, Default)]
pub struct MailListConfig {
    pub members_list: Option<i64>,
    pub dropsite_lists: HashMap<String, i64>,
}

impl MailListConfig {
    /// The lists the member belongs on, and the drop-site lists they do not.
    pub fn lists_for(&self, drop_site: Option<&str>) -> (Vec<i64>, Vec<i64>) {
        let mut add = Vec::new();
        let mut remove = Vec::new();
        if let Some(list) = self.members_list {
            add.push(list);
        }
        for (site, list) in &self.dropsite_lists {
            if drop_site == Some(site.as_str()) {
                add.push(*list);
            } else {
                remove.push(*list);
            }
        }
        (add, remove)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CSA_HOST.to_string(),
            port: DEFAULT_CSA_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            order_windows: Vec::new(),
            delivery_fees: DeliveryFees::default(),
            report_settings: ReportSettings::default(),
            gateway_webhook_checks: true,
            payment_fees: PaymentFees::default(),
            mail_lists: MailListConfig::default(),
            operator_alerts: Vec::new(),
            stripe: StripeConfig::default(),
            sendinblue: SendinblueConfig::default(),
            signrequest: SignRequestConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CSA_HOST").ok().unwrap_or_else(|| DEFAULT_CSA_HOST.into());
        let port = env::var("CSA_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CSA_PORT. {e} Using the default, {DEFAULT_CSA_PORT}, instead."
                    );
                    DEFAULT_CSA_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CSA_PORT);
        let database_url = env::var("CSA_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CSA_DATABASE_URL is not set. Please set it to the URL for the store database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting \
                 to the default configuration."
            );
            AuthConfig::default()
        });
        let order_windows = configure_order_windows();
        let delivery_fees = configure_delivery_fees();
        let report_settings = env::var("CSA_REPORT_SETTINGS")
            .ok()
            .and_then(|s| {
                serde_json::from_str::<ReportSettings>(&s)
                    .map_err(|e| error!("🪛️ CSA_REPORT_SETTINGS is not valid JSON. {e} Using the defaults."))
                    .ok()
            })
            .unwrap_or_default();
        let gateway_webhook_checks =
            env::var("CSA_GATEWAY_WEBHOOK_CHECKS").map(|s| &s != "0" && &s != "false").unwrap_or(true);
        if !gateway_webhook_checks {
            warn!("🪛️ Gateway webhook signature checks are DISABLED. Anyone can post payment events.");
        }
        let payment_fees = configure_payment_fees();
        let mail_lists = configure_mail_lists();
        let operator_alerts = configure_operator_alerts();
        Self {
            host,
            port,
            database_url,
            auth,
            order_windows,
            delivery_fees,
            report_settings,
            gateway_webhook_checks,
            payment_fees,
            mail_lists,
            operator_alerts,
            stripe: StripeConfig::new_from_env_or_default(),
            sendinblue: SendinblueConfig::new_from_env_or_default(),
            signrequest: SignRequestConfig::new_from_env_or_default(),
        }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, String> {
        let api_secret = env::var("CSA_API_SECRET").map_err(|_| "CSA_API_SECRET is not set".to_string())?;
        if api_secret.len() < 32 {
            return Err("CSA_API_SECRET must be at least 32 characters long".to_string());
        }
        let token_lifetime = env::var("CSA_TOKEN_LIFETIME_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::hours)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let admin_users = env::var("CSA_ADMIN_USERS")
            .ok()
            .map(|s| {
                s.split(',')
                    .filter_map(|id| {
                        let id = id.trim();
                        if id.is_empty() {
                            return None;
                        }
                        id.parse::<i64>()
                            .map_err(|e| error!("🪛️ Ignoring invalid user id '{id}' in CSA_ADMIN_USERS. {e}"))
                            .ok()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self { api_secret: Secret::new(api_secret), token_lifetime, admin_users })
    }
}

fn configure_order_windows() -> Vec<OrderWindow> {
    let Ok(raw) = env::var("CSA_ORDER_WINDOWS") else {
        error!(
            "🪛️ CSA_ORDER_WINDOWS is not set. No member will be able to order. Set it to a JSON array of \
             ordering windows."
        );
        return Vec::new();
    };
    match serde_json::from_str::<Vec<OrderWindow>>(&raw) {
        Ok(windows) => {
            info!("🪛️ Loaded {} ordering window(s)", windows.len());
            windows
        },
        Err(e) => {
            error!("🪛️ CSA_ORDER_WINDOWS is not a valid window list. {e}. No member will be able to order.");
            Vec::new()
        },
    }
}

fn configure_delivery_fees() -> DeliveryFees {
    let defaults = DeliveryFees::default();
    let default_charge = env::var("CSA_DELIVERY_CHARGE")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .map(Money::from_cents)
        .unwrap_or(defaults.default_charge);
    let free_threshold = env::var("CSA_FREE_DELIVERY_THRESHOLD")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .map(Money::from_cents)
        .unwrap_or(defaults.free_threshold);
    let by_zip = env::var("CSA_DELIVERY_FEES_BY_ZIP")
        .ok()
        .and_then(|s| {
            serde_json::from_str::<HashMap<String, Money>>(&s)
                .map_err(|e| error!("🪛️ CSA_DELIVERY_FEES_BY_ZIP is not a valid JSON map. {e}"))
                .ok()
        })
        .unwrap_or_default();
    DeliveryFees { free_threshold, default_charge, by_zip }
}

fn configure_payment_fees() -> PaymentFees {
    let defaults = PaymentFees::default();
    let signup_fee = env::var("CSA_SIGNUP_FEE_CENTS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .map(Money::from_cents)
        .unwrap_or(defaults.signup_fee);
    let minimum_charge = env::var("CSA_MINIMUM_CHARGE_CENTS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .map(Money::from_cents)
        .unwrap_or(defaults.minimum_charge);
    PaymentFees { signup_fee, minimum_charge }
}

fn configure_operator_alerts() -> Vec<String> {
    let operators: Vec<String> = env::var("CSA_OPERATOR_ALERTS")
        .ok()
        .map(|s| s.split(',').map(str::trim).filter(|e| !e.is_empty()).map(String::from).collect())
        .unwrap_or_default();
    if operators.is_empty() {
        info!("🪛️ CSA_OPERATOR_ALERTS is not set. Stock and vendor-order alerts will only be logged.");
    }
    operators
}

fn configure_mail_lists() -> MailListConfig {
    let members_list = env::var("CSA_MAIL_MEMBER_LIST").ok().and_then(|s| s.parse::<i64>().ok());
    let dropsite_lists = env::var("CSA_MAIL_DROPSITE_LISTS")
        .ok()
        .and_then(|s| {
            serde_json::from_str::<HashMap<String, i64>>(&s)
                .map_err(|e| error!("🪛️ CSA_MAIL_DROPSITE_LISTS is not a valid JSON map. {e}"))
                .ok()
        })
        .unwrap_or_default();
    if members_list.is_none() && dropsite_lists.is_empty() {
        info!("🪛️ No mailing lists configured. Contact list sync is disabled.");
    }
    MailListConfig { members_list, dropsite_lists }
}
