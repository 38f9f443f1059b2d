mod api;
mod config;
mod error;
mod webhook;

mod data_objects;
mod helpers;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{BankAccount, Charge, Customer, GatewayEvent, Plan, Source, Subscription};
pub use error::StripeApiError;
pub use helpers::{hex_digest, stripe_amount};
pub use webhook::{construct_event, sign_payload};
