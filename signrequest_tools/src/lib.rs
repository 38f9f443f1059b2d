mod api;
mod config;
mod error;
mod webhook;

mod data_objects;

pub use api::SignRequestApi;
pub use config::SignRequestConfig;
pub use data_objects::{SignRequest, SignRequestEvent, Signer};
pub use error::SignRequestApiError;
pub use webhook::{event_hash, verify_event};
