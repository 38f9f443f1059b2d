mod api;
mod config;
mod error;

mod data_objects;

pub use api::SendinblueApi;
pub use config::SendinblueConfig;
pub use data_objects::{Contact, ContactUpdate, TransactionalEmail};
pub use error::SendinblueApiError;
