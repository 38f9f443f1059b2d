pub mod gateway;
pub mod mailer;
