mod helpers;
mod mocks;

mod admin;
mod cart;
mod payments;
mod profile;
mod webhooks;
