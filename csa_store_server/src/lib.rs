//! # CSA store server
//!
//! The HTTP surface of the member store. It is responsible for:
//! * the member-facing cart, budget, profile and payment endpoints,
//! * receiving payment gateway and e-signature webhooks,
//! * running the weekly cycle worker that closes the ordering window.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: a health check route that returns a 200 OK response.
//! * `/api/...`: authenticated member and admin routes.
//! * `/webhook/gateway`: payment gateway events, HMAC-signed.
//! * `/webhook/signrequest`: membership agreement signature events.

pub mod auth;
pub mod config;
pub mod cycle_worker;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
