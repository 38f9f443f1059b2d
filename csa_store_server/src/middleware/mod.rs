mod acl;
mod auth;
mod gateway_signature;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use auth::{AuthMiddlewareFactory, AuthMiddlewareService};
pub use gateway_signature::{GatewaySignatureMiddlewareFactory, GatewaySignatureMiddlewareService};
