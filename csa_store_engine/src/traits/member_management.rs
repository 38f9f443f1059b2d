use chrono::{DateTime, Utc};
use csa_common::Money;
use thiserror::Error;

use crate::db_types::{AchStatus, MemberProfile, PaymentMethod};

#[derive(Debug, Clone, Error)]
pub enum MemberError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Member profile {0} not found")]
    NotFound(i64),
    #[error("No member profile with email {0}")]
    EmailNotFound(String),
}

impl From<sqlx::Error> for MemberError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait MemberManagement: Clone {
    async fn fetch_profile(&self, user_id: i64) -> Result<Option<MemberProfile>, MemberError>;

    async fn profile_by_customer_id(&self, customer_id: &str) -> Result<Option<MemberProfile>, MemberError>;

    async fn profile_by_email(&self, email: &str) -> Result<Option<MemberProfile>, MemberError>;

    /// Insert or replace a full profile row, keyed on `user_id`.
    async fn upsert_profile(&self, profile: MemberProfile) -> Result<MemberProfile, MemberError>;

    async fn set_gateway_customer(&self, user_id: i64, customer_id: &str) -> Result<(), MemberError>;

    async fn set_subscription(&self, user_id: i64, subscription_id: Option<&str>) -> Result<(), MemberError>;

    async fn set_contribution(&self, user_id: i64, amount: Money, method: PaymentMethod) -> Result<(), MemberError>;

    async fn set_ach_status(&self, user_id: i64, status: AchStatus) -> Result<(), MemberError>;

    async fn set_paid_signup_fee(&self, user_id: i64, paid: bool) -> Result<(), MemberError>;

    async fn set_start_date(&self, user_id: i64, date: DateTime<Utc>) -> Result<(), MemberError>;

    /// Flip `signed_membership_agreement` for the profile with this email, returning it when found.
    async fn set_agreement_signed_by_email(&self, email: &str) -> Result<Option<MemberProfile>, MemberError>;

    async fn set_drop_site(&self, user_id: i64, drop_site: Option<&str>) -> Result<(), MemberError>;
}
