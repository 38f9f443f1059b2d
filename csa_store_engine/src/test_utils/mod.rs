//! Helpers shared between the unit tests and the integration suites.

mod prepare_env;

use chrono::Utc;
use csa_common::Money;

pub use prepare_env::{create_database, prepare_test_env, random_db_path, run_migrations};

use crate::db_types::{AchStatus, MemberProfile};

/// A signed-up member with sane defaults; tweak the fields a test cares about.
pub fn profile_fixture(user_id: i64) -> MemberProfile {
    MemberProfile {
        user_id,
        first_name: format!("Member{user_id}"),
        last_name: "Test".to_string(),
        email: format!("member{user_id}@test.example"),
        phone: None,
        monthly_contribution: Money::default(),
        payment_method: None,
        gateway_customer_id: None,
        gateway_subscription_id: None,
        ach_status: AchStatus::New,
        paid_signup_fee: true,
        start_date: None,
        drop_site: Some("Farm".to_string()),
        home_delivery: false,
        delivery_address: None,
        delivery_city: None,
        delivery_zip: None,
        delivery_instructions: None,
        signed_membership_agreement: true,
        allow_substitutions: true,
        no_plastic_bags: false,
        can_order_dairy: false,
        weekly_email: true,
        discount_code: None,
        created_at: Utc::now(),
    }
}
