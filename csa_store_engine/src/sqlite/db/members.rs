//! Member profile rows.

use chrono::{DateTime, Utc};
use csa_common::Money;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{AchStatus, MemberProfile, PaymentMethod},
    traits::MemberError,
};

pub async fn fetch_profile(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<MemberProfile>, MemberError> {
    let profile = sqlx::query_as("SELECT * FROM member_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(profile)
}

pub async fn profile_by_customer_id(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<MemberProfile>, MemberError> {
    let profile = sqlx::query_as("SELECT * FROM member_profiles WHERE gateway_customer_id = $1")
        .bind(customer_id)
        .fetch_optional(conn)
        .await?;
    Ok(profile)
}

pub async fn profile_by_email(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<MemberProfile>, MemberError> {
    let profile =
        sqlx::query_as("SELECT * FROM member_profiles WHERE email = $1").bind(email).fetch_optional(conn).await?;
    Ok(profile)
}

pub async fn upsert_profile(
    profile: MemberProfile,
    conn: &mut SqliteConnection,
) -> Result<MemberProfile, MemberError> {
    let row: MemberProfile = sqlx::query_as(
        r#"
        INSERT INTO member_profiles (user_id, first_name, last_name, email, phone, monthly_contribution,
            payment_method, gateway_customer_id, gateway_subscription_id, ach_status, paid_signup_fee, start_date,
            drop_site, home_delivery, delivery_address, delivery_city, delivery_zip, delivery_instructions,
            signed_membership_agreement, allow_substitutions, no_plastic_bags, can_order_dairy, weekly_email,
            discount_code)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21,
            $22, $23, $24)
        ON CONFLICT (user_id) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            email = excluded.email,
            phone = excluded.phone,
            monthly_contribution = excluded.monthly_contribution,
            payment_method = excluded.payment_method,
            gateway_customer_id = excluded.gateway_customer_id,
            gateway_subscription_id = excluded.gateway_subscription_id,
            ach_status = excluded.ach_status,
            paid_signup_fee = excluded.paid_signup_fee,
            start_date = excluded.start_date,
            drop_site = excluded.drop_site,
            home_delivery = excluded.home_delivery,
            delivery_address = excluded.delivery_address,
            delivery_city = excluded.delivery_city,
            delivery_zip = excluded.delivery_zip,
            delivery_instructions = excluded.delivery_instructions,
            signed_membership_agreement = excluded.signed_membership_agreement,
            allow_substitutions = excluded.allow_substitutions,
            no_plastic_bags = excluded.no_plastic_bags,
            can_order_dairy = excluded.can_order_dairy,
            weekly_email = excluded.weekly_email,
            discount_code = excluded.discount_code
        RETURNING *
        "#,
    )
    .bind(profile.user_id)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(&profile.email)
    .bind(&profile.phone)
    .bind(profile.monthly_contribution)
    .bind(profile.payment_method)
    .bind(&profile.gateway_customer_id)
    .bind(&profile.gateway_subscription_id)
    .bind(profile.ach_status)
    .bind(profile.paid_signup_fee)
    .bind(profile.start_date)
    .bind(&profile.drop_site)
    .bind(profile.home_delivery)
    .bind(&profile.delivery_address)
    .bind(&profile.delivery_city)
    .bind(&profile.delivery_zip)
    .bind(&profile.delivery_instructions)
    .bind(profile.signed_membership_agreement)
    .bind(profile.allow_substitutions)
    .bind(profile.no_plastic_bags)
    .bind(profile.can_order_dairy)
    .bind(profile.weekly_email)
    .bind(&profile.discount_code)
    .fetch_one(conn)
    .await?;
    debug!("👤️ Upserted member profile {} ({})", row.user_id, row.email);
    Ok(row)
}

async fn require_update(res: sqlx::sqlite::SqliteQueryResult, user_id: i64) -> Result<(), MemberError> {
    if res.rows_affected() == 0 {
        return Err(MemberError::NotFound(user_id));
    }
    Ok(())
}

pub async fn set_gateway_customer(
    user_id: i64,
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), MemberError> {
    let res = sqlx::query("UPDATE member_profiles SET gateway_customer_id = $1 WHERE user_id = $2")
        .bind(customer_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    require_update(res, user_id).await
}

pub async fn set_subscription(
    user_id: i64,
    subscription_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), MemberError> {
    let res = sqlx::query("UPDATE member_profiles SET gateway_subscription_id = $1 WHERE user_id = $2")
        .bind(subscription_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    require_update(res, user_id).await
}

pub async fn set_contribution(
    user_id: i64,
    amount: Money,
    method: PaymentMethod,
    conn: &mut SqliteConnection,
) -> Result<(), MemberError> {
    let res = sqlx::query("UPDATE member_profiles SET monthly_contribution = $1, payment_method = $2 WHERE user_id = $3")
        .bind(amount)
        .bind(method)
        .bind(user_id)
        .execute(conn)
        .await?;
    require_update(res, user_id).await
}

pub async fn set_ach_status(user_id: i64, status: AchStatus, conn: &mut SqliteConnection) -> Result<(), MemberError> {
    let res = sqlx::query("UPDATE member_profiles SET ach_status = $1 WHERE user_id = $2")
        .bind(status)
        .bind(user_id)
        .execute(conn)
        .await?;
    require_update(res, user_id).await
}

pub async fn set_paid_signup_fee(user_id: i64, paid: bool, conn: &mut SqliteConnection) -> Result<(), MemberError> {
    let res = sqlx::query("UPDATE member_profiles SET paid_signup_fee = $1 WHERE user_id = $2")
        .bind(paid)
        .bind(user_id)
        .execute(conn)
        .await?;
    require_update(res, user_id).await
}

pub async fn set_start_date(
    user_id: i64,
    date: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), MemberError> {
    let res = sqlx::query("UPDATE member_profiles SET start_date = $1 WHERE user_id = $2")
        .bind(date)
        .bind(user_id)
        .execute(conn)
        .await?;
    require_update(res, user_id).await
}

pub async fn set_agreement_signed_by_email(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<MemberProfile>, MemberError> {
    let profile = sqlx::query_as(
        "UPDATE member_profiles SET signed_membership_agreement = 1 WHERE email = $1 RETURNING *",
    )
    .bind(email)
    .fetch_optional(conn)
    .await?;
    Ok(profile)
}

pub async fn set_drop_site(
    user_id: i64,
    drop_site: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), MemberError> {
    let res = sqlx::query("UPDATE member_profiles SET drop_site = $1 WHERE user_id = $2")
        .bind(drop_site)
        .bind(user_id)
        .execute(conn)
        .await?;
    require_update(res, user_id).await
}
