//! Payment gateway integration.
//!
//! [`PaymentService`] is the single place the server talks to the gateway from. Member-facing payment
//! routes call its methods, and the gateway webhook feeds [`PaymentService::handle_gateway_event`].
//!
//! Settlement is idempotent in the engine, so a charge the server settles synchronously and the same
//! charge arriving later over the webhook reconcile to a single ledger entry.

use chrono::{TimeZone, Utc};
use csa_common::Money;
use csa_store_engine::{
    db_types::{AchStatus, MemberProfile, Payment, PaymentMethod},
    events::EventProducers,
    traits::{MemberManagement, PaymentGatewayDatabase},
    PaymentApi,
};
use log::*;
use stripe_tools::{Charge, GatewayEvent, Source, StripeApi, Subscription};

use crate::{config::PaymentFees, errors::ServerError};

pub struct PaymentService<B> {
    stripe: StripeApi,
    db: B,
    payments: PaymentApi<B>,
    fees: PaymentFees,
}

impl<B> PaymentService<B>
where B: MemberManagement + PaymentGatewayDatabase
{
    pub fn new(stripe: StripeApi, db: B, producers: EventProducers, fees: PaymentFees) -> Self {
        let payments = PaymentApi::new(db.clone(), producers);
        Self { stripe, db, payments, fees }
    }

    async fn profile(&self, user_id: i64) -> Result<MemberProfile, ServerError> {
        self.db
            .fetch_profile(user_id)
            .await?
            .ok_or_else(|| ServerError::NoRecordFound(format!("Member profile {user_id}")))
    }

    /// The member's gateway customer id, creating the customer (and attaching the source) if they have
    /// never paid before.
    async fn customer_id(&self, profile: &MemberProfile, source_token: &str) -> Result<String, ServerError> {
        if let Some(id) = &profile.gateway_customer_id {
            return Ok(id.clone());
        }
        let customer = self.stripe.create_customer(&profile.email, source_token).await?;
        self.db.set_gateway_customer(profile.user_id, &customer.id).await?;
        info!("💳️ Created gateway customer {} for user {}", customer.id, profile.user_id);
        Ok(customer.id)
    }

    /// Start a monthly contribution. Creates the customer and the per-amount plan as needed, subscribes
    /// the member, and records the contribution on their profile. ACH members only record the
    /// contribution here: their gateway subscription starts once micro-deposit verification succeeds, so
    /// this returns `None` for them.
    pub async fn subscribe(
        &self,
        user_id: i64,
        source_token: &str,
        amount: Money,
        method: PaymentMethod,
    ) -> Result<Option<Subscription>, ServerError> {
        let profile = self.profile(user_id).await?;
        if profile.is_subscriber() {
            return Err(ServerError::InvalidRequestBody(format!("User {user_id} already has a subscription")));
        }
        let customer_id = self.customer_id(&profile, source_token).await?;
        self.db.set_contribution(user_id, amount, method).await?;
        if method == PaymentMethod::Ach {
            self.db.set_ach_status(user_id, AchStatus::New).await?;
            info!("💳️ User {user_id} set up a {amount}/month bank contribution, pending verification");
            return Ok(None);
        }
        let plan_id = self.ensure_plan(amount).await?;
        let subscription = self.stripe.create_subscription(&customer_id, &plan_id).await?;
        self.db.set_subscription(user_id, Some(&subscription.id)).await?;
        if !profile.paid_signup_fee && self.fees.signup_fee > Money::default() {
            let charge = self.stripe.charge(&customer_id, self.fees.signup_fee, "Signup fee").await?;
            self.apply_charge(&charge).await?;
            info!("💳️ Charged user {user_id} the {} signup fee", self.fees.signup_fee);
        }
        info!("💳️ User {user_id} subscribed at {amount}/month ({method})");
        Ok(Some(subscription))
    }

    /// Move an existing subscription to a new monthly amount.
    pub async fn update_amount(&self, user_id: i64, amount: Money) -> Result<Subscription, ServerError> {
        let profile = self.profile(user_id).await?;
        let subscription_id = profile
            .gateway_subscription_id
            .as_deref()
            .ok_or_else(|| ServerError::NoRecordFound(format!("User {user_id} has no subscription")))?;
        let plan_id = self.ensure_plan(amount).await?;
        let subscription = self.stripe.update_subscription(subscription_id, &plan_id).await?;
        let method = profile.payment_method.unwrap_or(PaymentMethod::CreditCard);
        self.db.set_contribution(user_id, amount, method).await?;
        info!("💳️ User {user_id} moved their contribution to {amount}/month");
        Ok(subscription)
    }

    /// Replace the member's payment source. A new ACH source restarts micro-deposit verification.
    pub async fn update_source(&self, user_id: i64, source_token: &str) -> Result<(), ServerError> {
        let profile = self.profile(user_id).await?;
        let customer_id = profile
            .gateway_customer_id
            .as_deref()
            .ok_or_else(|| ServerError::NoRecordFound(format!("User {user_id} has no gateway customer")))?;
        self.stripe.update_source(customer_id, source_token).await?;
        if profile.payment_method == Some(PaymentMethod::Ach) {
            self.db.set_ach_status(user_id, AchStatus::New).await?;
        }
        info!("💳️ User {user_id} updated their payment source");
        Ok(())
    }

    /// A one-off charge outside the subscription. Card charges settle synchronously; ACH charges enter
    /// the ledger as pending until the gateway confirms them.
    pub async fn pay_once(&self, user_id: i64, amount: Money, description: &str) -> Result<Charge, ServerError> {
        if amount < self.fees.minimum_charge {
            return Err(ServerError::InvalidRequestBody(format!(
                "The minimum charge is {}",
                self.fees.minimum_charge
            )));
        }
        let profile = self.profile(user_id).await?;
        let customer_id = profile
            .gateway_customer_id
            .as_deref()
            .ok_or_else(|| ServerError::NoRecordFound(format!("User {user_id} has no gateway customer")))?;
        let charge = self.stripe.charge(customer_id, amount, description).await?;
        self.apply_charge(&charge).await?;
        Ok(charge)
    }

    /// Confirm the two micro-deposit amounts against the member's bank account. On a successful
    /// verification the member's monthly subscription is created at the gateway; until then their
    /// contribution exists only on the profile.
    pub async fn verify_ach(&self, user_id: i64, amounts: [i64; 2]) -> Result<AchStatus, ServerError> {
        let profile = self.profile(user_id).await?;
        let customer_id = profile
            .gateway_customer_id
            .as_deref()
            .ok_or_else(|| ServerError::NoRecordFound(format!("User {user_id} has no gateway customer")))?;
        let customer = self.stripe.get_customer(customer_id).await?;
        let source_id = customer
            .default_source
            .ok_or_else(|| ServerError::NoRecordFound(format!("User {user_id} has no payment source")))?;
        let source = self.stripe.verify_source(customer_id, &source_id, amounts).await?;
        let status = ach_status_from_source(&source);
        self.db.set_ach_status(user_id, status).await?;
        info!("💳️ ACH verification for user {user_id}: {status}");
        if subscription_due_on_verification(status, &profile) {
            let plan_id = self.ensure_plan(profile.monthly_contribution).await?;
            let subscription = self.stripe.create_subscription(customer_id, &plan_id).await?;
            self.db.set_subscription(user_id, Some(&subscription.id)).await?;
            info!("💳️ Bank account verified; subscription {} started for user {user_id}", subscription.id);
        }
        Ok(status)
    }

    /// Cancel the member's subscription at the gateway. The profile is cleared immediately; the
    /// `customer.subscription.deleted` webhook that follows is a no-op replay.
    pub async fn cancel_subscription(&self, user_id: i64) -> Result<(), ServerError> {
        let profile = self.profile(user_id).await?;
        let subscription_id = profile
            .gateway_subscription_id
            .as_deref()
            .ok_or_else(|| ServerError::NoRecordFound(format!("User {user_id} has no subscription")))?;
        self.stripe.cancel_subscription(subscription_id).await?;
        self.db.set_subscription(user_id, None).await?;
        info!("💳️ User {user_id} canceled their subscription");
        Ok(())
    }

    async fn ensure_plan(&self, amount: Money) -> Result<String, ServerError> {
        let plan_id = format!("monthly-{}", amount.value());
        if self.stripe.get_plan(&plan_id).await?.is_none() {
            self.stripe.create_plan(&plan_id, amount).await?;
        }
        Ok(plan_id)
    }

    //----------------------------------------   Webhook events   ----------------------------------------

    /// Apply a verified gateway event to the ledger. Replays are harmless: settlement is keyed on
    /// (user, amount, date) and status writes are absolute.
    pub async fn handle_gateway_event(&self, event: &GatewayEvent) -> Result<String, ServerError> {
        debug!("🔔️ Gateway event {} ({})", event.id, event.event_type);
        match event.event_type.as_str() {
            "charge.succeeded" | "charge.pending" | "charge.failed" => {
                let charge = event
                    .object_as::<Charge>()
                    .map_err(|e| ServerError::InvalidRequestBody(format!("Malformed charge object: {e}")))?;
                self.apply_charge(&charge).await?;
                Ok(format!("Processed {} for charge {}", event.event_type, charge.id))
            },
            "customer.source.updated" => {
                let source = event
                    .object_as::<SourceEvent>()
                    .map_err(|e| ServerError::InvalidRequestBody(format!("Malformed source object: {e}")))?;
                let status = ach_status_from_source(&source.source);
                self.payments.ach_status_changed(&source.customer, status).await?;
                Ok(format!("Source for {} is now {status}", source.customer))
            },
            "customer.subscription.deleted" => {
                let subscription = event
                    .object_as::<Subscription>()
                    .map_err(|e| ServerError::InvalidRequestBody(format!("Malformed subscription object: {e}")))?;
                self.payments.subscription_canceled(&subscription.customer).await?;
                Ok(format!("Subscription {} canceled", subscription.id))
            },
            other => {
                debug!("🔔️ Ignoring gateway event type {other}");
                Ok(format!("Ignored {other}"))
            },
        }
    }

    async fn apply_charge(&self, charge: &Charge) -> Result<Option<Payment>, ServerError> {
        let Some(customer_id) = charge.customer.as_deref() else {
            warn!("🔔️ Charge {} has no customer attached; nothing to settle", charge.id);
            return Ok(None);
        };
        let amount = Money::from_cents(charge.amount);
        let event_time = Utc
            .timestamp_opt(charge.created, 0)
            .single()
            .ok_or_else(|| ServerError::InvalidRequestBody(format!("Bad charge timestamp: {}", charge.created)))?;
        match charge.status.as_str() {
            "succeeded" => {
                let settled = self
                    .payments
                    .charge_settled(customer_id, amount, &charge.id, event_time, charge.description.as_deref())
                    .await?;
                Ok(settled.map(|s| s.payment))
            },
            "pending" => {
                let payment =
                    self.payments.record_pending_charge(customer_id, amount, &charge.id, event_time).await?;
                Ok(Some(payment))
            },
            "failed" => {
                let message = charge.failure_message.as_deref().unwrap_or("The charge was declined");
                self.payments.charge_failed(customer_id, message).await?;
                Ok(None)
            },
            other => {
                debug!("🔔️ Charge {} in state {other}; nothing to do", charge.id);
                Ok(None)
            },
        }
    }
}

/// The `customer.source.updated` payload: a source plus the customer it belongs to.
#[derive(Debug, Clone, serde::Deserialize)]
struct SourceEvent {
    customer: String,
    #[serde(flatten)]
    source: Source,
}

/// A verified bank account starts the subscription, but only once, and only for members who actually
/// recorded a monthly contribution at signup.
fn subscription_due_on_verification(status: AchStatus, profile: &MemberProfile) -> bool {
    status == AchStatus::Verified && profile.gateway_subscription_id.is_none() && profile.is_subscriber()
}

fn ach_status_from_source(source: &Source) -> AchStatus {
    match source.status.as_deref() {
        Some("verified") | Some("validated") | Some("chargeable") => AchStatus::Verified,
        Some("verification_failed") | Some("errored") => AchStatus::Failed,
        Some("pending") => AchStatus::Verifying,
        _ => AchStatus::New,
    }
}
