//! `PaymentApi` translates gateway events into ledger state. Every entry point is idempotent: the ledger's
//! unique payment key and the settle state machine make webhook replays harmless.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use csa_common::Money;
use log::{debug, info, warn};

use crate::{
    db_types::{AchStatus, MemberProfile, NewPayment, Payment},
    events::{AchPendingEvent, EventProducers, FirstPaymentEvent, PaymentFailedEvent, SubscriptionCanceledEvent},
    traits::{MemberManagement, PaymentError, PaymentGatewayDatabase, SettledPayment},
};

pub struct PaymentApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi")
    }
}

impl<B> PaymentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PaymentApi<B>
where B: PaymentGatewayDatabase + MemberManagement
{
    async fn profile_for_customer(&self, customer_id: &str) -> Result<MemberProfile, PaymentError> {
        self.db
            .profile_by_customer_id(customer_id)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?
            .ok_or_else(|| PaymentError::UnknownCustomer(customer_id.to_string()))
    }

    /// Record an ACH charge that the gateway has initiated but not yet settled. It enters the ledger as
    /// pending and does not count towards the member's budget until it settles.
    pub async fn record_pending_charge(
        &self,
        customer_id: &str,
        amount: Money,
        charge_id: &str,
        payment_date: DateTime<Utc>,
    ) -> Result<Payment, PaymentError> {
        let profile = self.profile_for_customer(customer_id).await?;
        let payment = NewPayment::new(profile.user_id, amount, payment_date).pending().with_charge_id(charge_id);
        let payment = self.db.insert_payment(payment).await?;
        self.call_ach_pending_hook(AchPendingEvent { user_id: profile.user_id, email: profile.email, amount }).await;
        Ok(payment)
    }

    /// A manual ledger credit, outside the gateway. Counts towards the budget immediately.
    pub async fn issue_credit(
        &self,
        user_id: i64,
        amount: Money,
        notes: &str,
        payment_date: DateTime<Utc>,
    ) -> Result<Payment, PaymentError> {
        let payment = NewPayment::new(user_id, amount, payment_date).credit().with_notes(notes);
        let payment = self.db.insert_payment(payment).await?;
        info!("💰️ Issued {amount} credit to user {user_id}");
        Ok(payment)
    }

    /// A successful gateway charge. Signup-fee invoices flip the profile flag and never touch the ledger;
    /// everything else settles against the ledger, emitting the first-payment hook when this is the member's
    /// first settled charge.
    pub async fn charge_settled(
        &self,
        customer_id: &str,
        amount: Money,
        charge_id: &str,
        event_time: DateTime<Utc>,
        description: Option<&str>,
    ) -> Result<Option<SettledPayment>, PaymentError> {
        let profile = self.profile_for_customer(customer_id).await?;
        if description.map(|d| d.to_lowercase().contains("signup")).unwrap_or(false) {
            self.db
                .set_paid_signup_fee(profile.user_id, true)
                .await
                .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;
            info!("💰️ User {} paid the signup fee ({amount})", profile.user_id);
            return Ok(None);
        }
        let settled = self.db.settle_payment(profile.user_id, amount, charge_id, event_time).await?;
        if !settled.newly_settled {
            debug!("💰️ Replayed charge {charge_id} for user {}; nothing to do", profile.user_id);
            return Ok(Some(settled));
        }
        if settled.first_payment {
            if profile.start_date.is_none() {
                self.db
                    .set_start_date(profile.user_id, event_time)
                    .await
                    .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;
            }
            self.call_first_payment_hook(FirstPaymentEvent {
                user_id: profile.user_id,
                email: profile.email,
                first_name: profile.first_name,
            })
            .await;
        }
        Ok(Some(settled))
    }

    /// A failed gateway charge. Nothing enters the ledger; the member is told in the gateway's own words.
    pub async fn charge_failed(&self, customer_id: &str, message: &str) -> Result<(), PaymentError> {
        let profile = self.profile_for_customer(customer_id).await?;
        warn!("💰️ Charge failed for user {}: {message}", profile.user_id);
        self.call_payment_failed_hook(PaymentFailedEvent {
            user_id: profile.user_id,
            email: profile.email,
            message: message.to_string(),
        })
        .await;
        Ok(())
    }

    pub async fn subscription_canceled(&self, customer_id: &str) -> Result<(), PaymentError> {
        let profile = self.profile_for_customer(customer_id).await?;
        self.db
            .set_subscription(profile.user_id, None)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;
        info!("💰️ Subscription for user {} was canceled at the gateway", profile.user_id);
        self.call_subscription_canceled_hook(SubscriptionCanceledEvent {
            user_id: profile.user_id,
            email: profile.email,
        })
        .await;
        Ok(())
    }

    pub async fn ach_status_changed(&self, customer_id: &str, status: AchStatus) -> Result<(), PaymentError> {
        let profile = self.profile_for_customer(customer_id).await?;
        self.db
            .set_ach_status(profile.user_id, status)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    pub async fn payments_for_user(&self, user_id: i64) -> Result<Vec<Payment>, PaymentError> {
        self.db.fetch_payments_for_user(user_id).await
    }

    async fn call_ach_pending_hook(&self, event: AchPendingEvent) {
        for emitter in &self.producers.ach_pending_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_first_payment_hook(&self, event: FirstPaymentEvent) {
        for emitter in &self.producers.first_payment_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_payment_failed_hook(&self, event: PaymentFailedEvent) {
        for emitter in &self.producers.payment_failed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_subscription_canceled_hook(&self, event: SubscriptionCanceledEvent) {
        for emitter in &self.producers.subscription_canceled_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}
