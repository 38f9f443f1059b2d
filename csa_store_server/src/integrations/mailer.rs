//! Transactional mail integration.
//!
//! [`create_mailer_event_handlers`] wires the engine's event hooks to the mail service, so cart and
//! payment events reach the member's inbox without the engine knowing mail exists. [`ListSync`] keeps the
//! member's contact and mailing-list membership current when their profile changes.

use csa_store_engine::{
    db_types::MemberProfile,
    events::{EventHandlers, EventHooks},
};
use futures::future::BoxFuture;
use log::*;
use sendinblue_tools::{SendinblueApi, SendinblueApiError, SendinblueConfig, TransactionalEmail};
use serde_json::Value;

use crate::config::MailListConfig;

pub const MAILER_EVENT_BUFFER_SIZE: usize = 25;

/// Assigns mail handlers to the engine's event hooks.
///
/// Every handler is fire-and-forget: a mail failure is logged and never propagates back into the
/// ordering flow that raised the event.
pub fn create_mailer_event_handlers(
    config: SendinblueConfig,
    operators: Vec<String>,
) -> Result<EventHandlers, SendinblueApiError> {
    let mut hooks = EventHooks::default();
    let api = SendinblueApi::new(config)?;

    // --- On ItemUnavailable Handler ---
    let api_clone = api.clone();
    hooks.on_item_unavailable(move |ev| {
        let email = TransactionalEmail::new(
            ev.email,
            "An item was removed from your order",
            format!(
                "<p>{} (×{}) is no longer available this week and has been removed from your cart. Your \
                 budget has been adjusted.</p>",
                ev.description, ev.quantity
            ),
        );
        send(api_clone.clone(), email)
    });

    // --- On StockReduced Handler ---
    let api_clone = api.clone();
    hooks.on_stock_reduced(move |ev| {
        let email = TransactionalEmail::new(
            ev.email,
            "Your order quantity was reduced",
            format!(
                "<p>Stock for {} ran short. Your cart now holds {} of them. If the new quantity does not \
                 work for you, you can remove the item before the window closes.</p>",
                ev.description, ev.new_quantity
            ),
        );
        send(api_clone.clone(), email)
    });

    // --- On OrderConfirmed Handler ---
    let api_clone = api.clone();
    hooks.on_order_confirmed(move |ev| {
        let where_line = match (ev.order.home_delivery, &ev.order.drop_site) {
            (true, _) => "It will be delivered to your door.".to_string(),
            (false, Some(site)) => format!("Pick it up at {site}."),
            (false, None) => "Check with the farm for your pickup location.".to_string(),
        };
        let email = TransactionalEmail::new(
            ev.email,
            format!("Your order for {}", ev.pickup_date.format("%A, %B %-d")),
            format!(
                "<p>Your order #{} came to {}. {}</p>",
                ev.order.id, ev.order.total, where_line
            ),
        );
        send(api_clone.clone(), email)
    });

    // --- On FirstPayment Handler ---
    let api_clone = api.clone();
    hooks.on_first_payment(move |ev| {
        let email = TransactionalEmail::new(
            ev.email,
            "Welcome to the farm!",
            format!(
                "<p>Hi {}, your first contribution has settled and your membership has started. The store \
                 opens for you with the next ordering window.</p>",
                ev.first_name
            ),
        )
        .with_name(ev.first_name.clone());
        send(api_clone.clone(), email)
    });

    // --- On PaymentFailed Handler ---
    let api_clone = api.clone();
    hooks.on_payment_failed(move |ev| {
        let email = TransactionalEmail::new(
            ev.email,
            "Your payment did not go through",
            format!(
                "<p>Your latest contribution failed: {}. Please update your payment details in the member \
                 store.</p>",
                ev.message
            ),
        );
        send(api_clone.clone(), email)
    });

    // --- On SubscriptionCanceled Handler ---
    let api_clone = api.clone();
    hooks.on_subscription_canceled(move |ev| {
        let email = TransactionalEmail::new(
            ev.email,
            "Your monthly contribution was canceled",
            "<p>Your monthly contribution has been canceled. Your remaining budget stays available until \
             you spend it. We would love to have you back.</p>"
                .to_string(),
        );
        send(api_clone.clone(), email)
    });

    // --- On AchPending Handler ---
    let api_clone = api.clone();
    hooks.on_ach_pending(move |ev| {
        let email = TransactionalEmail::new(
            ev.email,
            "Your bank transfer is on its way",
            format!(
                "<p>Your contribution of {} has been initiated. Bank transfers take a few business days to \
                 settle; it will count towards your budget once it does.</p>",
                ev.amount
            ),
        );
        send(api_clone.clone(), email)
    });

    // --- On OutOfStock Handler ---
    // The member already saw the refusal at the API; this tells the farm demand outstripped stock.
    let api_clone = api.clone();
    hooks.on_out_of_stock(move |ev| {
        info!("✉️ {} requested {} of {}, only {} left", ev.sku, ev.requested, ev.description, ev.available);
        let api = api_clone.clone();
        let operators = operators.clone();
        Box::pin(async move {
            for operator in &operators {
                let email = TransactionalEmail::new(
                    operator.clone(),
                    format!("Out of stock: {}", ev.sku),
                    format!(
                        "<p>A member asked for {} of {} but only {} remain. Consider restocking or raising \
                         the over-order factor.</p>",
                        ev.requested, ev.description, ev.available
                    ),
                );
                send(api.clone(), email).await;
            }
        })
    });

    Ok(EventHandlers::new(MAILER_EVENT_BUFFER_SIZE, hooks))
}

fn send(api: SendinblueApi, email: TransactionalEmail) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let to = email.to.clone();
        match api.send_transactional(email).await {
            Ok(message_id) => debug!("✉️ Sent {message_id} to {to}"),
            Err(e) => error!("✉️ Could not send mail to {to}. {e}"),
        }
    })
}

//----------------------------------------   Contact list sync   ----------------------------------------

/// Keeps the mail service's contact book in step with member profiles. A drop-site change moves the
/// member onto that site's list and off every other site's list.
#[derive(Clone)]
pub struct ListSync {
    api: SendinblueApi,
    lists: MailListConfig,
}

impl ListSync {
    pub fn new(api: SendinblueApi, lists: MailListConfig) -> Self {
        Self { api, lists }
    }

    pub async fn sync_member(&self, profile: &MemberProfile) -> Result<(), SendinblueApiError> {
        let (add, remove) = self.lists.lists_for(profile.drop_site.as_deref());
        if add.is_empty() && remove.is_empty() {
            return Ok(());
        }
        let attributes = std::collections::HashMap::from([
            ("FIRSTNAME".to_string(), Value::String(profile.first_name.clone())),
            ("LASTNAME".to_string(), Value::String(profile.last_name.clone())),
            ("WEEKLY_EMAIL".to_string(), Value::Bool(profile.weekly_email)),
        ]);
        let update = self.api.update_or_add_contact(&profile.email, attributes, &add, &remove).await?;
        if !update.is_noop() {
            debug!("✉️ Contact {} resynced (drop site: {:?})", profile.email, profile.drop_site);
        }
        Ok(())
    }
}
