use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    AchPendingEvent,
    EventHandler,
    EventProducer,
    FirstPaymentEvent,
    Handler,
    ItemUnavailableEvent,
    OrderConfirmedEvent,
    OutOfStockEvent,
    PaymentFailedEvent,
    StockReducedEvent,
    SubscriptionCanceledEvent,
};

macro_rules! hook_setter {
    ($name:ident, $event:ty) => {
        pub fn $name<F>(&mut self, f: F) -> &mut Self
        where F: (Fn($event) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
            self.$name = Some(Arc::new(f));
            self
        }
    };
}

#[derive(Default, Clone)]
pub struct EventProducers {
    pub item_unavailable_producer: Vec<EventProducer<ItemUnavailableEvent>>,
    pub stock_reduced_producer: Vec<EventProducer<StockReducedEvent>>,
    pub order_confirmed_producer: Vec<EventProducer<OrderConfirmedEvent>>,
    pub first_payment_producer: Vec<EventProducer<FirstPaymentEvent>>,
    pub payment_failed_producer: Vec<EventProducer<PaymentFailedEvent>>,
    pub subscription_canceled_producer: Vec<EventProducer<SubscriptionCanceledEvent>>,
    pub ach_pending_producer: Vec<EventProducer<AchPendingEvent>>,
    pub out_of_stock_producer: Vec<EventProducer<OutOfStockEvent>>,
}

pub struct EventHandlers {
    pub on_item_unavailable: Option<EventHandler<ItemUnavailableEvent>>,
    pub on_stock_reduced: Option<EventHandler<StockReducedEvent>>,
    pub on_order_confirmed: Option<EventHandler<OrderConfirmedEvent>>,
    pub on_first_payment: Option<EventHandler<FirstPaymentEvent>>,
    pub on_payment_failed: Option<EventHandler<PaymentFailedEvent>>,
    pub on_subscription_canceled: Option<EventHandler<SubscriptionCanceledEvent>>,
    pub on_ach_pending: Option<EventHandler<AchPendingEvent>>,
    pub on_out_of_stock: Option<EventHandler<OutOfStockEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_item_unavailable: hooks.on_item_unavailable.map(|f| EventHandler::new(buffer_size, f)),
            on_stock_reduced: hooks.on_stock_reduced.map(|f| EventHandler::new(buffer_size, f)),
            on_order_confirmed: hooks.on_order_confirmed.map(|f| EventHandler::new(buffer_size, f)),
            on_first_payment: hooks.on_first_payment.map(|f| EventHandler::new(buffer_size, f)),
            on_payment_failed: hooks.on_payment_failed.map(|f| EventHandler::new(buffer_size, f)),
            on_subscription_canceled: hooks.on_subscription_canceled.map(|f| EventHandler::new(buffer_size, f)),
            on_ach_pending: hooks.on_ach_pending.map(|f| EventHandler::new(buffer_size, f)),
            on_out_of_stock: hooks.on_out_of_stock.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_item_unavailable {
            result.item_unavailable_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_stock_reduced {
            result.stock_reduced_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_confirmed {
            result.order_confirmed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_first_payment {
            result.first_payment_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_failed {
            result.payment_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_subscription_canceled {
            result.subscription_canceled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_ach_pending {
            result.ach_pending_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_out_of_stock {
            result.out_of_stock_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        macro_rules! start {
            ($handler:expr) => {
                if let Some(handler) = $handler {
                    tokio::spawn(async move {
                        handler.start_handler().await;
                    });
                }
            };
        }
        start!(self.on_item_unavailable);
        start!(self.on_stock_reduced);
        start!(self.on_order_confirmed);
        start!(self.on_first_payment);
        start!(self.on_payment_failed);
        start!(self.on_subscription_canceled);
        start!(self.on_ach_pending);
        start!(self.on_out_of_stock);
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_item_unavailable: Option<Handler<ItemUnavailableEvent>>,
    pub on_stock_reduced: Option<Handler<StockReducedEvent>>,
    pub on_order_confirmed: Option<Handler<OrderConfirmedEvent>>,
    pub on_first_payment: Option<Handler<FirstPaymentEvent>>,
    pub on_payment_failed: Option<Handler<PaymentFailedEvent>>,
    pub on_subscription_canceled: Option<Handler<SubscriptionCanceledEvent>>,
    pub on_ach_pending: Option<Handler<AchPendingEvent>>,
    pub on_out_of_stock: Option<Handler<OutOfStockEvent>>,
}

impl EventHooks {
    hook_setter!(on_item_unavailable, ItemUnavailableEvent);

    hook_setter!(on_stock_reduced, StockReducedEvent);

    hook_setter!(on_order_confirmed, OrderConfirmedEvent);

    hook_setter!(on_first_payment, FirstPaymentEvent);

    hook_setter!(on_payment_failed, PaymentFailedEvent);

    hook_setter!(on_subscription_canceled, SubscriptionCanceledEvent);

    hook_setter!(on_ach_pending, AchPendingEvent);

    hook_setter!(on_out_of_stock, OutOfStockEvent);
}
