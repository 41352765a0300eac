use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    CoinsSettledEvent,
    CustomerRequestEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderCreatedEvent,
    OrderStatusChangedEvent,
};

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub request_updated_producer: Vec<EventProducer<CustomerRequestEvent>>,
    pub coins_settled_producer: Vec<EventProducer<CoinsSettledEvent>>,
}

impl EventProducers {
    pub fn publish_order_created(&self, event: OrderCreatedEvent) {
        self.order_created_producer.iter().for_each(|p| p.publish_event(event.clone()));
    }

    pub fn publish_status_changed(&self, event: OrderStatusChangedEvent) {
        self.status_changed_producer.iter().for_each(|p| p.publish_event(event.clone()));
    }

    pub fn publish_request_updated(&self, event: CustomerRequestEvent) {
        self.request_updated_producer.iter().for_each(|p| p.publish_event(event.clone()));
    }

    pub fn publish_coins_settled(&self, event: CoinsSettledEvent) {
        self.coins_settled_producer.iter().for_each(|p| p.publish_event(event.clone()));
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_request_updated: Option<EventHandler<CustomerRequestEvent>>,
    pub on_coins_settled: Option<EventHandler<CoinsSettledEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_status_changed = hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_request_updated = hooks.on_request_updated.map(|f| EventHandler::new(buffer_size, f));
        let on_coins_settled = hooks.on_coins_settled.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_created, on_status_changed, on_request_updated, on_coins_settled }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_request_updated {
            result.request_updated_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_coins_settled {
            result.coins_settled_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_request_updated {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_coins_settled {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_request_updated: Option<Handler<CustomerRequestEvent>>,
    pub on_coins_settled: Option<Handler<CoinsSettledEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_request_updated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CustomerRequestEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_request_updated = Some(Arc::new(f));
        self
    }

    pub fn on_coins_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CoinsSettledEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_coins_settled = Some(Arc::new(f));
        self
    }
}
