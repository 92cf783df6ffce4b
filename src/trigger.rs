//! One-way, unconfirmed dispatch of events into the handling context.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::channel::{lock_unpoisoned, FieldChannel};
use crate::registry::{HandlerContext, HandlerRegistry};

/// Host trigger primitive.
///
/// Dispatch is fire-and-forget: it returns nothing and gives the caller no
/// confirmation that any handler received the event.
pub trait Trigger: Send + Sync + 'static {
    fn dispatch(&self, event_name: &str, payload: Value);
}

impl<T: Trigger + ?Sized> Trigger for Arc<T> {
    fn dispatch(&self, event_name: &str, payload: Value) {
        (**self).dispatch(event_name, payload);
    }
}

/// One event as seen by a trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedEvent {
    pub event_name: String,
    pub payload: Value,
}

/// Shared log of dispatched events.
pub type DispatchLog = Arc<Mutex<Vec<DispatchedEvent>>>;

/// Trigger that records events and never delivers them, like a host that drops them.
#[derive(Debug, Clone, Default)]
pub struct RecordingTrigger {
    log: DispatchLog,
}

impl RecordingTrigger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn log(&self) -> DispatchLog {
        Arc::clone(&self.log)
    }

    #[must_use]
    pub fn dispatched(&self) -> Vec<DispatchedEvent> {
        lock_unpoisoned(&self.log).clone()
    }
}

impl Trigger for RecordingTrigger {
    fn dispatch(&self, event_name: &str, payload: Value) {
        tracing::debug!(event_name, "recording trigger swallowed event");
        lock_unpoisoned(&self.log).push(DispatchedEvent {
            event_name: event_name.to_owned(),
            payload,
        });
    }
}

/// In-process trigger that delivers every event to a [`HandlerRegistry`] on a
/// spawned tokio task.
pub struct LoopbackTrigger<C> {
    registry: Arc<HandlerRegistry<C>>,
    context: HandlerContext,
    delivery_delay: Option<Duration>,
    log: DispatchLog,
}

impl<C: FieldChannel> LoopbackTrigger<C> {
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry<C>>, context: HandlerContext) -> Self {
        Self {
            registry,
            context,
            delivery_delay: None,
            log: DispatchLog::default(),
        }
    }

    /// Delays each delivery, modelling host scheduling latency.
    #[must_use]
    pub fn with_delivery_delay(mut self, delay: Duration) -> Self {
        self.delivery_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn dispatched(&self) -> Vec<DispatchedEvent> {
        lock_unpoisoned(&self.log).clone()
    }
}

impl<C: FieldChannel> Trigger for LoopbackTrigger<C> {
    fn dispatch(&self, event_name: &str, payload: Value) {
        lock_unpoisoned(&self.log).push(DispatchedEvent {
            event_name: event_name.to_owned(),
            payload: payload.clone(),
        });

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(event_name, "no tokio runtime available; event not delivered");
            return;
        };

        let registry = Arc::clone(&self.registry);
        let context = self.context.clone();
        let delay = self.delivery_delay;
        let event_name = event_name.to_owned();

        runtime.spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let outcome = registry.handle(&event_name, payload, context).await;
            tracing::debug!(event_name = %event_name, ?outcome, "loopback delivery finished");
        });
    }
}
