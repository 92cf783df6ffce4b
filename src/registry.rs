//! Server-side handler registry: the receiving half of the bridge.
//!
//! For every dispatched event the registry extracts the caller's `eventKey`,
//! validates the remaining payload against the handler's declared argument shape,
//! runs the handler, and writes a success or failure envelope back under that key.
//! Handler failures (including panics) never escape [`HandlerRegistry::handle`].

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::channel::FieldChannel;
use crate::envelope::Envelope;
use crate::error::HandlerError;

/// Payload field carrying the caller's correlation key.
pub const EVENT_KEY_FIELD: &str = "eventKey";

/// Prefix of every argument-validation failure message.
pub const INVALID_ARGUMENTS_PREFIX: &str = "Invalid arguments passed to event handler: ";

/// Declared argument shape for a registered handler.
///
/// `REQUIRED_FIELDS` are checked before deserialization so that every missing key
/// is reported at once; a `null` value counts as missing.
pub trait ArgShape: DeserializeOwned + Send + 'static {
    const REQUIRED_FIELDS: &'static [&'static str] = &[];
}

impl ArgShape for Value {}

/// Execution context handed to handlers by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerContext {
    pub namespace: String,
    /// Raw host settings for the extension; handlers validate what they need.
    pub settings: Value,
}

impl HandlerContext {
    #[must_use]
    pub fn new(namespace: impl Into<String>, settings: Value) -> Self {
        Self {
            namespace: namespace.into(),
            settings,
        }
    }
}

/// What the registry did with one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The event carried no usable correlation key, so no envelope could be written.
    DroppedMissingKey,
    /// No handler is registered for the event name.
    DroppedUnknownEvent { event_name: String },
    /// An envelope was written under `event_key`.
    Responded { event_key: String, ok: bool },
    /// The envelope could not be stored; the caller will time out.
    WriteFailed { event_key: String },
}

type ErasedHandler =
    Arc<dyn Fn(Value, HandlerContext) -> BoxFuture<'static, Envelope<Value>> + Send + Sync>;

/// Maps event names to handlers and writes their envelopes into a [`FieldChannel`].
pub struct HandlerRegistry<C> {
    namespace: String,
    channel: C,
    handlers: HashMap<String, ErasedHandler>,
}

impl<C: FieldChannel> HandlerRegistry<C> {
    #[must_use]
    pub fn new(namespace: impl Into<String>, channel: C) -> Self {
        Self {
            namespace: namespace.into(),
            channel,
            handlers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    #[must_use]
    pub fn is_registered(&self, event_name: &str) -> bool {
        self.handlers.contains_key(event_name)
    }

    /// Registers `handler` for `event_name`, replacing any previous registration.
    pub fn register<A, R, F, Fut>(&mut self, event_name: impl Into<String>, handler: F)
    where
        A: ArgShape,
        R: Serialize + Send + 'static,
        F: Fn(A, HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Arc::new(move |payload, context| {
            let handler = Arc::clone(&handler);
            async move {
                let args = match validate_args::<A>(payload) {
                    Ok(args) => args,
                    Err(message) => return Envelope::Failure(message),
                };

                let outcome = AssertUnwindSafe(handler(args, context))
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(Ok(result)) => match serde_json::to_value(result) {
                        Ok(value) => Envelope::Success(value),
                        Err(error) => Envelope::Failure(format!(
                            "Failed to serialize handler result: {error}"
                        )),
                    },
                    Ok(Err(error)) => Envelope::Failure(error.message().to_owned()),
                    Err(panic) => Envelope::Failure(panic_message(panic.as_ref())),
                }
            }
            .boxed()
        });

        self.handlers.insert(event_name.into(), erased);
    }

    /// Handles one dispatched event.
    ///
    /// `event_name` may be bare (`createDevinSession`) or namespaced
    /// (`{namespace}.createDevinSession`) as delivered by the host trigger.
    pub async fn handle(
        &self,
        event_name: &str,
        payload: Value,
        context: HandlerContext,
    ) -> HandleOutcome {
        let event_name = self.local_event_name(event_name);

        let Some((event_key, payload)) = split_event_key(payload) else {
            tracing::warn!(
                namespace = %self.namespace,
                event_name,
                "missing or invalid eventKey in arguments; dropping event"
            );
            return HandleOutcome::DroppedMissingKey;
        };

        let Some(handler) = self.handlers.get(event_name).cloned() else {
            tracing::warn!(
                namespace = %self.namespace,
                event_name,
                event_key = %event_key,
                "no handler registered; dropping event"
            );
            return HandleOutcome::DroppedUnknownEvent {
                event_name: event_name.to_owned(),
            };
        };

        tracing::debug!(
            namespace = %self.namespace,
            event_name,
            event_key = %event_key,
            "handling event"
        );
        let envelope = handler(payload, context).await;
        if let Envelope::Failure(message) = &envelope {
            tracing::error!(
                namespace = %self.namespace,
                event_name,
                event_key = %event_key,
                message = message.as_str(),
                "event handler failed"
            );
        }

        self.write_envelope(event_key, envelope).await
    }

    async fn write_envelope(&self, event_key: String, envelope: Envelope<Value>) -> HandleOutcome {
        let ok = envelope.is_success();
        let stored = match envelope.to_value() {
            Ok(value) => value,
            Err(error) => {
                tracing::error!(event_key = %event_key, %error, "failed to serialize envelope");
                return HandleOutcome::WriteFailed { event_key };
            }
        };

        match self.channel.set(&self.namespace, &event_key, stored).await {
            Ok(()) => HandleOutcome::Responded { event_key, ok },
            Err(error) => {
                tracing::error!(event_key = %event_key, %error, "failed to write envelope");
                HandleOutcome::WriteFailed { event_key }
            }
        }
    }

    fn local_event_name<'a>(&self, event_name: &'a str) -> &'a str {
        event_name
            .strip_prefix(self.namespace.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(event_name)
    }
}

/// Splits the correlation key off a payload, returning the remaining arguments.
fn split_event_key(payload: Value) -> Option<(String, Value)> {
    let Value::Object(mut fields) = payload else {
        return None;
    };

    match fields.remove(EVENT_KEY_FIELD) {
        Some(Value::String(key)) if !key.trim().is_empty() => Some((key, Value::Object(fields))),
        _ => None,
    }
}

fn validate_args<A: ArgShape>(payload: Value) -> Result<A, String> {
    if let Value::Object(fields) = &payload {
        let missing = missing_fields(fields, A::REQUIRED_FIELDS);
        if !missing.is_empty() {
            return Err(format!(
                "{INVALID_ARGUMENTS_PREFIX}missing required fields: {}",
                missing.join(", ")
            ));
        }
    }

    serde_json::from_value::<A>(payload)
        .map_err(|error| format!("{INVALID_ARGUMENTS_PREFIX}{error}"))
}

fn missing_fields<'a>(fields: &Map<String, Value>, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|name| fields.get(*name).map_or(true, Value::is_null))
        .collect()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("Event handler panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("Event handler panicked: {message}")
    } else {
        "Event handler panicked".to_string()
    }
}
