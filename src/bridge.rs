//! Request/response bridge over a [`FieldChannel`] and a fire-and-forget [`Trigger`].
//!
//! One call runs: generate key -> clear stale entry -> dispatch `{...args, eventKey}`
//! -> poll the channel until an envelope appears or the deadline passes -> clear the
//! key -> decode the envelope. The trigger is dispatched exactly once per call; a
//! handler that never answers surfaces only as [`BridgeError::Timeout`].

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channel::{clear_best_effort, FieldChannel};
use crate::config::CallOptions;
use crate::envelope::{value_type_name, Envelope};
use crate::error::BridgeError;
use crate::key::generate_key;
use crate::registry::EVENT_KEY_FIELD;
use crate::trigger::Trigger;

/// Shared cancellation flag for an in-flight call.
pub type CancelSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Client half of the bridge.
pub struct Bridge<C, T> {
    namespace: Arc<str>,
    channel: Arc<C>,
    trigger: Arc<T>,
    options: CallOptions,
}

impl<C, T> Clone for Bridge<C, T> {
    fn clone(&self) -> Self {
        Self {
            namespace: Arc::clone(&self.namespace),
            channel: Arc::clone(&self.channel),
            trigger: Arc::clone(&self.trigger),
            options: self.options,
        }
    }
}

impl<C: FieldChannel, T: Trigger> Bridge<C, T> {
    #[must_use]
    pub fn new(namespace: impl Into<String>, channel: C, trigger: T) -> Self {
        Self::from_shared(namespace, Arc::new(channel), Arc::new(trigger))
    }

    #[must_use]
    pub fn from_shared(namespace: impl Into<String>, channel: Arc<C>, trigger: Arc<T>) -> Self {
        Self {
            namespace: Arc::from(namespace.into()),
            channel,
            trigger,
            options: CallOptions::default(),
        }
    }

    /// Sets the default options used by [`Bridge::invoke`].
    #[must_use]
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn options(&self) -> CallOptions {
        self.options
    }

    #[must_use]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    #[must_use]
    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    /// Invokes `event_name` with the bridge's default options.
    pub async fn invoke<R, A>(&self, event_name: &str, args: &A) -> Result<R, BridgeError>
    where
        R: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        self.invoke_with_cancel(event_name, args, self.options, None)
            .await
    }

    pub async fn invoke_with_options<R, A>(
        &self,
        event_name: &str,
        args: &A,
        options: CallOptions,
    ) -> Result<R, BridgeError>
    where
        R: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        self.invoke_with_cancel(event_name, args, options, None)
            .await
    }

    /// Invokes `event_name`, aborting early with [`BridgeError::Cancelled`] once
    /// `cancel` is set.
    pub async fn invoke_with_cancel<R, A>(
        &self,
        event_name: &str,
        args: &A,
        options: CallOptions,
        cancel: Option<&CancelSignal>,
    ) -> Result<R, BridgeError>
    where
        R: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let args = args_to_object(event_name, args)?;
        self.call(event_name, args, options, cancel).await
    }

    /// Starts the call on a background poller task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R, A>(
        &self,
        event_name: &str,
        args: &A,
        options: CallOptions,
    ) -> Result<PendingCall<R>, BridgeError>
    where
        R: DeserializeOwned + Send + 'static,
        A: Serialize + ?Sized,
    {
        let args = args_to_object(event_name, args)?;
        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
        let bridge = self.clone();
        let task_cancel = Arc::clone(&cancel);
        let task_event = event_name.to_owned();

        let handle = tokio::spawn(async move {
            bridge
                .call(&task_event, args, options, Some(&task_cancel))
                .await
        });

        Ok(PendingCall {
            event_name: event_name.to_owned(),
            cancel,
            handle,
            _result: PhantomData,
        })
    }

    async fn call<R: DeserializeOwned>(
        &self,
        event_name: &str,
        mut args: serde_json::Map<String, Value>,
        options: CallOptions,
        cancel: Option<&CancelSignal>,
    ) -> Result<R, BridgeError> {
        let namespace: &str = &self.namespace;
        let event_key = generate_key(event_name);

        clear_best_effort(self.channel.as_ref(), namespace, &event_key).await;

        args.insert(EVENT_KEY_FIELD.to_owned(), Value::String(event_key.clone()));
        let qualified = format!("{namespace}.{event_name}");
        self.trigger.dispatch(&qualified, Value::Object(args));

        let deadline = Instant::now() + options.timeout;
        tracing::debug!(
            namespace,
            event_name,
            event_key = %event_key,
            timeout_ms = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
            "dispatched event; polling for envelope"
        );

        let poll_interval = options.effective_poll_interval();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let nap = poll_interval.min(remaining);
            if !sleep_or_cancel(nap, cancel).await {
                clear_best_effort(self.channel.as_ref(), namespace, &event_key).await;
                return Err(BridgeError::Cancelled {
                    event_name: event_name.to_owned(),
                });
            }

            let raw = match self.channel.get(namespace, &event_key).await {
                Ok(raw) => raw,
                Err(error) => {
                    clear_best_effort(self.channel.as_ref(), namespace, &event_key).await;
                    return Err(error.into());
                }
            };

            if let Some(raw) = raw.filter(|value| !value.is_null()) {
                clear_best_effort(self.channel.as_ref(), namespace, &event_key).await;
                return decode_envelope(raw);
            }

            if Instant::now() >= deadline {
                break;
            }
        }

        clear_best_effort(self.channel.as_ref(), namespace, &event_key).await;
        tracing::debug!(namespace, event_name, event_key = %event_key, "bridge call timed out");
        Err(BridgeError::Timeout {
            event_name: event_name.to_owned(),
        })
    }
}

/// A bridge call running on a background task.
#[derive(Debug)]
pub struct PendingCall<R> {
    event_name: String,
    cancel: CancelSignal,
    handle: JoinHandle<Result<R, BridgeError>>,
    _result: PhantomData<fn() -> R>,
}

impl<R> PendingCall<R> {
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Requests cancellation; the call resolves with [`BridgeError::Cancelled`]
    /// at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<R, BridgeError> {
        match self.handle.await {
            Ok(result) => result,
            Err(error) => Err(BridgeError::Join {
                event_name: self.event_name,
                message: error.to_string(),
            }),
        }
    }
}

fn decode_envelope<R: DeserializeOwned>(raw: Value) -> Result<R, BridgeError> {
    match Envelope::<R>::decode(raw) {
        Ok(Envelope::Success(result)) => Ok(result),
        Ok(Envelope::Failure(message)) => Err(BridgeError::Remote { message }),
        Err(message) => Err(BridgeError::InvalidResponse { message }),
    }
}

fn args_to_object<A: Serialize + ?Sized>(
    event_name: &str,
    args: &A,
) -> Result<serde_json::Map<String, Value>, BridgeError> {
    let value = serde_json::to_value(args).map_err(|error| BridgeError::InvalidArguments {
        event_name: event_name.to_owned(),
        message: error.to_string(),
    })?;

    match value {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(serde_json::Map::new()),
        other => Err(BridgeError::InvalidArguments {
            event_name: event_name.to_owned(),
            message: format!(
                "arguments must serialize to an object, got {}",
                value_type_name(&other)
            ),
        }),
    }
}

fn is_cancelled(cancel: Option<&CancelSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Sleeps for `duration`; returns false if cancellation was observed instead.
///
/// Always suspends at least once, even for a zero `duration`.
async fn sleep_or_cancel(duration: Duration, cancel: Option<&CancelSignal>) -> bool {
    if duration.is_zero() {
        tokio::task::yield_now().await;
        return !is_cancelled(cancel);
    }
    if cancel.is_none() {
        tokio::time::sleep(duration).await;
        return true;
    }

    let wake_at = Instant::now() + duration;
    loop {
        if is_cancelled(cancel) {
            return false;
        }
        let now = Instant::now();
        if now >= wake_at {
            return true;
        }
        tokio::time::sleep((wake_at - now).min(CANCEL_POLL_INTERVAL)).await;
    }
}
