use std::fmt;

use thiserror::Error;

/// Failure reported by a [`crate::FieldChannel`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field channel {operation} failed for {namespace}/{key}: {message}")]
pub struct ChannelError {
    pub operation: &'static str,
    pub namespace: String,
    pub key: String,
    pub message: String,
}

impl ChannelError {
    #[must_use]
    pub fn new(
        operation: &'static str,
        namespace: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            namespace: namespace.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Failure raised back to a [`crate::Bridge`] caller.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No envelope was observed before the deadline.
    #[error("Timed out waiting for {event_name} response")]
    Timeout { event_name: String },

    /// The handler ran and stored a failure envelope.
    #[error("{message}")]
    Remote { message: String },

    /// The stored value did not decode as an envelope of the expected result shape.
    #[error("Invalid server response: {message}")]
    InvalidResponse { message: String },

    /// Arguments could not be turned into a dispatch payload.
    #[error("Invalid arguments for {event_name}: {message}")]
    InvalidArguments { event_name: String, message: String },

    #[error("call to {event_name} was cancelled")]
    Cancelled { event_name: String },

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("pending call for {event_name} was lost: {message}")]
    Join { event_name: String, message: String },
}

impl BridgeError {
    /// Returns the text a presentation layer should show for this failure.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Remote { message } => message.clone(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Failure produced by a registered handler.
///
/// Handlers never propagate past the registry; the message is written back as a
/// failure envelope under the caller's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wraps any error, keeping only its display text.
    #[must_use]
    pub fn from_error(error: impl std::error::Error) -> Self {
        Self::new(error.to_string())
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
