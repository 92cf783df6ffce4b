use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

/// Product name used in user-facing error text.
pub const SERVICE_NAME: &str = "Devin";

#[derive(Debug)]
pub enum DevinApiError {
    MissingApiKey,
    InvalidHeader(String),
    Request(reqwest::Error),
    /// Non-2xx from the session endpoint; the message is already user-facing.
    Status(StatusCode, String),
    InvalidResponse(String),
    AttachmentDownload {
        file_name: String,
        status: StatusCode,
    },
    AttachmentUpload {
        status: StatusCode,
        body: String,
    },
    EmptyUploadUrl,
}

impl fmt::Display for DevinApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "{SERVICE_NAME} API key is not configured"),
            Self::InvalidHeader(message) => write!(f, "invalid request header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(_, message) => write!(f, "{message}"),
            Self::InvalidResponse(_) => write!(f, "Invalid response from {SERVICE_NAME} API"),
            Self::AttachmentDownload { file_name, status } => write!(
                f,
                "Failed to fetch attachment {file_name}: {}",
                status.as_u16()
            ),
            Self::AttachmentUpload { status, body } => {
                if body.is_empty() {
                    write!(
                        f,
                        "{SERVICE_NAME} attachment upload failed ({})",
                        status.as_u16()
                    )
                } else {
                    write!(f, "{SERVICE_NAME} attachment upload failed: {body}")
                }
            }
            Self::EmptyUploadUrl => write!(f, "{SERVICE_NAME} attachment upload returned no URL"),
        }
    }
}

impl std::error::Error for DevinApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DevinApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

/// Extracts the user-facing message from a non-2xx session response body.
///
/// Prefers a JSON `detail` field, then `message`, then a generic status line.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let field = parsed.as_ref().and_then(|value| {
        value
            .get("detail")
            .or_else(|| value.get("message"))
            .filter(|field| !field.is_null())
    });

    match field {
        Some(Value::String(message)) if !message.trim().is_empty() => message.clone(),
        Some(Value::String(_)) | None => {
            format!("{SERVICE_NAME} API error ({})", status.as_u16())
        }
        Some(other) => other.to_string(),
    }
}
