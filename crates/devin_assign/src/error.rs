use std::path::PathBuf;

use devin_api::DevinApiError;
use field_bridge::BridgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON at {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required environment variable {name}")]
    MissingEnv { name: &'static str },

    #[error("{0}")]
    Settings(String),

    #[error("Failed to load {kind} details")]
    RecordNotFound { kind: &'static str },

    #[error("record query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Api(#[from] DevinApiError),
}

impl AssignError {
    /// Text shown after `Error: ` in command output.
    pub fn message(&self) -> String {
        match self {
            Self::Bridge(error) => error.message(),
            other => other.to_string(),
        }
    }
}
