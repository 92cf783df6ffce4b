use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_DEVIN_API_URL;

/// Transport configuration for Devin API requests.
#[derive(Debug, Clone)]
pub struct DevinApiConfig {
    /// Bearer token passed to `Authorization`.
    pub api_key: String,
    /// Base URL; endpoint paths are appended to it.
    pub base_url: String,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for DevinApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_DEVIN_API_URL.to_string(),
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl DevinApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
