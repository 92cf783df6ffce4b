use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AssignError;
use crate::EXTENSION_NAME;

pub const DEFAULT_BASE_BRANCH: &str = "main";

/// `sessionTags` as configured: either `"a, b"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionTags {
    Joined(String),
    List(Vec<String>),
}

/// Host settings for the extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSettings {
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub base_branch: Option<String>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
    #[serde(default)]
    pub session_tags: Option<SessionTags>,
    #[serde(default)]
    pub playbook_id: Option<String>,
    #[serde(default)]
    pub personal_api_key: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ExtensionSettings {
    /// Validates raw host settings.
    pub fn from_value(value: Value) -> Result<Self, AssignError> {
        serde_json::from_value(value).map_err(|error| {
            tracing::error!(%error, "invalid extension settings");
            AssignError::Settings(format!(
                "{EXTENSION_NAME} extension settings are not properly configured"
            ))
        })
    }

    pub fn load(path: &Path) -> Result<Value, AssignError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AssignError::Io {
            operation: "reading settings",
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AssignError::JsonParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `personalApiKey` if set, otherwise `apiKey`.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.personal_api_key.as_deref()).or_else(|| non_blank(self.api_key.as_deref()))
    }

    /// Trimmed repository, only when it has the `owner/repo` form.
    pub fn repository(&self) -> Option<&str> {
        non_blank(self.repository.as_deref()).filter(|repository| repository.contains('/'))
    }

    pub fn base_branch(&self) -> &str {
        non_blank(self.base_branch.as_deref()).unwrap_or(DEFAULT_BASE_BRANCH)
    }

    pub fn custom_instructions(&self) -> Option<&str> {
        non_blank(self.custom_instructions.as_deref())
    }

    pub fn playbook_id(&self) -> Option<&str> {
        non_blank(self.playbook_id.as_deref())
    }

    pub fn tags(&self) -> Option<Vec<String>> {
        parse_tags(self.session_tags.as_ref())
    }
}

/// Trims, drops empty entries, and removes duplicates keeping the first.
///
/// Returns `None` when no tag is left.
pub fn parse_tags(value: Option<&SessionTags>) -> Option<Vec<String>> {
    let candidates: Vec<&str> = match value? {
        SessionTags::Joined(joined) => joined.split(',').collect(),
        SessionTags::List(list) => list.iter().map(String::as_str).collect(),
    };

    let mut tags: Vec<String> = Vec::new();
    for tag in candidates.into_iter().map(str::trim) {
        if !tag.is_empty() && !tags.iter().any(|seen| seen == tag) {
            tags.push(tag.to_owned());
        }
    }

    (!tags.is_empty()).then_some(tags)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
