use devin_api::AttachmentRecord;
use field_bridge::ArgShape;
use serde::{Deserialize, Serialize};

use crate::records::RecordKind;

/// Arguments of the `createDevinSession` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordKind>,
    pub title: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playbook_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRecord>,
}

impl ArgShape for CreateSessionArgs {
    const REQUIRED_FIELDS: &'static [&'static str] = &["title", "prompt"];
}

impl CreateSessionArgs {
    pub fn new(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Session marker stored on a record once it has been assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub session_url: String,
    pub assigned_at: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playbook_id: Option<String>,
}

impl SessionRecord {
    /// URL when known, otherwise the session id.
    pub fn display_link(&self) -> &str {
        if self.session_url.trim().is_empty() {
            &self.session_id
        } else {
            &self.session_url
        }
    }
}

/// Appends one `ATTACHMENT:"{url}"` line per uploaded attachment.
pub fn append_attachment_urls(prompt: &str, urls: &[String]) -> String {
    if urls.is_empty() {
        return prompt.to_owned();
    }

    let mut out = prompt.trim_end_matches('\n').to_owned();
    out.push('\n');
    for url in urls {
        out.push_str(&format!("\nATTACHMENT:\"{url}\""));
    }
    out.push('\n');
    out
}
