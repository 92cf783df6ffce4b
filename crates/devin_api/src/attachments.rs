use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::transcode::base64_bytes;

/// One file attached to a record.
///
/// `raw_bytes`, when present, is used instead of downloading `download_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub file_name: String,
    pub content_type: String,
    pub download_url: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub raw_bytes: Option<Vec<u8>>,
}

impl AttachmentRecord {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        download_url: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            download_url: download_url.into(),
            raw_bytes: None,
        }
    }

    pub fn with_raw_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.raw_bytes = Some(bytes);
        self
    }
}

/// Keeps the first record seen for each `download_url`, preserving order.
pub fn dedupe_attachments(attachments: Vec<AttachmentRecord>) -> Vec<AttachmentRecord> {
    let mut seen = HashSet::new();
    attachments
        .into_iter()
        .filter(|attachment| seen.insert(attachment.download_url.clone()))
        .collect()
}
