use serde::{Deserialize, Serialize};

/// Caller-facing request for a new Devin session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSessionRequest {
    pub title: String,
    pub prompt: String,
    pub tags: Vec<String>,
    pub playbook_id: Option<String>,
}

impl CreateSessionRequest {
    pub fn new(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_playbook_id(mut self, playbook_id: impl Into<String>) -> Self {
        self.playbook_id = Some(playbook_id.into());
        self
    }

    /// Wire body; `idempotent` is always set so duplicate dispatches are safe
    /// server-side.
    pub fn to_wire(&self) -> CreateSessionPayload {
        let playbook_id = self
            .playbook_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);
        CreateSessionPayload {
            title: self.title.clone(),
            prompt: self.prompt.clone(),
            idempotent: true,
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
            playbook_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSessionPayload {
    pub title: String,
    pub prompt: String,
    pub idempotent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playbook_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub url: String,
    #[serde(default)]
    pub is_new_session: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: String,
    pub session_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new_session: Option<bool>,
}

impl From<CreateSessionResponse> for SessionCreated {
    fn from(response: CreateSessionResponse) -> Self {
        Self {
            session_id: response.session_id,
            session_url: response.url,
            is_new_session: response.is_new_session,
        }
    }
}
