#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use devin_api::{
    AttachmentRecord, CreateSessionRequest, DevinApiError, SessionCreated, StatusCode,
};
use devin_assign::records::{
    FeatureDetails, FeatureSummary, Note, RequirementDetails, RequirementSummary, Task,
};
use devin_assign::{SessionApi, SessionApiFactory};

#[derive(Default)]
pub struct ApiTrace {
    pub api_keys: Vec<String>,
    pub uploads: Vec<Vec<AttachmentRecord>>,
    pub requests: Vec<CreateSessionRequest>,
}

/// Session API double that records calls and answers from a script.
pub struct FakeSessionApi {
    trace: Arc<Mutex<ApiTrace>>,
    upload_error: Option<String>,
    session_error: Option<String>,
}

#[async_trait]
impl SessionApi for FakeSessionApi {
    async fn upload_attachments(
        &self,
        attachments: &[AttachmentRecord],
    ) -> Result<Vec<String>, DevinApiError> {
        lock_unpoisoned(&self.trace)
            .uploads
            .push(attachments.to_vec());
        if let Some(body) = &self.upload_error {
            return Err(DevinApiError::AttachmentUpload {
                status: status(400),
                body: body.clone(),
            });
        }
        Ok(attachments
            .iter()
            .map(|attachment| format!("https://devin.test/attachments/{}", attachment.file_name))
            .collect())
    }

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionCreated, DevinApiError> {
        let mut trace = lock_unpoisoned(&self.trace);
        trace.requests.push(request.clone());
        if let Some(message) = &self.session_error {
            return Err(DevinApiError::Status(status(403), message.clone()));
        }
        let id = trace.requests.len();
        Ok(SessionCreated {
            session_id: format!("devin-{id}"),
            session_url: format!("https://app.devin.ai/sessions/devin-{id}"),
            is_new_session: Some(true),
        })
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    trace: Arc<Mutex<ApiTrace>>,
    upload_error: Option<String>,
    session_error: Option<String>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_uploads(mut self, body: &str) -> Self {
        self.upload_error = Some(body.to_string());
        self
    }

    pub fn failing_sessions(mut self, message: &str) -> Self {
        self.session_error = Some(message.to_string());
        self
    }

    pub fn trace(&self) -> MutexGuard<'_, ApiTrace> {
        lock_unpoisoned(&self.trace)
    }
}

impl SessionApiFactory for FakeFactory {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn SessionApi>, DevinApiError> {
        lock_unpoisoned(&self.trace)
            .api_keys
            .push(api_key.to_string());
        Ok(Arc::new(FakeSessionApi {
            trace: Arc::clone(&self.trace),
            upload_error: self.upload_error.clone(),
            session_error: self.session_error.clone(),
        }))
    }
}

pub fn attachment(name: &str, url: &str) -> AttachmentRecord {
    AttachmentRecord::new(name, "image/png", url)
}

pub fn feature() -> FeatureDetails {
    FeatureDetails {
        id: "f1".to_string(),
        name: "Saved carts".to_string(),
        reference_num: "SHOP-12".to_string(),
        path: "https://acme.aha.io/features/SHOP-12".to_string(),
        description: Some(Note {
            markdown_body: Some("Let shoppers save carts.".to_string()),
            attachments: vec![
                attachment("flow.png", "https://files/flow"),
                attachment("flow-copy.png", "https://files/flow"),
            ],
        }),
        tasks: vec![
            Task {
                name: "Add table".to_string(),
                body: Some("Keyed by user.".to_string()),
            },
            Task {
                name: "Wire API".to_string(),
                body: None,
            },
        ],
        requirements: vec![
            RequirementSummary {
                reference_num: "SHOP-12-1".to_string(),
                name: Some("Save cart".to_string()),
            },
            RequirementSummary {
                reference_num: "SHOP-12-2".to_string(),
                name: None,
            },
        ],
    }
}

pub fn requirement() -> RequirementDetails {
    RequirementDetails {
        id: "r1".to_string(),
        name: "Save cart".to_string(),
        reference_num: "SHOP-12-1".to_string(),
        path: "https://acme.aha.io/requirements/SHOP-12-1".to_string(),
        description: Some(Note {
            markdown_body: None,
            attachments: vec![attachment("mock.png", "https://files/mock")],
        }),
        tasks: Vec::new(),
        feature: Some(FeatureSummary {
            reference_num: "SHOP-12".to_string(),
            name: Some("Saved carts".to_string()),
            description: Some(Note {
                markdown_body: Some("Parent context.".to_string()),
                attachments: vec![
                    attachment("mock-again.png", "https://files/mock"),
                    attachment("flow.png", "https://files/flow"),
                ],
            }),
        }),
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).expect("valid status code")
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
