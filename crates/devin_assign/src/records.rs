//! Planning records and the read/write interface used to fetch them.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use devin_api::AttachmentRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AssignError;
use crate::session::SessionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Feature,
    Requirement,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "Feature",
            Self::Requirement => "Requirement",
        }
    }

    fn from_typename(typename: &str) -> Option<Self> {
        match typename {
            "Feature" => Some(Self::Feature),
            "Requirement" => Some(Self::Requirement),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record the assign command can act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    pub id: String,
    #[serde(rename = "typename")]
    pub kind: RecordKind,
    pub reference_num: String,
}

impl RecordRef {
    /// Returns `Some` only for features and requirements that carry a string
    /// `referenceNum`.
    pub fn from_value(record: &Value) -> Option<Self> {
        let kind = RecordKind::from_typename(record.get("typename")?.as_str()?)?;
        let reference_num = record.get("referenceNum")?.as_str()?.to_owned();
        let id = match record.get("id")? {
            Value::String(id) => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => return None,
        };
        Some(Self {
            id,
            kind,
            reference_num,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub markdown_body: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSummary {
    pub reference_num: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSummary {
    pub reference_num: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Note>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDetails {
    pub id: String,
    pub name: String,
    pub reference_num: String,
    pub path: String,
    #[serde(default)]
    pub description: Option<Note>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub requirements: Vec<RequirementSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementDetails {
    pub id: String,
    pub name: String,
    pub reference_num: String,
    pub path: String,
    #[serde(default)]
    pub description: Option<Note>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub feature: Option<FeatureSummary>,
}

/// Read access to records plus the session marker stored on each record.
#[async_trait]
pub trait RecordQuery: Send + Sync {
    async fn feature(&self, id: &str) -> Result<Option<FeatureDetails>, AssignError>;

    async fn requirement(&self, id: &str) -> Result<Option<RequirementDetails>, AssignError>;

    async fn session(&self, record: &RecordRef) -> Result<Option<SessionRecord>, AssignError>;

    async fn store_session(
        &self,
        record: &RecordRef,
        session: &SessionRecord,
    ) -> Result<(), AssignError>;
}

/// In-memory records loaded from a JSON fixture.
///
/// ```json
/// {
///   "record": {"typename": "Feature", "id": "1", "referenceNum": "APP-1"},
///   "features": [...],
///   "requirements": [...],
///   "sessions": {"1": {...}}
/// }
/// ```
#[derive(Debug, Default)]
pub struct FixtureRecords {
    record: Value,
    features: HashMap<String, FeatureDetails>,
    requirements: HashMap<String, RequirementDetails>,
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    record: Value,
    #[serde(default)]
    features: Vec<FeatureDetails>,
    #[serde(default)]
    requirements: Vec<RequirementDetails>,
    #[serde(default)]
    sessions: HashMap<String, SessionRecord>,
}

impl FixtureRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, AssignError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AssignError::Io {
            operation: "reading record fixture",
            path: path.to_path_buf(),
            source,
        })?;
        let file: FixtureFile =
            serde_json::from_str(&raw).map_err(|source| AssignError::JsonParse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut records = Self::new().with_record(file.record);
        for feature in file.features {
            records = records.with_feature(feature);
        }
        for requirement in file.requirements {
            records = records.with_requirement(requirement);
        }
        *lock_unpoisoned(&records.sessions) = file.sessions;
        Ok(records)
    }

    /// Sets the record the command runs against.
    pub fn with_record(mut self, record: Value) -> Self {
        self.record = record;
        self
    }

    pub fn with_feature(mut self, feature: FeatureDetails) -> Self {
        self.features.insert(feature.id.clone(), feature);
        self
    }

    pub fn with_requirement(mut self, requirement: RequirementDetails) -> Self {
        self.requirements.insert(requirement.id.clone(), requirement);
        self
    }

    pub fn with_session(self, record_id: impl Into<String>, session: SessionRecord) -> Self {
        lock_unpoisoned(&self.sessions).insert(record_id.into(), session);
        self
    }

    pub fn record(&self) -> &Value {
        &self.record
    }

    pub fn stored_session(&self, record_id: &str) -> Option<SessionRecord> {
        lock_unpoisoned(&self.sessions).get(record_id).cloned()
    }
}

#[async_trait]
impl RecordQuery for FixtureRecords {
    async fn feature(&self, id: &str) -> Result<Option<FeatureDetails>, AssignError> {
        Ok(self.features.get(id).cloned())
    }

    async fn requirement(&self, id: &str) -> Result<Option<RequirementDetails>, AssignError> {
        Ok(self.requirements.get(id).cloned())
    }

    async fn session(&self, record: &RecordRef) -> Result<Option<SessionRecord>, AssignError> {
        Ok(self.stored_session(&record.id))
    }

    async fn store_session(
        &self,
        record: &RecordRef,
        session: &SessionRecord,
    ) -> Result<(), AssignError> {
        lock_unpoisoned(&self.sessions).insert(record.id.clone(), session.clone());
        Ok(())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
