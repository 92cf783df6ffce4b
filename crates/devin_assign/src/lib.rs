//! Assigns planning records (features and requirements) to Devin sessions.
//!
//! ## Flow
//!
//! The client half runs [`commands::assign_record`]: it checks the record,
//! builds the session prompt through a [`records::RecordQuery`], and calls the
//! `createDevinSession` event over a [`field_bridge::Bridge`]. The server half is
//! the handler installed by [`events::register_create_session`]; it resolves
//! settings, uploads attachments, and creates the session through
//! [`devin_api::DevinApiClient`].
//!
//! ## Settings
//!
//! Host settings arrive as JSON with camelCase keys:
//!
//! ```json
//! {
//!   "repository": "owner/repo",
//!   "baseBranch": "main",
//!   "customInstructions": "Run the full test suite before opening a PR.",
//!   "sessionTags": "aha, backend",
//!   "playbookId": "playbook-123",
//!   "personalApiKey": "<key>",
//!   "apiKey": "<shared key>"
//! }
//! ```
//!
//! `personalApiKey` wins over `apiKey`. `sessionTags` may be a comma-separated
//! string or a list.
//!
//! ## Binary
//!
//! `devin-assign` reads `DEVIN_ASSIGN_SETTINGS_PATH` and `DEVIN_ASSIGN_RECORD_PATH`
//! (see `demos/`), wires both halves together in process, and prints the
//! command output. `RUST_LOG` controls log verbosity.

pub mod commands;
pub mod error;
pub mod events;
pub mod prompt;
pub mod records;
pub mod session;
pub mod settings;

/// Namespace for events and stored fields.
pub const EXTENSION_ID: &str = "aha-develop.devin";
/// Product name used in user-facing messages.
pub const EXTENSION_NAME: &str = "Devin";
/// Record field holding the assigned [`session::SessionRecord`].
pub const SESSION_FIELD: &str = "session";
pub const CREATE_SESSION_EVENT: &str = "createDevinSession";

pub use commands::{assign_record, AssignOutcome, CommandOutput};
pub use error::AssignError;
pub use events::{
    create_devin_session, register_create_session, DevinConnector, SessionApi, SessionApiFactory,
};
pub use prompt::{build_session_prompt, BuildSessionOptions, SessionPrompt};
pub use records::{FixtureRecords, RecordKind, RecordQuery, RecordRef};
pub use session::{CreateSessionArgs, SessionRecord};
pub use settings::{parse_tags, ExtensionSettings, SessionTags};
