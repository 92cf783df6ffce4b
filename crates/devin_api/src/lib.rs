//! Transport-only client for the Devin session and attachment endpoints.
//!
//! This crate owns request building, response parsing, and the hand-built
//! multipart encoding used for attachment uploads. It contains no settings
//! resolution and no event-bridge coupling.
//!
//! Binary payloads that have to cross text-only interfaces go through
//! [`transcode`], which maps bytes to text and back without assuming the bytes
//! are valid UTF-8.

pub mod attachments;
pub mod client;
pub mod config;
pub mod error;
pub mod multipart;
pub mod payload;
pub mod transcode;
pub mod url;

pub use attachments::{dedupe_attachments, AttachmentRecord};
pub use client::DevinApiClient;
pub use config::DevinApiConfig;
pub use error::DevinApiError;
pub use multipart::{build_multipart_body, form_boundary, multipart_content_type};
pub use payload::{CreateSessionRequest, SessionCreated};
pub use reqwest::StatusCode;
pub use transcode::TranscodeError;
pub use url::{attachments_url, normalize_base_url, sessions_url, DEFAULT_DEVIN_API_URL};
