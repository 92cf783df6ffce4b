//! Request/response bridge for sandboxed client code that can only reach its
//! server-side logic through a shared key/value field store and a one-way trigger.
//!
//! # Overview
//! - [`Bridge`] is the calling half: it dispatches an event carrying a fresh
//!   correlation key and polls the [`FieldChannel`] until a response [`Envelope`]
//!   appears or the deadline passes.
//! - [`HandlerRegistry`] is the receiving half: it validates inbound arguments
//!   against an [`ArgShape`], runs the handler, and writes the envelope back under
//!   the caller's key.
//! - [`MemoryFieldChannel`] and [`LoopbackTrigger`] wire both halves together in
//!   one process for tests and local hosts.
//!
//! Invariant: each correlation key is written by one handler and read by one
//! caller, and is never reused. The channel is never locked.

pub mod bridge;
pub mod channel;
pub mod config;
pub mod envelope;
pub mod error;
pub mod key;
pub mod registry;
pub mod trigger;

pub use bridge::{Bridge, CancelSignal, PendingCall};
pub use channel::{clear_best_effort, FieldChannel, MemoryFieldChannel, DEFAULT_ENTRY_TTL};
pub use config::{CallOptions, MIN_POLL_INTERVAL};
pub use envelope::Envelope;
pub use error::{BridgeError, ChannelError, HandlerError};
pub use key::{generate_key, generate_key_at, unix_millis};
pub use registry::{
    ArgShape, HandleOutcome, HandlerContext, HandlerRegistry, EVENT_KEY_FIELD,
    INVALID_ARGUMENTS_PREFIX,
};
pub use trigger::{DispatchLog, DispatchedEvent, LoopbackTrigger, RecordingTrigger, Trigger};
