//! Domain layer for parley
//!
//! This crate contains the chat entities and pure session logic. It has no
//! dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Session
//!
//! One independent, titled conversation with its own message history and
//! backend model selection. Sessions live in a [`SessionRegistry`]: the
//! active session is held as a working copy and is only persisted into the
//! registry listing once it holds at least one message.
//!
//! ## Transcript
//!
//! The append-only message store of a session. Messages are immutable and
//! never reordered; the only other mutation is a full clear, which keeps the
//! session's identity and metadata.

pub mod chat;
pub mod core;
pub mod util;

// Re-export commonly used types
pub use chat::{
    entities::{ChatSession, Message, Role, SessionId, Transcript, derive_title},
    export::{BatchExport, ExportedMessage, ExportedSession, SessionExport, TIMESTAMP_FORMAT},
    registry::{ChatStats, SessionRegistry, SessionSummary},
};
pub use self::core::{error::ChatError, model::ModelId};
