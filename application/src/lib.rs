//! Application layer for parley
//!
//! This crate defines the ports the chat core depends on (the model backend
//! and the transcript logger) and the use cases that drive it: the chat
//! controller, which owns session state and the single-flight generation
//! turn, and chat export/import.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::backend::{BackendError, ModelBackend, ReplyStream};
pub use ports::chat_logger::{ChatEvent, ChatLogger, NoChatLogger};
pub use use_cases::chat_controller::{ChatController, SubmitError};
pub use use_cases::export_chats;
