//! Port for structured chat-turn logging.
//!
//! Separate from `tracing`-based diagnostics: tracing carries human-readable
//! operational messages, while this port records generation turns in a
//! machine-readable form (one record per event, e.g. JSONL).

use serde_json::Value;

/// A structured chat event for logging.
pub struct ChatEvent {
    /// Event type identifier (e.g. "prompt_submitted", "reply_recorded").
    pub event_type: &'static str,
    /// JSON payload with event-specific fields.
    pub payload: Value,
}

impl ChatEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for recording chat events.
///
/// `log` is synchronous and non-fallible so the generation flow is never
/// disrupted by a logging failure.
pub trait ChatLogger: Send + Sync {
    fn log(&self, event: ChatEvent);
}

/// No-op implementation for tests and when transcript logging is disabled.
pub struct NoChatLogger;

impl ChatLogger for NoChatLogger {
    fn log(&self, _event: ChatEvent) {}
}
