//! Export and import of chat sessions as JSON documents.
//!
//! Two shapes: a single-session export `{model, timestamp, messages}` and a
//! batch export `{export_date, total_chats, chats}`. Timestamps are
//! serialized as formatted text so the documents stay readable outside
//! parley; importing a single-session export reconstructs the exact ordered
//! message sequence.

use super::entities::{ChatSession, Message, Role, SessionId, Transcript};
use super::registry::SessionRegistry;
use crate::core::error::ChatError;
use crate::core::model::ModelId;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp format used throughout export documents.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, ChatError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| ChatError::InvalidExport(format!("bad timestamp '{text}': {e}")))
}

/// A message as it appears in export documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl From<&Message> for ExportedMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            timestamp: format_timestamp(message.timestamp),
        }
    }
}

impl ExportedMessage {
    fn into_message(self) -> Result<Message, ChatError> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        Ok(Message::with_timestamp(self.role, self.content, timestamp))
    }
}

/// Single-session export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub model: String,
    pub timestamp: String,
    pub messages: Vec<ExportedMessage>,
}

impl SessionExport {
    pub fn from_session(session: &ChatSession) -> Self {
        Self {
            model: session.model().to_string(),
            timestamp: format_timestamp(Utc::now()),
            messages: session.transcript().all().iter().map(Into::into).collect(),
        }
    }

    /// Rebuild a session under a fresh id.
    ///
    /// The title is derived from the imported messages so the session lists
    /// like any other.
    pub fn into_session(self, id: SessionId) -> Result<ChatSession, ChatError> {
        let mut transcript = Transcript::new();
        for message in self.messages {
            transcript.append(message.into_message()?);
        }
        let last_updated = transcript
            .all()
            .last()
            .map(|m| m.timestamp)
            .unwrap_or_else(Utc::now);
        let created_at = transcript
            .all()
            .first()
            .map(|m| m.timestamp)
            .unwrap_or(last_updated);

        let mut session = ChatSession::from_parts(
            id,
            None,
            ModelId::new(self.model),
            created_at,
            last_updated,
            transcript,
        );
        session.ensure_title();
        Ok(session)
    }
}

/// A stored session as it appears inside a batch export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedSession {
    pub title: String,
    pub messages: Vec<ExportedMessage>,
    pub model: String,
    pub created_at: String,
    pub last_updated: String,
}

impl From<&ChatSession> for ExportedSession {
    fn from(session: &ChatSession) -> Self {
        Self {
            title: session.title().unwrap_or("New Chat").to_string(),
            messages: session.transcript().all().iter().map(Into::into).collect(),
            model: session.model().to_string(),
            created_at: format_timestamp(session.created_at()),
            last_updated: format_timestamp(session.last_updated()),
        }
    }
}

/// Batch export wrapping every saved session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExport {
    pub export_date: String,
    pub total_chats: usize,
    pub chats: BTreeMap<String, ExportedSession>,
}

impl BatchExport {
    pub fn from_registry(registry: &SessionRegistry) -> Self {
        let chats: BTreeMap<String, ExportedSession> = registry
            .iter_sessions()
            .map(|session| (session.id().to_string(), session.into()))
            .collect();
        Self {
            export_date: format_timestamp(Utc::now()),
            total_chats: chats.len(),
            chats,
        }
    }
}
