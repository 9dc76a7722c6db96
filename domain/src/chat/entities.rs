//! Chat domain entities

use crate::core::model::ModelId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum title length in characters before truncation.
const TITLE_MAX_CHARS: usize = 50;

/// Marker appended to truncated titles.
const TITLE_ELLIPSIS: &str = "...";

/// Opaque identifier of a chat session.
///
/// Session ids are lookup keys into the [`SessionRegistry`](super::registry::SessionRegistry),
/// which owns the sessions; holding an id does not keep a session alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn's text, tagged with its role and creation time.
///
/// Messages are immutable once created; ordering within a session is
/// insertion order and is never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::now(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::now(Role::Assistant, content)
    }

    /// Reconstruct a message with an explicit timestamp (import path).
    pub fn with_timestamp(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    fn now(role: Role, content: impl Into<String>) -> Self {
        Self::with_timestamp(role, content, Utc::now())
    }
}

/// Append-only ordered log of messages for one session.
///
/// Append is the only mutator apart from [`clear`](Self::clear); individual
/// messages are never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The earliest user message, used for title derivation and previews.
    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.role == Role::User)
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

/// One independent, titled conversation with its own history and model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    id: SessionId,
    title: Option<String>,
    model: ModelId,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(id: SessionId, model: ModelId) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: None,
            model,
            created_at: now,
            last_updated: now,
            transcript: Transcript::new(),
        }
    }

    /// Reassemble a session from stored parts (import path).
    pub fn from_parts(
        id: SessionId,
        title: Option<String>,
        model: ModelId,
        created_at: DateTime<Utc>,
        last_updated: DateTime<Utc>,
        transcript: Transcript,
    ) -> Self {
        Self {
            id,
            title,
            model,
            created_at,
            last_updated,
            transcript,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The derived title, or `None` before the first save.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Append a message and refresh `last_updated`.
    pub fn append(&mut self, message: Message) {
        self.transcript.append(message);
        self.touch();
    }

    /// Wipe the transcript, keeping identity and metadata (title, model).
    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Set the title from the earliest user message, only if still unset.
    ///
    /// The title is computed once, at first save, and never changes
    /// afterwards; calling this again is a no-op.
    pub fn ensure_title(&mut self) {
        if self.title.is_none()
            && let Some(first) = self.transcript.first_user_message()
        {
            self.title = Some(derive_title(&first.content));
        }
    }

    /// Refresh `last_updated`, never letting it move backwards.
    pub(crate) fn touch(&mut self) {
        self.last_updated = self.last_updated.max(Utc::now());
    }
}

/// Derive a session title from the first user message.
///
/// The first 50 characters, with `...` appended when the message is longer;
/// shorter messages are used unchanged.
pub fn derive_title(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}{TITLE_ELLIPSIS}")
    } else {
        head
    }
}
