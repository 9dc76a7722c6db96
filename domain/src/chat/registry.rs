//! In-memory registry of chat sessions.
//!
//! The registry owns all saved sessions plus the active working session.
//! The active session is materialized lazily: it only enters the saved map
//! once it holds at least one message, so empty sessions never show up in
//! listings. Display order is computed on read by sorting on `last_updated`.

use super::entities::{ChatSession, Message, Role, SessionId};
use crate::core::error::ChatError;
use crate::core::model::ModelId;
use crate::util::truncate_str;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Maximum preview length in bytes for session listings.
const PREVIEW_MAX_BYTES: usize = 100;

/// Title shown for a session saved before any user message exists.
const UNTITLED: &str = "New Chat";

/// Summary of a stored session for sidebar-style listings.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub preview: String,
    pub model: ModelId,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub message_count: usize,
}

/// Aggregate counters across the registry and the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatStats {
    pub active_messages: usize,
    pub active_user_messages: usize,
    pub active_assistant_messages: usize,
    pub total_chats: usize,
    pub total_messages: usize,
}

/// Registry of chat sessions with one always-defined active session.
pub struct SessionRegistry {
    sessions: HashMap<SessionId, ChatSession>,
    active: ChatSession,
    counter: u64,
}

impl SessionRegistry {
    /// Create a registry with a fresh, unsaved active session.
    pub fn new(model: ModelId) -> Self {
        let mut registry = Self {
            sessions: HashMap::new(),
            // Placeholder, replaced right below via the id counter.
            active: ChatSession::new(SessionId::new("chat-0"), model.clone()),
            counter: 0,
        };
        let id = registry.allocate_id();
        registry.active = ChatSession::new(id, model);
        registry
    }

    /// Allocate the next session id.
    pub fn allocate_id(&mut self) -> SessionId {
        self.counter += 1;
        SessionId::new(format!("chat-{}", self.counter))
    }

    pub fn active(&self) -> &ChatSession {
        &self.active
    }

    pub fn active_id(&self) -> &SessionId {
        self.active.id()
    }

    pub fn active_model(&self) -> &ModelId {
        self.active.model()
    }

    /// Append a message to the active session, refreshing `last_updated`.
    pub fn append_to_active(&mut self, message: Message) {
        self.active.append(message);
    }

    /// Allocate a new empty active session, persisting the previous one
    /// first if it held any messages. Returns the new session's id.
    pub fn create_session(&mut self, model: ModelId) -> SessionId {
        self.save_active();
        let id = self.allocate_id();
        self.active = ChatSession::new(id.clone(), model);
        id
    }

    /// Persist the active session into the saved map.
    ///
    /// A session with no messages is never persisted. The title is derived
    /// at first save only; `last_updated` is refreshed on every save.
    /// Repeated saves are idempotent.
    pub fn save_active(&mut self) {
        if self.active.transcript().is_empty() {
            return;
        }
        self.active.ensure_title();
        self.active.touch();
        self.sessions
            .insert(self.active.id().clone(), self.active.clone());
    }

    /// Switch the active session to a stored one.
    ///
    /// The current active session is persisted first (if non-empty); the
    /// loaded session's model becomes the current model.
    pub fn load_session(&mut self, id: &SessionId) -> Result<(), ChatError> {
        if !self.sessions.contains_key(id) {
            return Err(ChatError::UnknownSession(id.clone()));
        }
        self.save_active();
        let session = self
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| ChatError::UnknownSession(id.clone()))?;
        self.active = session;
        Ok(())
    }

    /// Remove a session from the registry.
    ///
    /// Deleting the active session immediately installs a fresh empty
    /// replacement, so the active pointer is never left dangling. Deleting
    /// an unknown id is a no-op.
    pub fn delete_session(&mut self, id: &SessionId) {
        self.sessions.remove(id);
        if id == self.active.id() {
            let model = self.active.model().clone();
            let fresh = self.allocate_id();
            self.active = ChatSession::new(fresh, model);
        }
    }

    /// Saved sessions sorted by `last_updated`, most recent first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> =
            self.sessions.values().map(Self::summarize).collect();
        summaries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        summaries
    }

    /// Wipe the active transcript without changing the session identity.
    pub fn clear_active(&mut self) {
        self.active.clear_transcript();
    }

    pub fn get(&self, id: &SessionId) -> Option<&ChatSession> {
        self.sessions.get(id)
    }

    /// Insert a fully-formed session into the saved map (import path).
    pub fn insert(&mut self, session: ChatSession) {
        self.sessions.insert(session.id().clone(), session);
    }

    pub fn iter_sessions(&self) -> impl Iterator<Item = &ChatSession> {
        self.sessions.values()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn stats(&self) -> ChatStats {
        let transcript = self.active.transcript();
        ChatStats {
            active_messages: transcript.len(),
            active_user_messages: transcript.count_role(Role::User),
            active_assistant_messages: transcript.count_role(Role::Assistant),
            total_chats: self.sessions.len(),
            total_messages: self.sessions.values().map(|s| s.transcript().len()).sum(),
        }
    }

    fn summarize(session: &ChatSession) -> SessionSummary {
        let preview = session
            .transcript()
            .first_user_message()
            .map(|m| {
                let text = truncate_str(&m.content, PREVIEW_MAX_BYTES);
                if text.len() < m.content.len() {
                    format!("{text}...")
                } else {
                    text.to_string()
                }
            })
            .unwrap_or_else(|| "Empty chat".to_string());
        SessionSummary {
            id: session.id().clone(),
            title: session.title().unwrap_or(UNTITLED).to_string(),
            preview,
            model: session.model().clone(),
            created_at: session.created_at(),
            last_updated: session.last_updated(),
            message_count: session.transcript().len(),
        }
    }
}
