//! Chat controller use case
//!
//! Owns the session registry and enforces the single-flight generation
//! rule: at most one prompt is in flight across the whole process. A second
//! submission while a turn is pending is rejected without touching any
//! session state.
//!
//! Backend failures are surfaced in-band: the advisory text of the error is
//! recorded as a normal assistant message, so the turn completes and the
//! conversation keeps its shape.

use std::sync::{Arc, Mutex, MutexGuard};

use parley_domain::{
    ChatError, ChatStats, Message, ModelId, SessionExport, SessionId, SessionRegistry,
    SessionSummary,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ports::backend::ModelBackend;
use crate::ports::chat_logger::{ChatEvent, ChatLogger, NoChatLogger};
use crate::use_cases::export_chats;

/// Rejections raised before any generation starts.
///
/// Unlike backend errors these are never recorded into the transcript; the
/// submission simply does not happen.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a generation is already in progress")]
    Concurrent,

    #[error("prompt is empty")]
    EmptyPrompt,
}

/// Whether a generation turn is currently pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenerationState {
    Idle,
    AwaitingResponse,
}

/// Coordinates sessions, the model backend, and the single-flight rule.
///
/// Thread-safe behind `&self`; intended to be shared as `Arc<ChatController>`
/// between the REPL loop and any display code.
pub struct ChatController {
    registry: Mutex<SessionRegistry>,
    state: Mutex<GenerationState>,
    backend: Arc<dyn ModelBackend>,
    logger: Arc<dyn ChatLogger>,
}

impl ChatController {
    pub fn new(backend: Arc<dyn ModelBackend>, model: ModelId) -> Self {
        Self {
            registry: Mutex::new(SessionRegistry::new(model)),
            state: Mutex::new(GenerationState::Idle),
            backend,
            logger: Arc::new(NoChatLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ChatLogger>) -> Self {
        self.logger = logger;
        self
    }

    // Recover from poisoning: registry state stays consistent because every
    // mutation is a single method call on SessionRegistry.
    fn registry(&self) -> MutexGuard<'_, SessionRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn state(&self) -> MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the single generation slot, rejecting concurrent or empty
    /// submissions. On success the slot is held until [`end_turn`] runs.
    fn begin_turn(&self, prompt: &str) -> Result<(), SubmitError> {
        if prompt.trim().is_empty() {
            return Err(SubmitError::EmptyPrompt);
        }
        let mut state = self.state();
        if *state == GenerationState::AwaitingResponse {
            warn!("rejected prompt: generation already in progress");
            return Err(SubmitError::Concurrent);
        }
        *state = GenerationState::AwaitingResponse;
        Ok(())
    }

    fn end_turn(&self) {
        *self.state() = GenerationState::Idle;
    }

    /// Record the user's prompt and persist the session; returns the model
    /// the active session is bound to.
    fn record_user(&self, prompt: &str) -> ModelId {
        let mut registry = self.registry();
        registry.append_to_active(Message::user(prompt));
        registry.save_active();
        let model = registry.active_model().clone();
        self.logger.log(ChatEvent::new(
            "prompt_submitted",
            json!({
                "session": registry.active_id().to_string(),
                "model": model.to_string(),
                "prompt": prompt,
            }),
        ));
        model
    }

    fn record_assistant(&self, reply: &str, failed: bool) {
        let mut registry = self.registry();
        registry.append_to_active(Message::assistant(reply));
        registry.save_active();
        let event = if failed {
            "generation_failed"
        } else {
            "reply_recorded"
        };
        self.logger.log(ChatEvent::new(
            event,
            json!({
                "session": registry.active_id().to_string(),
                "reply": reply,
            }),
        ));
    }

    /// Submit a prompt, wait for the full reply, and return it.
    ///
    /// The prompt is recorded before the backend runs, so it survives even
    /// a failed turn. Backend errors come back as the returned reply text
    /// (already recorded as the assistant message).
    pub async fn submit_prompt(&self, prompt: &str) -> Result<String, SubmitError> {
        self.begin_turn(prompt)?;
        let model = self.record_user(prompt);

        let (reply, failed) = match self.backend.generate(prompt, &model).await {
            Ok(text) => (text, false),
            Err(err) => {
                debug!(error = %err, "generation failed");
                (err.to_string(), true)
            }
        };

        self.record_assistant(&reply, failed);
        self.end_turn();
        Ok(reply)
    }

    /// Streaming variant of [`submit_prompt`](Self::submit_prompt).
    ///
    /// `on_snapshot` is called with the accumulated reply text after each
    /// chunk; the last snapshot becomes the recorded assistant message.
    pub async fn submit_prompt_streaming(
        &self,
        prompt: &str,
        mut on_snapshot: impl FnMut(&str) + Send,
    ) -> Result<String, SubmitError> {
        self.begin_turn(prompt)?;
        let model = self.record_user(prompt);

        let (reply, failed) = match self.backend.generate_streaming(prompt, &model).await {
            Ok(mut stream) => {
                let mut last = String::new();
                let mut failed = false;
                while let Some(event) = stream.next_event().await {
                    match event {
                        Ok(snapshot) => {
                            on_snapshot(&snapshot);
                            last = snapshot;
                        }
                        Err(err) => {
                            debug!(error = %err, "generation failed mid-stream");
                            let text = err.to_string();
                            on_snapshot(&text);
                            last = text;
                            failed = true;
                        }
                    }
                }
                (last, failed)
            }
            Err(err) => {
                debug!(error = %err, "generation failed");
                let text = err.to_string();
                on_snapshot(&text);
                (text, true)
            }
        };

        self.record_assistant(&reply, failed);
        self.end_turn();
        Ok(reply)
    }

    /// Whether a generation turn is currently pending.
    pub fn is_generating(&self) -> bool {
        *self.state() == GenerationState::AwaitingResponse
    }

    pub fn active_session_id(&self) -> SessionId {
        self.registry().active_id().clone()
    }

    pub fn active_title(&self) -> Option<String> {
        self.registry().active().title().map(str::to_string)
    }

    pub fn active_model(&self) -> ModelId {
        self.registry().active_model().clone()
    }

    /// Snapshot of the active session's messages, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.registry().active().transcript().all().to_vec()
    }

    /// Saved sessions plus the active one, most recently updated first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.registry().list_sessions()
    }

    pub fn stats(&self) -> ChatStats {
        self.registry().stats()
    }

    /// Persist the current conversation (if non-empty) and start a fresh one.
    pub fn new_chat(&self) -> SessionId {
        let mut registry = self.registry();
        let model = registry.active_model().clone();
        registry.create_session(model);
        registry.active_id().clone()
    }

    /// Wipe the active transcript, keeping the session itself.
    pub fn clear_chat(&self) {
        self.registry().clear_active();
    }

    pub fn load_chat(&self, id: &SessionId) -> Result<(), ChatError> {
        self.registry().load_session(id)
    }

    pub fn delete_chat(&self, id: &SessionId) {
        self.registry().delete_session(id);
    }

    /// Availability probe for the configured model; advisory only.
    pub async fn backend_ready(&self) -> bool {
        let model = self.active_model();
        self.backend.is_available(&model).await
    }

    /// Serialize the active conversation, or `None` if there is nothing to
    /// export yet.
    pub fn export_active(&self) -> Option<String> {
        export_chats::export_active(&self.registry())
    }

    /// Serialize every saved conversation plus the active one.
    pub fn export_all(&self) -> Option<String> {
        export_chats::export_all(&mut self.registry())
    }

    /// Import a previously exported conversation as a new saved session.
    pub fn import_session(&self, export: SessionExport) -> Result<SessionId, ChatError> {
        export_chats::import_session(&mut self.registry(), export)
    }
}
