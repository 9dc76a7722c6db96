//! Model backend port
//!
//! Defines how the application layer reaches the locally-running
//! model-serving process. Implementations (adapters) live in the
//! infrastructure layer.

use async_trait::async_trait;
use parley_domain::ModelId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by the model backend.
///
/// The `Display` text of each variant is the advisory shown in-band as a
/// normal assistant message when a generation turn fails, so a failed turn
/// is recorded like any other and the conversation continues.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend executable could not be located or started.
    ///
    /// Kept distinct from runtime failures because the remediation differs:
    /// install the backend rather than retry the request.
    #[error("Error: Ollama not found. Please install Ollama and pull the {0} model.")]
    NotFound(ModelId),

    /// The blocking call exceeded the generation timeout.
    #[error("Error: Request timed out. Please try again.")]
    Timeout,

    /// The process ran but exited non-zero; carries its captured stderr.
    #[error("Error: {0}")]
    NonZeroExit(String),

    /// Pipe or wait failure other than a missing executable.
    #[error("Error: {0}")]
    Io(String),
}

/// A lazy, finite sequence of accumulated-output snapshots.
///
/// Each `Ok` element is the full reply text so far, not a delta, so
/// consumers redraw the whole text on every step. The sequence ends when the
/// backend closes its output channel; a failure detected afterwards (or
/// mid-stream) is delivered as one final `Err` element, so consumers never
/// have to inspect the text to tell success from failure. The stream is not
/// restartable.
pub struct ReplyStream {
    receiver: mpsc::Receiver<Result<String, BackendError>>,
}

impl ReplyStream {
    pub fn new(receiver: mpsc::Receiver<Result<String, BackendError>>) -> Self {
        Self { receiver }
    }

    /// Receive the next snapshot or failure, or `None` once exhausted.
    pub async fn next_event(&mut self) -> Option<Result<String, BackendError>> {
        self.receiver.recv().await
    }
}

/// Port for invoking the local model backend.
///
/// Every call spawns exactly one backend process; implementations must not
/// leak a process on any exit path, including timeouts.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Run one generation to completion and return the full reply text.
    async fn generate(&self, prompt: &str, model: &ModelId) -> Result<String, BackendError>;

    /// Run one generation, streaming accumulated-text snapshots.
    ///
    /// The default implementation calls [`generate`](Self::generate) and
    /// wraps the result in a single-element stream, so blocking-only
    /// backends work without changes.
    async fn generate_streaming(
        &self,
        prompt: &str,
        model: &ModelId,
    ) -> Result<ReplyStream, BackendError> {
        let text = self.generate(prompt, model).await?;
        let (tx, rx) = mpsc::channel(1);
        // If the receiver is already gone, that's fine
        let _ = tx.send(Ok(text)).await;
        Ok(ReplyStream::new(rx))
    }

    /// Best-effort check that `model` appears in the backend's installed
    /// listing (exact substring containment against the raw listing text).
    ///
    /// Never fails; any query error reports `false`.
    async fn is_available(&self, model: &ModelId) -> bool;
}
