//! Domain error types

use crate::chat::entities::SessionId;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("Invalid export document: {0}")]
    InvalidExport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_display() {
        let error = ChatError::UnknownSession(SessionId::new("chat-7"));
        assert_eq!(error.to_string(), "Unknown session: chat-7");
    }
}
