//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

use parley_domain::ModelId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("backend command cannot be empty")]
    EmptyCommand,

    #[error("default model cannot be empty")]
    EmptyModel,
}

/// Raw backend configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    /// Executable used to reach the model backend
    pub command: String,
    /// Model used for new sessions
    pub default_model: String,
    /// Override for the generation timeout, in seconds
    pub timeout_seconds: Option<u64>,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            command: "ollama".to_string(),
            default_model: ModelId::DEFAULT.to_string(),
            timeout_seconds: None,
        }
    }
}

/// Raw chat configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChatConfig {
    /// Record generation turns to a JSONL transcript log
    pub log_transcript: bool,
    /// Render replies incrementally as they stream in
    pub stream_replies: bool,
}

impl Default for FileChatConfig {
    fn default() -> Self {
        Self {
            log_transcript: false,
            stream_replies: false,
        }
    }
}

/// Raw REPL configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReplConfig {
    /// Show a spinner while waiting for the backend
    pub show_progress: bool,
    /// Path to history file
    pub history_file: Option<String>,
}

impl Default for FileReplConfig {
    fn default() -> Self {
        Self {
            show_progress: true,
            history_file: None,
        }
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Backend settings
    pub backend: FileBackendConfig,
    /// Chat settings
    pub chat: FileChatConfig,
    /// REPL settings
    pub repl: FileReplConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(0) = self.backend.timeout_seconds {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        if self.backend.command.trim().is_empty() {
            return Err(ConfigValidationError::EmptyCommand);
        }
        if self.backend.default_model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModel);
        }
        Ok(())
    }

    pub fn default_model(&self) -> ModelId {
        ModelId::new(self.backend.default_model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert_eq!(config.backend.command, "ollama");
        assert_eq!(config.backend.default_model, ModelId::DEFAULT);
        assert!(!config.chat.log_transcript);
        assert!(!config.chat.stream_replies);
        assert!(config.repl.show_progress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[backend]
command = "/usr/local/bin/ollama"
default_model = "mistral:7b"
timeout_seconds = 300

[chat]
log_transcript = true
stream_replies = true

[repl]
show_progress = false
history_file = "~/.local/share/parley/history.txt"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.command, "/usr/local/bin/ollama");
        assert_eq!(config.backend.default_model, "mistral:7b");
        assert_eq!(config.backend.timeout_seconds, Some(300));
        assert!(config.chat.log_transcript);
        assert!(config.chat.stream_replies);
        assert!(!config.repl.show_progress);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[backend]
default_model = "qwen2.5:7b"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.default_model, "qwen2.5:7b");
        // Defaults should apply
        assert_eq!(config.backend.command, "ollama");
        assert!(!config.chat.stream_replies);
        assert!(config.repl.show_progress);
    }

    #[test]
    fn test_validate_zero_timeout() {
        let toml_str = r#"
[backend]
timeout_seconds = 0
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidTimeout)
        ));
    }

    #[test]
    fn test_validate_empty_model() {
        let toml_str = r#"
[backend]
default_model = "  "
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::EmptyModel)
        ));
    }
}
