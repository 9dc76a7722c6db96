//! Infrastructure layer for parley
//!
//! Adapters for the application-layer ports: the Ollama process backend,
//! the TOML configuration stack, and the JSONL chat logger.

pub mod config;
pub mod logging;
pub mod ollama;

pub use config::file_config::FileConfig;
pub use config::loader::ConfigLoader;
pub use logging::jsonl_logger::JsonlChatLogger;
pub use ollama::invoker::OllamaBackend;
