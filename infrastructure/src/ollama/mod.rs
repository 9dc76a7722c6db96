//! Ollama CLI adapter.

pub mod invoker;
