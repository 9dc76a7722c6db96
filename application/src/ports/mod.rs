//! Ports (interfaces) that the application layer depends on.
//!
//! Adapters implementing these live in the infrastructure layer.

pub mod backend;
pub mod chat_logger;
