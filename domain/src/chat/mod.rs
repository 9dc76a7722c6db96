//! Chat sessions, message transcripts, and their registry.

pub mod entities;
pub mod export;
pub mod registry;
