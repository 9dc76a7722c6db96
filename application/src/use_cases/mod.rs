//! Use cases driving the chat core.

pub mod chat_controller;
pub mod export_chats;
