//! Presentation layer for parley
//!
//! CLI argument definitions, the interactive chat REPL, progress display,
//! and console formatting.

pub mod chat;
pub mod cli;
pub mod output;
pub mod progress;

pub use chat::repl::ChatRepl;
pub use cli::commands::Cli;
pub use output::formatter::ConsoleFormatter;
pub use progress::reporter::ProgressReporter;
