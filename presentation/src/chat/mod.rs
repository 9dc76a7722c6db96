//! Interactive chat mode.

pub mod repl;
