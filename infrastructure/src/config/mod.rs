//! Configuration loading and merging.

pub mod file_config;
pub mod loader;
