//! Progress display.

pub mod reporter;
