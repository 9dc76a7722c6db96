//! Backend model identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a backend model (e.g. `llama3.2:3b`).
///
/// parley performs no model selection of its own; the identifier is carried
/// through to the backend process verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Model used when neither the CLI nor the configuration names one.
    pub const DEFAULT: &'static str = "llama3.2:3b";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl FromStr for ModelId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_id() {
        assert_eq!(ModelId::default().as_str(), "llama3.2:3b");
    }

    #[test]
    fn display_round_trip() {
        let model: ModelId = "qwen2.5:7b".parse().unwrap();
        assert_eq!(model.to_string(), "qwen2.5:7b");
    }
}
