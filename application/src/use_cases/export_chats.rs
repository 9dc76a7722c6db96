//! Chat export and import use cases.
//!
//! Thin orchestration over the domain export documents: decide what to
//! serialize, hand back pretty-printed JSON, and allocate fresh ids on
//! import.

use parley_domain::{BatchExport, ChatError, SessionExport, SessionId, SessionRegistry};
use tracing::warn;

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => Some(json),
        Err(err) => {
            warn!(error = %err, "export serialization failed");
            None
        }
    }
}

/// Serialize the active conversation, or `None` when it has no messages.
pub fn export_active(registry: &SessionRegistry) -> Option<String> {
    if registry.active().transcript().is_empty() {
        return None;
    }
    to_pretty_json(&SessionExport::from_session(registry.active()))
}

/// Serialize every conversation, the active one included.
///
/// Returns `None` when there is nothing to export at all.
pub fn export_all(registry: &mut SessionRegistry) -> Option<String> {
    registry.save_active();
    if registry.session_count() == 0 {
        return None;
    }
    to_pretty_json(&BatchExport::from_registry(registry))
}

/// Install an exported conversation as a new saved session under a fresh id.
pub fn import_session(
    registry: &mut SessionRegistry,
    export: SessionExport,
) -> Result<SessionId, ChatError> {
    let id = registry.allocate_id();
    let session = export.into_session(id.clone())?;
    registry.insert(session);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::{Message, ModelId};

    fn registry_with_turn() -> SessionRegistry {
        let mut registry = SessionRegistry::new(ModelId::default());
        registry.append_to_active(Message::user("Hello"));
        registry.append_to_active(Message::assistant("Hi there"));
        registry
    }

    #[test]
    fn empty_active_exports_nothing() {
        let registry = SessionRegistry::new(ModelId::default());
        assert!(export_active(&registry).is_none());
    }

    #[test]
    fn active_export_is_valid_json() {
        let registry = registry_with_turn();
        let json = export_active(&registry).unwrap();
        let parsed: SessionExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.messages.len(), 2);
        assert_eq!(parsed.model, ModelId::DEFAULT);
    }

    #[test]
    fn export_all_includes_unsaved_active() {
        let mut registry = registry_with_turn();
        let json = export_all(&mut registry).unwrap();
        let parsed: BatchExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_chats, 1);
    }

    #[test]
    fn export_all_on_fresh_registry_yields_none() {
        let mut registry = SessionRegistry::new(ModelId::default());
        assert!(export_all(&mut registry).is_none());
    }

    #[test]
    fn import_assigns_a_fresh_id() {
        let mut registry = registry_with_turn();
        let export: SessionExport =
            serde_json::from_str(&export_active(&registry).unwrap()).unwrap();

        let id = import_session(&mut registry, export).unwrap();

        assert_ne!(&id, registry.active_id());
        let imported = registry.get(&id).unwrap();
        assert_eq!(imported.transcript().len(), 2);
        assert_eq!(imported.title(), Some("Hello"));
    }
}
