//! Adapter registry
//!
//! Dispatch table from permission kind to its adapter. Adding a kind is a
//! registration, not an edit to every match in the request path.

use crate::adapter::PermissionAdapter;
use consent_api::PermissionKind;
use std::collections::HashMap;
use std::fmt;

/// Exclusive owner of one adapter per permission kind
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<PermissionKind, Box<dyn PermissionAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, returning the one it replaced
    pub fn register(
        &mut self,
        kind: PermissionKind,
        adapter: Box<dyn PermissionAdapter>,
    ) -> Option<Box<dyn PermissionAdapter>> {
        let previous = self.adapters.insert(kind, adapter);
        if previous.is_some() {
            tracing::debug!(kind = %kind, "Adapter replaced");
        }
        previous
    }

    /// Look up the adapter for a kind
    pub fn get(&self, kind: PermissionKind) -> Option<&dyn PermissionAdapter> {
        self.adapters.get(&kind).map(|adapter| adapter.as_ref())
    }

    pub fn contains(&self, kind: PermissionKind) -> bool {
        self.adapters.contains_key(&kind)
    }

    /// Registered kinds, in enumeration order
    pub fn kinds(&self) -> Vec<PermissionKind> {
        PermissionKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.adapters.contains_key(kind))
            .collect()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AutoAdapter;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = AdapterRegistry::new();
        assert!(registry.kinds().is_empty());

        registry.register(PermissionKind::Microphone, Box::new(AutoAdapter::granting()));
        registry.register(PermissionKind::Camera, Box::new(AutoAdapter::denying()));

        assert!(registry.get(PermissionKind::Camera).is_some());
        assert!(registry.get(PermissionKind::Contacts).is_none());
        assert_eq!(
            registry.kinds(),
            vec![PermissionKind::Camera, PermissionKind::Microphone]
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = AdapterRegistry::new();
        assert!(registry
            .register(PermissionKind::Camera, Box::new(AutoAdapter::granting()))
            .is_none());
        assert!(registry
            .register(PermissionKind::Camera, Box::new(AutoAdapter::denying()))
            .is_some());
        assert_eq!(registry.kinds(), vec![PermissionKind::Camera]);
        assert!(registry.contains(PermissionKind::Camera));
    }
}
