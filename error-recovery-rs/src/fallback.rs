//! # Fallback Mechanism Registry
//!
//! Per-component degraded-mode descriptors. When a component fails and the
//! fallback strategy runs, its descriptor says which feature gets disabled,
//! what keeps working in reduced form, and what to tell the user.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Degraded-mode descriptor for one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackMechanism {
    /// Component this descriptor covers
    pub component: String,
    /// Feature switched off while degraded
    pub disabled_feature: String,
    /// Functionality that keeps running in reduced form
    pub degraded_functionality: Vec<String>,
    /// Message shown to the user while the fallback is active
    pub user_message: String,
}

impl FallbackMechanism {
    /// Creates a descriptor for a component.
    pub fn new<S1, S2, S3>(component: S1, disabled_feature: S2, user_message: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            component: component.into(),
            disabled_feature: disabled_feature.into(),
            degraded_functionality: Vec::new(),
            user_message: user_message.into(),
        }
    }

    /// Adds one reduced-form functionality name
    pub fn degrades<S: Into<String>>(mut self, functionality: S) -> Self {
        self.degraded_functionality.push(functionality.into());
        self
    }
}

/// Registry of fallback descriptors keyed by component name.
#[derive(Debug, Default)]
pub struct FallbackRegistry {
    mechanisms: HashMap<String, FallbackMechanism>,
}

impl FallbackRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-loaded with the platform's core components.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(
            FallbackMechanism::new(
                "dialogue_generator",
                "dynamic_dialogue",
                "Conversations will use simpler phrasing for a little while.",
            )
            .degrades("template_dialogue"),
        );
        registry.register(
            FallbackMechanism::new(
                "character_development",
                "trait_evolution",
                "Character growth is paused briefly; your story continues.",
            )
            .degrades("static_personalities"),
        );
        registry.register(
            FallbackMechanism::new(
                "relationship_engine",
                "relationship_scoring",
                "Relationships are holding steady while we tidy things up.",
            )
            .degrades("frozen_relationship_state"),
        );
        registry.register(
            FallbackMechanism::new(
                "narrative_engine",
                "branching_narrative",
                "The story will follow a simpler path for now.",
            )
            .degrades("linear_narrative"),
        );
        registry.register(
            FallbackMechanism::new(
                "session_store",
                "persistent_sessions",
                "Your session is being kept safe in a temporary space.",
            )
            .degrades("in_memory_sessions"),
        );
        registry.register(
            FallbackMechanism::new(
                "collaborative_engine",
                "shared_storytelling",
                "Group storytelling is briefly solo; everything else works.",
            )
            .degrades("solo_narrative"),
        );

        registry
    }

    /// Registers or replaces a descriptor.
    pub fn register(&mut self, mechanism: FallbackMechanism) {
        self.mechanisms
            .insert(mechanism.component.clone(), mechanism);
    }

    /// Looks up the descriptor for a component.
    pub fn get(&self, component: &str) -> Option<&FallbackMechanism> {
        self.mechanisms.get(component)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.mechanisms.len()
    }

    /// True when no descriptors are registered.
    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_core_components() {
        let registry = FallbackRegistry::with_defaults();

        for component in [
            "dialogue_generator",
            "character_development",
            "relationship_engine",
            "narrative_engine",
            "session_store",
            "collaborative_engine",
        ] {
            let mechanism = registry.get(component).expect(component);
            assert!(!mechanism.user_message.is_empty());
            assert!(!mechanism.degraded_functionality.is_empty());
        }
    }

    #[test]
    fn test_unknown_component_has_no_mechanism() {
        let registry = FallbackRegistry::with_defaults();
        assert!(registry.get("quantum_flux_capacitor").is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = FallbackRegistry::new();
        registry.register(FallbackMechanism::new("c", "feature_a", "msg"));
        registry.register(
            FallbackMechanism::new("c", "feature_b", "msg").degrades("reduced"),
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("c").unwrap().disabled_feature, "feature_b");
    }
}
