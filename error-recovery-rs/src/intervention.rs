//! # Therapeutic Intervention Templates
//!
//! Canned supportive messaging keyed by scenario, used when a fault could
//! disrupt a therapeutic session. Copy stays calm and grounding; it never
//! mentions internals.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{ErrorCategory, ErrorContext};

/// The scenario a supportive message is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterventionScenario {
    /// A session was interrupted mid-flow; the default scenario
    SessionInterruption,
    /// Progress had to be restored from a backup
    DataRecovery,
    /// Parts of the system are running in reduced form
    SystemDegradation,
    /// A shared story lost one of its participants or services
    CollaborativeFailure,
}

/// Number of scenarios with a template.
pub const SCENARIO_COUNT: usize = 4;

/// Returns the supportive message for a scenario.
pub fn message_for(scenario: InterventionScenario) -> &'static str {
    match scenario {
        InterventionScenario::SessionInterruption => {
            "Let's take a gentle pause together. Your story and your progress \
             are safe, and we can pick up right where you left off whenever \
             you feel ready."
        }
        InterventionScenario::DataRecovery => {
            "We noticed a hiccup and restored your recent progress. Nothing \
             about your journey has been lost, and you can continue at your \
             own pace."
        }
        InterventionScenario::SystemDegradation => {
            "A few features are taking a short rest, so things may feel a \
             little simpler for a moment. The heart of your experience is \
             still here with you."
        }
        InterventionScenario::CollaborativeFailure => {
            "The shared part of your story needs a brief moment to itself. \
             Your own narrative continues, and your companions will rejoin \
             you soon."
        }
    }
}

/// Infers the scenario that best fits a fault.
///
/// Data faults read as recovery, collaborative components as collaborative
/// failure, an already-degraded system as degradation, everything else as a
/// session interruption.
pub fn infer_scenario(
    context: &ErrorContext,
    degraded_components: &HashSet<String>,
) -> InterventionScenario {
    if context.category == ErrorCategory::Data {
        return InterventionScenario::DataRecovery;
    }

    if context.component.contains("collaborative") {
        return InterventionScenario::CollaborativeFailure;
    }

    if !degraded_components.is_empty() {
        return InterventionScenario::SystemDegradation;
    }

    InterventionScenario::SessionInterruption
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(component: &str) -> ErrorContext {
        ErrorContext::new("TestError", "boom", component, "test_fn")
    }

    #[test]
    fn test_default_scenario_is_session_interruption() {
        let scenario = infer_scenario(&ctx("widget"), &HashSet::new());
        assert_eq!(scenario, InterventionScenario::SessionInterruption);
    }

    #[test]
    fn test_data_category_maps_to_data_recovery() {
        let mut context = ctx("widget");
        context.category = ErrorCategory::Data;
        let scenario = infer_scenario(&context, &HashSet::new());
        assert_eq!(scenario, InterventionScenario::DataRecovery);
    }

    #[test]
    fn test_collaborative_component_wins_over_degradation() {
        let mut degraded = HashSet::new();
        degraded.insert("narrative_engine".to_string());

        let scenario = infer_scenario(&ctx("collaborative_engine"), &degraded);
        assert_eq!(scenario, InterventionScenario::CollaborativeFailure);
    }

    #[test]
    fn test_degraded_system_maps_to_degradation() {
        let mut degraded = HashSet::new();
        degraded.insert("dialogue_generator".to_string());

        let scenario = infer_scenario(&ctx("widget"), &degraded);
        assert_eq!(scenario, InterventionScenario::SystemDegradation);
    }

    #[test]
    fn test_every_scenario_has_nonempty_copy() {
        for scenario in [
            InterventionScenario::SessionInterruption,
            InterventionScenario::DataRecovery,
            InterventionScenario::SystemDegradation,
            InterventionScenario::CollaborativeFailure,
        ] {
            assert!(!message_for(scenario).is_empty());
        }
    }
}
