//! # Recovery Strategy Catalog
//!
//! Static mapping from error category to the ordered list of candidate
//! recovery strategies. The match is exhaustive over the closed category
//! enum, so the compiler guarantees no category is ever left without a
//! strategy list.

use crate::types::{ErrorCategory, RecoveryStrategy};

use RecoveryStrategy::*;

/// Returns the ordered candidate strategies for a category.
///
/// Order matters: the orchestrator attempts these front to back and later
/// entries assume earlier ones were tried. `Escalation` appears in no list
/// because it is the orchestrator's terminal action, and `SystemRestart`
/// only makes sense for faults rooted in the component itself.
pub fn strategies_for(category: ErrorCategory) -> &'static [RecoveryStrategy] {
    match category {
        ErrorCategory::Therapeutic => {
            &[TherapeuticIntervention, GracefulDegradation, UserNotification]
        }
        ErrorCategory::Session => &[SessionRecovery, Fallback, UserNotification],
        ErrorCategory::Data => {
            &[SessionRecovery, Fallback, TherapeuticIntervention, UserNotification]
        }
        ErrorCategory::Network => &[Retry, Fallback, GracefulDegradation],
        ErrorCategory::Validation => &[UserNotification],
        ErrorCategory::Integration => &[Retry, Fallback, GracefulDegradation],
        ErrorCategory::Performance => &[GracefulDegradation, UserNotification],
        ErrorCategory::System => &[Retry, Fallback, SystemRestart],
    }
}

/// Number of distinct strategies the catalog knows how to execute.
pub const STRATEGY_COUNT: usize = 8;
