//! # Error Recovery Core
//!
//! Fault classification and recovery orchestration for the narrative
//! therapy platform. Callers (narrative engine, session manager,
//! therapeutic integrators) report failures into the
//! [`ErrorRecoveryManager`], which categorizes them, assesses severity and
//! therapeutic impact, attempts recovery strategies in catalog order, and
//! escalates when nothing works.
//!
//! ## Features
//!
//! - Two-dimensional fault taxonomy (category for strategy selection,
//!   severity for messaging tone)
//! - Ordered strategy attempts with a bounded per-fault budget
//! - Per-component fallback descriptors and graceful degradation
//! - Checksummed session backups with retention pruning
//! - Mandatory therapeutic-safe messaging for session-affecting faults
//! - Health and metrics telemetry plus a broadcast event stream

pub mod backup;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod events;
pub mod fallback;
pub mod intervention;
pub mod logging;
pub mod manager;
pub mod messages;
pub mod types;

// Re-export commonly used types
pub use backup::{BackupPayload, BackupStore, SystemBackup};
pub use classify::{Classifier, KeywordClassifier};
pub use config::RecoveryConfig;
pub use events::{EventBus, RecoveryEvent};
pub use fallback::{FallbackMechanism, FallbackRegistry};
pub use intervention::InterventionScenario;
pub use logging::{init_logging, LoggingConfig};
pub use manager::{
    ErrorRecoveryManager, FaultOrigin, HealthCheckReport, MetricsSnapshot,
    RecoveryCounters, SystemHealthStatus,
};
pub use types::{
    BackupKind, ComponentStatus, ErrorCategory, ErrorContext, ErrorSeverity,
    RecoveryError, RecoveryResult, RecoveryStrategy, Result,
};

/// Initializes logging with defaults and returns a manager with default
/// configuration.
pub fn init() -> Result<ErrorRecoveryManager> {
    init_logging(None)?;
    Ok(ErrorRecoveryManager::new())
}

/// Initializes logging and the manager from explicit configurations.
pub fn init_with_config(
    recovery: RecoveryConfig,
    logging: LoggingConfig,
) -> Result<ErrorRecoveryManager> {
    init_logging(Some(logging))?;
    Ok(ErrorRecoveryManager::with_config(recovery))
}
