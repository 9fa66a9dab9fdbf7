//! # Core Recovery Types
//!
//! This module provides the standardized fault and recovery types used
//! throughout the recovery core: the error taxonomy, the per-fault
//! `ErrorContext` record, and the `RecoveryResult` returned to callers.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A type alias for Result with the error type defaulting to `RecoveryError`
pub type Result<T, E = RecoveryError> = std::result::Result<T, E>;

/// Classifies what kind of fault occurred.
///
/// Recovery strategy selection keys on the category alone; user-facing
/// messaging tone keys on severity alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// General system or infrastructure fault
    System,
    /// Fault that touches therapeutic content or user emotional safety
    Therapeutic,
    /// Session state lost, interrupted or inconsistent
    Session,
    /// Data corruption, loss or integrity failure
    Data,
    /// Connectivity or remote store fault
    Network,
    /// Input or schema validation fault
    Validation,
    /// Cross-component orchestration fault
    Integration,
    /// Latency, timeout or overload fault
    Performance,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::System => write!(f, "system_error"),
            ErrorCategory::Therapeutic => write!(f, "therapeutic_error"),
            ErrorCategory::Session => write!(f, "session_error"),
            ErrorCategory::Data => write!(f, "data_error"),
            ErrorCategory::Network => write!(f, "network_error"),
            ErrorCategory::Validation => write!(f, "validation_error"),
            ErrorCategory::Integration => write!(f, "integration_error"),
            ErrorCategory::Performance => write!(f, "performance_error"),
        }
    }
}

impl Default for ErrorCategory {
    fn default() -> Self {
        ErrorCategory::System
    }
}

/// How bad a fault is, independent of its category.
///
/// The derived `Ord` follows declaration order, so severity comparisons and
/// the monotonic-escalation rule on `ErrorContext` work directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ErrorSeverity {
    /// Minor issue with no functional impact
    Low,
    /// Noticeable issue, core functionality intact
    Medium,
    /// Significant issue impacting functionality
    High,
    /// Severe issue requiring immediate handling
    Critical,
    /// Reserved for faults that could compromise user emotional safety
    /// during a therapeutic session
    TherapeuticCritical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::TherapeuticCritical => write!(f, "THERAPEUTIC_CRITICAL"),
        }
    }
}

impl Default for ErrorSeverity {
    fn default() -> Self {
        ErrorSeverity::Medium
    }
}

/// One concrete recovery action the orchestrator can attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecoveryStrategy {
    /// Brief pause and assume the transient condition cleared
    Retry,
    /// Switch the component to its registered degraded substitute
    Fallback,
    /// Disable a feature bucket and keep the rest of the system running
    GracefulDegradation,
    /// Restore session state from the most recent verified backup
    SessionRecovery,
    /// Deliver a canned supportive message to protect the session
    TherapeuticIntervention,
    /// Compose a severity-graded notification for the user
    UserNotification,
    /// Terminal administrative hand-off to a human/ops process
    Escalation,
    /// Mark the component restarting, pause, then mark it healthy
    SystemRestart,
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStrategy::Retry => write!(f, "retry"),
            RecoveryStrategy::Fallback => write!(f, "fallback"),
            RecoveryStrategy::GracefulDegradation => write!(f, "graceful_degradation"),
            RecoveryStrategy::SessionRecovery => write!(f, "session_recovery"),
            RecoveryStrategy::TherapeuticIntervention => {
                write!(f, "therapeutic_intervention")
            }
            RecoveryStrategy::UserNotification => write!(f, "user_notification"),
            RecoveryStrategy::Escalation => write!(f, "escalation"),
            RecoveryStrategy::SystemRestart => write!(f, "system_restart"),
        }
    }
}

/// Typed failure model for the recovery core's own fallible operations.
///
/// Strategy executors and the backup store return these instead of stuffing
/// reasons into strings; the orchestrator consumes them as failed attempts
/// and never lets them escape `handle_error`.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("backup {0} not found")]
    BackupNotFound(Uuid),

    #[error("checksum verification failed for backup {0}")]
    BackupCorrupted(Uuid),

    #[error("no backup stored for session {session_id}")]
    NoBackupForSession { session_id: String },

    #[error("no fallback mechanism registered for component {component}")]
    NoFallbackRegistered { component: String },

    #[error("strategy {strategy} failed: {reason}")]
    StrategyFailed {
        strategy: RecoveryStrategy,
        reason: String,
    },

    #[error("initialization error: {0}")]
    Initialization(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Record of one fault occurrence moving through the recovery pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique identifier for this fault occurrence
    pub id: Uuid,
    /// When the fault was reported
    pub timestamp: DateTime<Utc>,
    /// Rust type name of the reported error
    pub error_type: String,
    /// Human-readable fault message
    pub message: String,
    /// Assigned category
    pub category: ErrorCategory,
    /// Assigned severity; only ever raised, never lowered
    severity: ErrorSeverity,
    /// Component where the fault originated
    pub component: String,
    /// Function where the fault originated
    pub function: String,
    /// User the fault may affect, if known
    pub user_id: Option<String>,
    /// Session the fault may affect, if known
    pub session_id: Option<String>,
    /// Rendered source-error chain, if any
    pub detail: Option<String>,
    /// Captured backtrace text, if capture was enabled
    pub stack_trace: Option<String>,
    /// Arbitrary system-state snapshot supplied by the caller
    #[serde(default)]
    pub system_state: serde_json::Map<String, serde_json::Value>,
    /// Number of recovery attempts made so far
    pub recovery_attempts: u32,
    /// Ceiling on recovery attempts for this fault
    pub max_recovery_attempts: u32,
    /// Strategies already tried, in order
    pub attempted_strategies: Vec<RecoveryStrategy>,
    /// Caller-supplied therapeutic context (crisis flags, distress level)
    #[serde(default)]
    pub therapeutic_context: serde_json::Map<String, serde_json::Value>,
    /// Whether the fault could affect user emotional safety
    pub affects_therapeutic_safety: bool,
    /// Whether a supportive intervention must accompany recovery
    pub requires_therapeutic_intervention: bool,
}

impl ErrorContext {
    /// Creates a new context for a fault in the given component/function.
    pub fn new<S1, S2, S3, S4>(error_type: S1, message: S2, component: S3, function: S4) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
    {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            error_type: error_type.into(),
            message: message.into(),
            category: ErrorCategory::default(),
            severity: ErrorSeverity::default(),
            component: component.into(),
            function: function.into(),
            user_id: None,
            session_id: None,
            detail: None,
            stack_trace: None,
            system_state: serde_json::Map::new(),
            recovery_attempts: 0,
            max_recovery_attempts: 3,
            attempted_strategies: Vec::new(),
            therapeutic_context: serde_json::Map::new(),
            affects_therapeutic_safety: false,
            requires_therapeutic_intervention: false,
        }
    }

    /// Sets the user this fault may affect
    pub fn user<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the session this fault may affect
    pub fn session<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attaches the rendered source-error chain
    pub fn detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attaches captured backtrace text
    pub fn stack_trace<S: Into<String>>(mut self, trace: S) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    /// Replaces the therapeutic context map
    pub fn therapeutic_context(
        mut self,
        context: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.therapeutic_context = context;
        self
    }

    /// Adds one key to the system-state snapshot
    pub fn system_state<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.system_state.insert(key.into(), value);
        }
        self
    }

    /// Overrides the attempt ceiling
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.max_recovery_attempts = max;
        self
    }

    /// Current severity
    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    /// One-time assignment of the assessed severity, before any
    /// escalation. Later changes must go through `escalate_severity`.
    pub(crate) fn set_assessed_severity(&mut self, severity: ErrorSeverity) {
        self.severity = severity;
    }

    /// Raises the severity if `candidate` is higher than the stored value.
    ///
    /// Severity is monotonic once assessed; a lower candidate leaves the
    /// stored value untouched.
    pub fn escalate_severity(&mut self, candidate: ErrorSeverity) {
        if candidate > self.severity {
            self.severity = candidate;
        }
    }

    /// True once the attempt ceiling has been reached
    pub fn attempts_exhausted(&self) -> bool {
        self.recovery_attempts >= self.max_recovery_attempts
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} in {}::{}: {}",
            self.severity, self.category, self.component, self.function, self.message
        )
    }
}

/// Outcome of one orchestration pass over a fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryResult {
    /// Whether any strategy reported success
    pub success: bool,
    /// The strategy that produced this result, if one ran
    pub strategy_used: Option<RecoveryStrategy>,
    /// Elapsed time of the strategy loop
    pub recovery_time: Duration,
    /// Ordered audit trail of actions taken
    pub actions_taken: Vec<String>,
    /// Whether a registered fallback substitute was engaged
    pub fallback_used: bool,
    /// Whether session data was restored from a backup
    pub data_recovered: bool,
    /// Operational message for the user
    pub user_message: String,
    /// Supportive message for therapeutic continuity
    pub therapeutic_message: String,
    /// Whether the user must act before continuing
    pub requires_user_action: bool,
    /// Whether the system remains usable
    pub system_functional: bool,
    /// Names of features running in reduced form
    pub degraded_functionality: Vec<String>,
    /// Whether the fault should stay under observation
    pub monitoring_required: bool,
    /// Whether a human/ops process must take over
    pub escalation_needed: bool,
}

impl RecoveryResult {
    /// A blank, unsuccessful result to build strategy outcomes from.
    pub fn unresolved() -> Self {
        Self {
            success: false,
            strategy_used: None,
            recovery_time: Duration::ZERO,
            actions_taken: Vec::new(),
            fallback_used: false,
            data_recovered: false,
            user_message: String::new(),
            therapeutic_message: String::new(),
            requires_user_action: false,
            system_functional: true,
            degraded_functionality: Vec::new(),
            monitoring_required: false,
            escalation_needed: false,
        }
    }

    /// Records one audit-trail action
    pub fn action<S: Into<String>>(mut self, action: S) -> Self {
        self.actions_taken.push(action.into());
        self
    }

    /// Enforces the escalation invariant for a finished result: an
    /// unrecovered critical fault must carry the escalation flag.
    pub fn enforce_escalation_floor(mut self, severity: ErrorSeverity) -> Self {
        if !self.success && severity >= ErrorSeverity::Critical {
            self.escalation_needed = true;
        }
        self
    }
}

/// Kind of snapshot held by the backup store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupKind {
    /// Complete session-critical state
    Full,
    /// Delta since the previous snapshot
    Incremental,
    /// Taken ahead of a risky operation
    Emergency,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Full => write!(f, "full"),
            BackupKind::Incremental => write!(f, "incremental"),
            BackupKind::Emergency => write!(f, "emergency"),
        }
    }
}

/// Health of a single registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentStatus {
    /// Fully operational
    Healthy,
    /// Running a reduced substitute
    Degraded,
    /// Mid-restart, briefly unavailable
    Restarting,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentStatus::Healthy => write!(f, "healthy"),
            ComponentStatus::Degraded => write!(f, "degraded"),
            ComponentStatus::Restarting => write!(f, "restarting"),
        }
    }
}
