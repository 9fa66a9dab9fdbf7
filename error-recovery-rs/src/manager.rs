//! # Recovery Orchestrator
//!
//! `ErrorRecoveryManager` is the entry point for the whole crate: callers
//! report faults into `handle_error`, which classifies them, walks the
//! strategy catalog under a bounded attempt budget, escalates when nothing
//! works, and keeps the health registry, metrics and backup store current.
//!
//! All shared mutable state lives in one `ManagerState` behind a single
//! lock, and no lock is held across an await point, so a single manager can
//! be shared across tasks as `Arc<ErrorRecoveryManager>`.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use metrics::{counter, gauge};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backup::{BackupPayload, BackupStore, SystemBackup};
use crate::catalog::{strategies_for, STRATEGY_COUNT};
use crate::classify::{Classifier, KeywordClassifier};
use crate::config::RecoveryConfig;
use crate::events::{EventBus, RecoveryEvent};
use crate::fallback::{FallbackMechanism, FallbackRegistry};
use crate::intervention::{infer_scenario, message_for, InterventionScenario, SCENARIO_COUNT};
use crate::logging::log_context;
use crate::messages;
use crate::types::{
    BackupKind, ComponentStatus, ErrorContext, ErrorSeverity, RecoveryError,
    RecoveryResult, RecoveryStrategy, Result,
};

/// Where a reported fault came from, plus any session/therapeutic scope the
/// caller can supply.
#[derive(Debug, Clone, Default)]
pub struct FaultOrigin {
    /// Component reporting the fault
    pub component: String,
    /// Function reporting the fault
    pub function: String,
    /// Affected user, if known
    pub user_id: Option<String>,
    /// Affected session, if known
    pub session_id: Option<String>,
    /// Crisis flags, distress level and similar caller context
    pub therapeutic_context: Option<serde_json::Map<String, serde_json::Value>>,
}

impl FaultOrigin {
    /// Creates an origin for a component/function pair.
    pub fn new<S1: Into<String>, S2: Into<String>>(component: S1, function: S2) -> Self {
        Self {
            component: component.into(),
            function: function.into(),
            ..Default::default()
        }
    }

    /// Sets the affected user
    pub fn user<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the affected session
    pub fn session<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attaches caller-supplied therapeutic context
    pub fn therapeutic_context(
        mut self,
        context: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.therapeutic_context = Some(context);
        self
    }
}

/// Monotonic counters kept by the orchestrator.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoveryCounters {
    pub errors_handled: u64,
    pub successful_recoveries: u64,
    pub failed_recoveries: u64,
    pub therapeutic_interventions: u64,
    pub session_recoveries: u64,
    pub data_recoveries: u64,
    pub escalations: u64,
    pub system_restarts: u64,
}

/// Counters plus the derived figures exposed to telemetry consumers.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    #[serde(flatten)]
    pub counters: RecoveryCounters,
    pub active_error_count: usize,
    pub backup_count: usize,
    pub recovery_success_rate: f64,
}

/// System-level health view assembled on demand.
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthStatus {
    /// "healthy", "degraded" or "critical"
    pub overall_status: String,
    pub active_errors: usize,
    pub active_errors_by_severity: HashMap<String, usize>,
    pub degraded_components: Vec<String>,
    pub component_status: HashMap<String, ComponentStatus>,
    /// Faults seen inside the recent-error window
    pub recent_errors: usize,
    pub recovery_success_rate: f64,
    pub system_backups_available: usize,
    pub metrics: RecoveryCounters,
}

/// Self-check report for liveness probes.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckReport {
    pub status: String,
    pub recovery_strategies_loaded: usize,
    pub fallback_mechanisms_loaded: usize,
    pub therapeutic_interventions_loaded: usize,
    pub system_health: SystemHealthStatus,
    pub metrics: MetricsSnapshot,
}

/// Everything the orchestrator mutates, guarded as one unit.
#[derive(Debug)]
struct ManagerState {
    active_errors: HashMap<Uuid, ErrorContext>,
    error_history: VecDeque<ErrorContext>,
    recovery_history: VecDeque<RecoveryResult>,
    component_status: HashMap<String, ComponentStatus>,
    degraded_components: HashSet<String>,
    counters: RecoveryCounters,
    fallbacks: FallbackRegistry,
    backups: BackupStore,
}

impl ManagerState {
    fn new() -> Self {
        Self {
            active_errors: HashMap::new(),
            error_history: VecDeque::new(),
            recovery_history: VecDeque::new(),
            component_status: HashMap::new(),
            degraded_components: HashSet::new(),
            counters: RecoveryCounters::default(),
            fallbacks: FallbackRegistry::with_defaults(),
            backups: BackupStore::new(),
        }
    }

    fn push_error_history(&mut self, context: ErrorContext, limit: usize) {
        if self.error_history.len() >= limit {
            self.error_history.pop_front();
        }
        self.error_history.push_back(context);
    }

    fn push_recovery_history(&mut self, result: RecoveryResult, limit: usize) {
        if self.recovery_history.len() >= limit {
            self.recovery_history.pop_front();
        }
        self.recovery_history.push_back(result);
    }

    /// Fraction of recorded recoveries that succeeded; 1.0 on no history.
    fn recovery_success_rate(&self) -> f64 {
        if self.recovery_history.is_empty() {
            return 1.0;
        }
        let successes = self.recovery_history.iter().filter(|r| r.success).count();
        successes as f64 / self.recovery_history.len() as f64
    }

    fn mark_degraded(&mut self, component: &str) {
        self.component_status
            .insert(component.to_string(), ComponentStatus::Degraded);
        self.degraded_components.insert(component.to_string());
    }
}

/// The recovery orchestrator.
pub struct ErrorRecoveryManager {
    config: RecoveryConfig,
    classifier: Box<dyn Classifier>,
    state: RwLock<ManagerState>,
    events: EventBus,
}

impl Default for ErrorRecoveryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorRecoveryManager {
    /// Creates a manager with default configuration and the keyword
    /// classifier.
    pub fn new() -> Self {
        Self::with_config(RecoveryConfig::default())
    }

    /// Creates a manager with the given configuration.
    pub fn with_config(config: RecoveryConfig) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            config,
            classifier: Box::new(KeywordClassifier),
            state: RwLock::new(ManagerState::new()),
            events,
        }
    }

    /// Swaps in a different classifier implementation.
    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Handles a fault reported from the given component/function.
    ///
    /// Convenience form of [`handle_error_with`](Self::handle_error_with)
    /// without user/session scope.
    pub async fn handle_error<E>(
        &self,
        error: &E,
        component: &str,
        function: &str,
    ) -> RecoveryResult
    where
        E: std::error::Error,
    {
        self.handle_error_with(error, FaultOrigin::new(component, function))
            .await
    }

    /// Handles a fault with full origin scope. Never fails: whatever
    /// happens during recovery is folded into the returned result.
    pub async fn handle_error_with<E>(&self, error: &E, origin: FaultOrigin) -> RecoveryResult
    where
        E: std::error::Error,
    {
        let mut context = self.build_context(error, origin);

        // Classification runs exactly once per context.
        context.category = self.classifier.categorize(&context);
        let assessed = self.classifier.assess_severity(&context);
        context.set_assessed_severity(assessed);
        self.classifier.assess_therapeutic_impact(&mut context);
        log_context(&context);

        {
            let mut state = self.state.write().unwrap();
            state.counters.errors_handled += 1;
            state.active_errors.insert(context.id, context.clone());
        }
        counter!("recovery.errors_handled", 1);
        self.events.publish(RecoveryEvent::from_context(&context));

        let strategies = strategies_for(context.category);
        let result = self.run_strategies(&mut context, strategies).await;
        self.complete(context, result)
    }

    /// Runs a scoped block of caller code under recovery protection.
    ///
    /// On success the block's value comes back as `Ok(Some(value))`. On
    /// failure the fault is routed through `handle_error_with`; the
    /// original error resurfaces only when recovery failed with escalation
    /// flagged, otherwise the fault is absorbed and `Ok(None)` is returned.
    pub async fn protect<T, E, F>(
        &self,
        origin: FaultOrigin,
        fut: F,
    ) -> std::result::Result<Option<T>, E>
    where
        E: std::error::Error,
        F: Future<Output = std::result::Result<T, E>>,
    {
        match fut.await {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                let result = self.handle_error_with(&err, origin).await;
                if should_reraise(&result) {
                    Err(err)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn build_context<E>(&self, error: &E, origin: FaultOrigin) -> ErrorContext
    where
        E: std::error::Error,
    {
        let mut context = ErrorContext::new(
            std::any::type_name::<E>(),
            error.to_string(),
            origin.component,
            origin.function,
        )
        .max_attempts(self.config.max_recovery_attempts);

        if let Some(user_id) = origin.user_id {
            context = context.user(user_id);
        }
        if let Some(session_id) = origin.session_id {
            context = context.session(session_id);
        }
        if let Some(map) = origin.therapeutic_context {
            context = context.therapeutic_context(map);
        }

        let mut sources = Vec::new();
        let mut cause = error.source();
        while let Some(inner) = cause {
            sources.push(inner.to_string());
            cause = inner.source();
        }
        if !sources.is_empty() {
            context = context.detail(sources.join(": "));
        }

        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            context = context.stack_trace(backtrace.to_string());
        }

        context
    }

    /// Attempts the given strategies in order under the context's attempt
    /// budget, escalating once the list or the budget runs out.
    pub(crate) async fn run_strategies(
        &self,
        context: &mut ErrorContext,
        strategies: &[RecoveryStrategy],
    ) -> RecoveryResult {
        let start = Instant::now();

        for &strategy in strategies {
            if context.attempts_exhausted() {
                warn!(
                    error_id = %context.id,
                    attempts = %context.recovery_attempts,
                    "Recovery attempt budget exhausted"
                );
                break;
            }

            context.recovery_attempts += 1;
            context.attempted_strategies.push(strategy);
            debug!(
                error_id = %context.id,
                strategy = %strategy,
                attempt = %context.recovery_attempts,
                "Attempting recovery strategy"
            );

            match self.execute_strategy(strategy, context).await {
                Ok(mut result) => {
                    result.strategy_used = Some(strategy);
                    result.recovery_time = start.elapsed();
                    counter!(format!("recovery.strategy.{strategy}.success"), 1);
                    info!(
                        error_id = %context.id,
                        strategy = %strategy,
                        attempt = %context.recovery_attempts,
                        "Recovery strategy succeeded"
                    );
                    return result;
                }
                Err(err) => {
                    counter!(format!("recovery.strategy.{strategy}.failure"), 1);
                    debug!(
                        error_id = %context.id,
                        strategy = %strategy,
                        error = %err,
                        "Recovery strategy failed, trying next"
                    );
                }
            }
        }

        context.attempted_strategies.push(RecoveryStrategy::Escalation);
        let mut result = self.execute_escalation(context);
        result.strategy_used = Some(RecoveryStrategy::Escalation);
        result.recovery_time = start.elapsed();
        result
    }

    /// Final bookkeeping for a finished orchestration pass.
    fn complete(&self, context: ErrorContext, mut result: RecoveryResult) -> RecoveryResult {
        if result.user_message.is_empty() {
            result.user_message = messages::user_message(context.severity());
        } else {
            result.user_message = messages::sanitize_user_text(&result.user_message);
        }

        // A fault that touches therapeutic context always carries a
        // supportive message, whichever strategy produced the result.
        let touches_therapy = context.affects_therapeutic_safety
            || context.requires_therapeutic_intervention
            || !context.therapeutic_context.is_empty();
        if result.therapeutic_message.is_empty() && touches_therapy {
            result.therapeutic_message = messages::therapeutic_message(context.severity());
        }

        result = result.enforce_escalation_floor(context.severity());

        let active = {
            let mut state = self.state.write().unwrap();
            if result.success {
                state.active_errors.remove(&context.id);
                state.counters.successful_recoveries += 1;
            } else {
                // Keep the live entry's attempt bookkeeping current
                state.active_errors.insert(context.id, context.clone());
                state.counters.failed_recoveries += 1;
            }
            let limit = self.config.history_limit;
            state.push_error_history(context, limit);
            state.push_recovery_history(result.clone(), limit);
            state.active_errors.len()
        };

        if result.success {
            counter!("recovery.recovered", 1);
        } else {
            counter!("recovery.failed", 1);
        }
        gauge!("recovery.active_errors", active as f64);

        result
    }

    /// Dispatches one strategy to its executor. The match is exhaustive so
    /// adding a strategy variant forces an executor.
    async fn execute_strategy(
        &self,
        strategy: RecoveryStrategy,
        context: &ErrorContext,
    ) -> Result<RecoveryResult> {
        match strategy {
            RecoveryStrategy::Retry => self.execute_retry(context).await,
            RecoveryStrategy::Fallback => self.execute_fallback(context),
            RecoveryStrategy::GracefulDegradation => {
                self.execute_graceful_degradation(context)
            }
            RecoveryStrategy::SessionRecovery => self.execute_session_recovery(context),
            RecoveryStrategy::TherapeuticIntervention => {
                self.execute_therapeutic_intervention(context)
            }
            RecoveryStrategy::UserNotification => {
                Ok(self.execute_user_notification(context))
            }
            RecoveryStrategy::Escalation => Ok(self.execute_escalation(context)),
            RecoveryStrategy::SystemRestart => self.execute_system_restart(context).await,
        }
    }

    /// Brief jittered pause standing in for a real re-attempt.
    async fn execute_retry(&self, _context: &ErrorContext) -> Result<RecoveryResult> {
        let base_ms = self.config.retry_pause.as_millis() as f64;
        let jitter_range = base_ms * self.config.retry_jitter;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..jitter_range)
        } else {
            0.0
        };
        let pause = Duration::from_millis((base_ms + jitter).max(0.0) as u64);

        tokio::time::sleep(pause).await;

        let mut result = RecoveryResult::unresolved()
            .action(format!("paused {}ms before resuming", pause.as_millis()));
        result.success = true;
        result.user_message = messages::user_message(ErrorSeverity::Low);
        Ok(result)
    }

    /// Switches the component to its registered degraded substitute.
    fn execute_fallback(&self, context: &ErrorContext) -> Result<RecoveryResult> {
        let mut state = self.state.write().unwrap();

        let mechanism = state
            .fallbacks
            .get(&context.component)
            .cloned()
            .ok_or_else(|| RecoveryError::NoFallbackRegistered {
                component: context.component.clone(),
            })?;

        state.mark_degraded(&context.component);
        drop(state);

        info!(
            component = %context.component,
            disabled = %mechanism.disabled_feature,
            "Component switched to fallback mode"
        );

        let mut result = RecoveryResult::unresolved()
            .action(format!("disabled {}", mechanism.disabled_feature))
            .action(format!("switched {} to fallback mode", context.component));
        result.success = true;
        result.fallback_used = true;
        result.degraded_functionality = mechanism.degraded_functionality;
        result.user_message = mechanism.user_message;
        result.monitoring_required = true;
        Ok(result)
    }

    /// Disables a feature bucket inferred from the component name.
    fn execute_graceful_degradation(&self, context: &ErrorContext) -> Result<RecoveryResult> {
        let bucket = if context.component.contains("collaborative") {
            "collaborative_storytelling"
        } else if context.component.contains("exploration")
            || context.component.contains("narrative")
        {
            "world_exploration"
        } else if context.component.contains("character") {
            "character_development"
        } else {
            "advanced_features"
        };

        {
            let mut state = self.state.write().unwrap();
            state.mark_degraded(&context.component);
        }

        info!(
            component = %context.component,
            feature = %bucket,
            "Feature bucket degraded"
        );

        let mut result = RecoveryResult::unresolved()
            .action(format!("degraded feature bucket {bucket}"));
        result.success = true;
        result.degraded_functionality = vec![bucket.to_string()];
        result.user_message = messages::user_message(ErrorSeverity::Medium);
        result.monitoring_required = true;
        Ok(result)
    }

    /// Restores the most recent verified backup for the fault's session.
    fn execute_session_recovery(&self, context: &ErrorContext) -> Result<RecoveryResult> {
        let session_id = context.session_id.as_deref().ok_or_else(|| {
            RecoveryError::NoBackupForSession {
                session_id: "<none>".to_string(),
            }
        })?;

        let mut state = self.state.write().unwrap();
        let backup_id = state
            .backups
            .latest_for_session(session_id)
            .map(|b| b.id)
            .ok_or_else(|| RecoveryError::NoBackupForSession {
                session_id: session_id.to_string(),
            })?;

        state.backups.verify_integrity(&backup_id)?;
        state.counters.session_recoveries += 1;
        drop(state);

        info!(
            session_id = %session_id,
            backup_id = %backup_id,
            "Session restored from backup"
        );

        let mut result = RecoveryResult::unresolved()
            .action("verified backup integrity".to_string())
            .action(format!("restored session {session_id} from backup {backup_id}"));
        result.success = true;
        result.data_recovered = true;
        result.therapeutic_message =
            message_for(InterventionScenario::DataRecovery).to_string();
        result.monitoring_required = true;
        Ok(result)
    }

    /// Delivers a canned supportive message for the inferred scenario.
    fn execute_therapeutic_intervention(
        &self,
        context: &ErrorContext,
    ) -> Result<RecoveryResult> {
        let scenario = {
            let mut state = self.state.write().unwrap();
            state.counters.therapeutic_interventions += 1;
            infer_scenario(context, &state.degraded_components)
        };
        counter!("recovery.therapeutic_interventions", 1);

        let mut result = RecoveryResult::unresolved()
            .action(format!("delivered supportive message for {scenario:?}"));
        result.success = true;
        result.therapeutic_message = message_for(scenario).to_string();
        result.user_message = messages::user_message(context.severity());
        result.monitoring_required = context.affects_therapeutic_safety;
        Ok(result)
    }

    /// Composes a severity-graded notification.
    fn execute_user_notification(&self, context: &ErrorContext) -> RecoveryResult {
        let severity = context.severity();

        let mut result = RecoveryResult::unresolved()
            .action(format!("notified user at {severity} severity"));
        result.success = true;
        result.user_message = messages::user_message(severity);
        result.therapeutic_message = messages::therapeutic_message(severity);
        result.requires_user_action = messages::requires_user_action(severity);
        result
    }

    /// Terminal administrative hand-off. Always succeeds so the
    /// orchestrator's own failure modes stay bounded.
    fn execute_escalation(&self, context: &ErrorContext) -> RecoveryResult {
        error!(
            error_id = %context.id,
            error_type = %context.error_type,
            category = %context.category,
            severity = %context.severity(),
            component = %context.component,
            "Fault escalated to operations"
        );

        {
            let mut state = self.state.write().unwrap();
            state.counters.escalations += 1;
        }
        counter!("recovery.escalations", 1);

        let mut result = RecoveryResult::unresolved()
            .action("escalated to operations".to_string());
        result.success = true;
        result.escalation_needed = true;
        result.monitoring_required = true;
        result.user_message = messages::user_message(ErrorSeverity::Critical);
        result.therapeutic_message = messages::therapeutic_message(context.severity());
        result
    }

    /// Marks the component restarting, pauses, then marks it healthy.
    async fn execute_system_restart(&self, context: &ErrorContext) -> Result<RecoveryResult> {
        {
            let mut state = self.state.write().unwrap();
            state
                .component_status
                .insert(context.component.clone(), ComponentStatus::Restarting);
        }

        tokio::time::sleep(self.config.restart_pause).await;

        {
            let mut state = self.state.write().unwrap();
            state
                .component_status
                .insert(context.component.clone(), ComponentStatus::Healthy);
            state.degraded_components.remove(&context.component);
            state.counters.system_restarts += 1;
        }
        counter!("recovery.system_restarts", 1);

        info!(component = %context.component, "Component restarted");

        let mut result = RecoveryResult::unresolved()
            .action(format!("restarted {}", context.component));
        result.success = true;
        result.user_message = messages::user_message(ErrorSeverity::Medium);
        Ok(result)
    }

    /// Builds, checksums and stores a backup of session-critical state,
    /// then prunes anything past the retention window.
    pub fn create_system_backup(
        &self,
        user_id: &str,
        session_id: &str,
        backup_type: BackupKind,
        payload: BackupPayload,
    ) -> Result<SystemBackup> {
        let mut state = self.state.write().unwrap();
        let backup = state
            .backups
            .create(user_id, session_id, backup_type, payload)?;
        state
            .backups
            .prune_expired(chrono::Duration::days(self.config.backup_retention_days));
        gauge!("recovery.backups", state.backups.len() as f64);
        Ok(backup)
    }

    /// Restores a specific backup, reporting the outcome as a
    /// `RecoveryResult` rather than failing.
    pub fn restore_from_backup(&self, backup_id: &Uuid) -> RecoveryResult {
        let mut state = self.state.write().unwrap();

        let mut result = match state.backups.verify_integrity(backup_id) {
            Ok(()) => {
                state.counters.session_recoveries += 1;
                state.counters.data_recoveries += 1;

                let mut result = RecoveryResult::unresolved()
                    .action("verified backup integrity".to_string())
                    .action(format!("restored state from backup {backup_id}"));
                result.success = true;
                result.strategy_used = Some(RecoveryStrategy::SessionRecovery);
                result.data_recovered = true;
                result.user_message = "Your recent progress has been restored.".to_string();
                result.therapeutic_message =
                    message_for(InterventionScenario::DataRecovery).to_string();
                result
            }
            Err(RecoveryError::BackupNotFound(_)) => {
                warn!(backup_id = %backup_id, "Restore requested for unknown backup");
                let mut result = RecoveryResult::unresolved()
                    .action(format!("no backup found with id {backup_id}"));
                result.user_message =
                    "We couldn't find that restore point. Your current session is unaffected."
                        .to_string();
                result.therapeutic_message =
                    messages::therapeutic_message(ErrorSeverity::Medium);
                result
            }
            Err(err) => {
                error!(backup_id = %backup_id, error = %err, "Backup restore failed");
                let mut result = RecoveryResult::unresolved()
                    .action(format!("backup {backup_id} failed integrity verification"));
                result.user_message =
                    "That restore point couldn't be used safely, so nothing was changed."
                        .to_string();
                result.therapeutic_message =
                    messages::therapeutic_message(ErrorSeverity::High);
                result.monitoring_required = true;
                result
            }
        };

        if result.success {
            state.counters.successful_recoveries += 1;
        } else {
            state.counters.failed_recoveries += 1;
        }
        let limit = self.config.history_limit;
        state.push_recovery_history(result.clone(), limit);
        drop(state);

        result.recovery_time = Duration::ZERO;
        result
    }

    /// Registers an extra fallback descriptor beyond the built-in defaults.
    pub fn register_fallback(&self, mechanism: FallbackMechanism) {
        let mut state = self.state.write().unwrap();
        state.fallbacks.register(mechanism);
    }

    /// Opens a subscription to published recovery events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RecoveryEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the counters plus derived figures.
    pub fn metrics(&self) -> MetricsSnapshot {
        let state = self.state.read().unwrap();
        MetricsSnapshot {
            counters: state.counters.clone(),
            active_error_count: state.active_errors.len(),
            backup_count: state.backups.len(),
            recovery_success_rate: state.recovery_success_rate(),
        }
    }

    /// Assembles the system-level health view.
    pub fn system_health_status(&self) -> SystemHealthStatus {
        let state = self.state.read().unwrap();

        let mut by_severity: HashMap<String, usize> = HashMap::new();
        let mut worst = ErrorSeverity::Low;
        for context in state.active_errors.values() {
            *by_severity
                .entry(context.severity().to_string())
                .or_insert(0) += 1;
            if context.severity() > worst {
                worst = context.severity();
            }
        }

        let overall_status = if !state.active_errors.is_empty()
            && worst >= ErrorSeverity::Critical
        {
            "critical"
        } else if !state.degraded_components.is_empty() || !state.active_errors.is_empty() {
            "degraded"
        } else {
            "healthy"
        };

        let window = chrono::Duration::from_std(self.config.recent_error_window)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let cutoff = chrono::Utc::now() - window;
        let recent_errors = state
            .error_history
            .iter()
            .filter(|c| c.timestamp > cutoff)
            .count();

        let mut degraded: Vec<String> =
            state.degraded_components.iter().cloned().collect();
        degraded.sort();

        SystemHealthStatus {
            overall_status: overall_status.to_string(),
            active_errors: state.active_errors.len(),
            active_errors_by_severity: by_severity,
            degraded_components: degraded,
            component_status: state.component_status.clone(),
            recent_errors,
            recovery_success_rate: state.recovery_success_rate(),
            system_backups_available: state.backups.len(),
            metrics: state.counters.clone(),
        }
    }

    /// Self-check for liveness probes: confirms the catalogs are loaded
    /// and embeds the current health and metrics views.
    pub fn health_check(&self) -> HealthCheckReport {
        let system_health = self.system_health_status();
        let fallback_count = {
            let state = self.state.read().unwrap();
            state.fallbacks.len()
        };

        HealthCheckReport {
            status: system_health.overall_status.clone(),
            recovery_strategies_loaded: STRATEGY_COUNT,
            fallback_mechanisms_loaded: fallback_count,
            therapeutic_interventions_loaded: SCENARIO_COUNT,
            system_health,
            metrics: self.metrics(),
        }
    }
}

/// The scoped helper re-raises only when recovery failed with escalation
/// flagged; an administratively successful escalation absorbs the fault.
fn should_reraise(result: &RecoveryResult) -> bool {
    !result.success && result.escalation_needed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fmt;

    #[derive(Debug)]
    struct TestFault(&'static str);

    impl fmt::Display for TestFault {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for TestFault {}

    fn quick_config() -> RecoveryConfig {
        RecoveryConfig {
            retry_pause: Duration::from_millis(1),
            retry_jitter: 0.0,
            restart_pause: Duration::from_millis(1),
            ..RecoveryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_handle_error_counts_every_call_once() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        manager
            .handle_error(&TestFault("minor hiccup"), "widget", "spin")
            .await;
        manager
            .handle_error(&TestFault("another hiccup"), "widget", "spin")
            .await;

        let metrics = manager.metrics();
        assert_eq!(metrics.counters.errors_handled, 2);
        assert_eq!(
            metrics.counters.successful_recoveries + metrics.counters.failed_recoveries,
            2
        );

        // The keyword tiers can assign below the default severity
        let state = manager.state.read().unwrap();
        assert_eq!(
            state.error_history.front().unwrap().severity(),
            ErrorSeverity::Low
        );
    }

    #[tokio::test]
    async fn test_session_error_without_backup_falls_through_to_fallback() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        let result = manager
            .handle_error_with(
                &TestFault("session state lost"),
                FaultOrigin::new("session_store", "load_session").session("sess-1"),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.strategy_used, Some(RecoveryStrategy::Fallback));
        assert!(result.fallback_used);

        let state = manager.state.read().unwrap();
        let handled = state
            .error_history
            .iter()
            .find(|c| c.session_id.as_deref() == Some("sess-1"))
            .unwrap();
        // The failed session-recovery attempt is preserved, not reset
        assert_eq!(handled.recovery_attempts, 2);
        assert_eq!(
            handled.attempted_strategies,
            vec![RecoveryStrategy::SessionRecovery, RecoveryStrategy::Fallback]
        );
        assert!(state.degraded_components.contains("session_store"));
    }

    #[tokio::test]
    async fn test_crisis_context_forces_therapeutic_critical() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        let mut therapeutic = serde_json::Map::new();
        therapeutic.insert("in_crisis".to_string(), json!(true));

        let result = manager
            .handle_error_with(
                &TestFault("a perfectly mundane message"),
                FaultOrigin::new("widget", "spin").therapeutic_context(therapeutic),
            )
            .await;

        assert!(!result.therapeutic_message.is_empty());

        let state = manager.state.read().unwrap();
        let handled = state.error_history.back().unwrap();
        assert_eq!(handled.severity(), ErrorSeverity::TherapeuticCritical);
        assert!(handled.affects_therapeutic_safety);
        assert!(handled.requires_therapeutic_intervention);
    }

    #[tokio::test]
    async fn test_attempt_budget_gates_long_catalogs() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        // Four candidates, the first three doomed to fail: no backup exists
        // and the component has no registered fallback. The fourth would
        // succeed but must never run once the budget of 3 is spent.
        let strategies = [
            RecoveryStrategy::SessionRecovery,
            RecoveryStrategy::Fallback,
            RecoveryStrategy::SessionRecovery,
            RecoveryStrategy::UserNotification,
        ];

        let mut context =
            ErrorContext::new("TestFault", "boom", "unregistered_component", "run")
                .session("sess-without-backup")
                .max_attempts(3);

        let result = manager.run_strategies(&mut context, &strategies).await;

        assert_eq!(context.recovery_attempts, 3);
        assert_eq!(
            context.attempted_strategies,
            vec![
                RecoveryStrategy::SessionRecovery,
                RecoveryStrategy::Fallback,
                RecoveryStrategy::SessionRecovery,
                RecoveryStrategy::Escalation,
            ]
        );
        assert!(!context
            .attempted_strategies
            .contains(&RecoveryStrategy::UserNotification));
        assert_eq!(result.strategy_used, Some(RecoveryStrategy::Escalation));
        assert!(result.escalation_needed);
        assert!(result.monitoring_required);
        // Escalation is administratively successful by contract
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_fallback_failure_leaves_degraded_set_untouched() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        let mut context =
            ErrorContext::new("TestFault", "boom", "quantum_flux_capacitor", "run");
        let result = manager
            .run_strategies(&mut context, &[RecoveryStrategy::Fallback])
            .await;

        // The lone strategy failed, so the pass ended in escalation
        assert_eq!(result.strategy_used, Some(RecoveryStrategy::Escalation));

        let state = manager.state.read().unwrap();
        assert!(state.degraded_components.is_empty());
        assert!(!state
            .component_status
            .contains_key("quantum_flux_capacitor"));
    }

    #[tokio::test]
    async fn test_backup_roundtrip_bumps_both_counters() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        let backup = manager
            .create_system_backup(
                "user-1",
                "sess-1",
                BackupKind::Full,
                BackupPayload::default(),
            )
            .unwrap();

        let before = manager.metrics();
        let result = manager.restore_from_backup(&backup.id);
        let after = manager.metrics();

        assert!(result.success);
        assert!(result.data_recovered);
        assert_eq!(result.strategy_used, Some(RecoveryStrategy::SessionRecovery));
        assert!(!result.therapeutic_message.is_empty());
        assert_eq!(
            after.counters.session_recoveries,
            before.counters.session_recoveries + 1
        );
        assert_eq!(
            after.counters.data_recoveries,
            before.counters.data_recoveries + 1
        );
    }

    #[tokio::test]
    async fn test_restore_unknown_backup_reports_failure() {
        let manager = ErrorRecoveryManager::with_config(quick_config());
        let result = manager.restore_from_backup(&Uuid::new_v4());

        assert!(!result.success);
        assert!(!result.data_recovered);
        assert!(!result.user_message.is_empty());
    }

    #[test]
    fn test_success_rate_on_synthetic_history() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        assert_eq!(manager.metrics().recovery_success_rate, 1.0);

        {
            let mut state = manager.state.write().unwrap();
            for success in [true, true, false, true] {
                let mut result = RecoveryResult::unresolved();
                result.success = success;
                state.push_recovery_history(result, 1000);
            }
        }

        assert_eq!(manager.metrics().recovery_success_rate, 0.75);
    }

    #[tokio::test]
    async fn test_protect_passes_success_through() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        let outcome: std::result::Result<Option<i32>, TestFault> = manager
            .protect(FaultOrigin::new("widget", "spin"), async { Ok(42) })
            .await;

        assert_eq!(outcome.unwrap(), Some(42));
        assert_eq!(manager.metrics().counters.errors_handled, 0);
    }

    #[tokio::test]
    async fn test_protect_absorbs_recovered_failures() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        let outcome: std::result::Result<Option<i32>, TestFault> = manager
            .protect(FaultOrigin::new("widget", "spin"), async {
                Err(TestFault("minor hiccup"))
            })
            .await;

        assert_eq!(outcome.unwrap(), None);
        assert_eq!(manager.metrics().counters.errors_handled, 1);
    }

    #[test]
    fn test_reraise_only_on_failed_escalation() {
        let mut absorbed = RecoveryResult::unresolved();
        absorbed.success = true;
        absorbed.escalation_needed = true;
        assert!(!should_reraise(&absorbed));

        let mut failed_quietly = RecoveryResult::unresolved();
        failed_quietly.success = false;
        failed_quietly.escalation_needed = false;
        assert!(!should_reraise(&failed_quietly));

        let mut reraise = RecoveryResult::unresolved();
        reraise.success = false;
        reraise.escalation_needed = true;
        assert!(should_reraise(&reraise));
    }

    #[tokio::test]
    async fn test_system_restart_clears_degradation() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        {
            let mut state = manager.state.write().unwrap();
            state.mark_degraded("narrative_engine");
        }

        let mut context = ErrorContext::new("TestFault", "boom", "narrative_engine", "run");
        let result = manager
            .run_strategies(&mut context, &[RecoveryStrategy::SystemRestart])
            .await;

        assert!(result.success);
        assert_eq!(result.strategy_used, Some(RecoveryStrategy::SystemRestart));

        let state = manager.state.read().unwrap();
        assert_eq!(
            state.component_status.get("narrative_engine"),
            Some(&ComponentStatus::Healthy)
        );
        assert!(!state.degraded_components.contains("narrative_engine"));
        assert_eq!(state.counters.system_restarts, 1);
    }

    #[tokio::test]
    async fn test_health_views_reflect_degradation() {
        let manager = ErrorRecoveryManager::with_config(quick_config());

        assert_eq!(manager.system_health_status().overall_status, "healthy");

        manager
            .handle_error_with(
                &TestFault("session state lost"),
                FaultOrigin::new("session_store", "load_session").session("sess-1"),
            )
            .await;

        let health = manager.system_health_status();
        assert_eq!(health.overall_status, "degraded");
        assert_eq!(health.degraded_components, vec!["session_store".to_string()]);
        assert_eq!(health.recent_errors, 1);

        let report = manager.health_check();
        assert_eq!(report.recovery_strategies_loaded, STRATEGY_COUNT);
        assert_eq!(report.therapeutic_interventions_loaded, SCENARIO_COUNT);
        assert!(report.fallback_mechanisms_loaded >= 6);
    }

    #[tokio::test]
    async fn test_events_published_for_each_handled_fault() {
        let manager = ErrorRecoveryManager::with_config(quick_config());
        let mut events = manager.subscribe();

        manager
            .handle_error(&TestFault("connection refused by redis"), "session_cache", "get")
            .await;

        let event = events.recv().await.unwrap();
        assert_eq!(event.component, "session_cache");
        assert_eq!(event.category, crate::types::ErrorCategory::Session);
    }
}
