//! # Fault Classification
//!
//! Keyword-driven categorization and severity assessment for incoming
//! faults, plus the therapeutic-impact pass that can force the highest
//! severity tier.
//!
//! The keyword scan reproduces the platform's established classification
//! behavior. It is isolated behind the [`Classifier`] trait so a typed
//! classifier can replace it without touching the orchestrator.

use once_cell::sync::Lazy;

use crate::types::{ErrorCategory, ErrorContext, ErrorSeverity};

/// Distress level at or above which a session is treated as in crisis.
pub const CRISIS_DISTRESS_THRESHOLD: f64 = 0.7;

/// Assigns category and severity to a fault and applies the
/// therapeutic-impact rules.
pub trait Classifier: Send + Sync {
    /// Deterministically assigns exactly one category.
    fn categorize(&self, context: &ErrorContext) -> ErrorCategory;

    /// Assigns a severity tier from the fault's text alone.
    fn assess_severity(&self, context: &ErrorContext) -> ErrorSeverity;

    /// Applies therapeutic-safety rules, mutating the context's flags and
    /// possibly forcing its severity upward.
    fn assess_therapeutic_impact(&self, context: &mut ErrorContext);
}

/// Category keyword tables, scanned in precedence order; first match wins.
static CATEGORY_KEYWORDS: Lazy<Vec<(ErrorCategory, &'static [&'static str])>> =
    Lazy::new(|| {
        vec![
            (
                ErrorCategory::Therapeutic,
                &["therapeutic", "therapy", "safety", "emotional", "wellbeing", "distress"][..],
            ),
            (
                ErrorCategory::Session,
                &["session", "state", "checkpoint", "progress"][..],
            ),
            (
                ErrorCategory::Data,
                &["data", "corrupt", "integrity", "storage", "persistence"][..],
            ),
            (
                ErrorCategory::Network,
                &["network", "connection", "redis", "neo4j", "socket", "unreachable"][..],
            ),
            (
                ErrorCategory::Validation,
                &["validation", "invalid", "schema", "malformed"][..],
            ),
            (
                ErrorCategory::Integration,
                &["integration", "orchestrat", "pipeline", "workflow"][..],
            ),
            (
                ErrorCategory::Performance,
                &["performance", "timeout", "slow", "latency", "overload"][..],
            ),
        ]
    });

/// Severity keyword tiers, scanned highest first.
static SEVERITY_KEYWORDS: Lazy<Vec<(ErrorSeverity, &'static [&'static str])>> =
    Lazy::new(|| {
        vec![
            (
                ErrorSeverity::Critical,
                &["critical", "fatal", "crash", "corrupt", "data loss", "unrecoverable"][..],
            ),
            (
                ErrorSeverity::High,
                &["severe", "failed", "failure", "unavailable", "denied"][..],
            ),
            (
                ErrorSeverity::Medium,
                &["error", "problem", "unexpected", "missing"][..],
            ),
            (
                ErrorSeverity::Low,
                &["minor", "warning", "deprecated", "retry"][..],
            ),
        ]
    });

/// Vocabulary that marks a fault as touching therapeutic safety.
static THERAPEUTIC_KEYWORDS: &[&str] = &[
    "therapeutic",
    "therapy",
    "safety",
    "emotional",
    "counseling",
    "wellbeing",
];

/// Vocabulary that marks a fault as crisis-adjacent.
static CRISIS_KEYWORDS: &[&str] = &["crisis", "emergency", "panic", "urgent help"];

/// The default keyword-matching classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    fn haystacks(context: &ErrorContext) -> (String, String) {
        (
            context.component.to_lowercase(),
            context.message.to_lowercase(),
        )
    }

    fn matches_any(component: &str, message: &str, keywords: &[&str]) -> bool {
        keywords
            .iter()
            .any(|kw| component.contains(kw) || message.contains(kw))
    }
}

impl Classifier for KeywordClassifier {
    fn categorize(&self, context: &ErrorContext) -> ErrorCategory {
        let (component, message) = Self::haystacks(context);

        for (category, keywords) in CATEGORY_KEYWORDS.iter() {
            if Self::matches_any(&component, &message, keywords) {
                return *category;
            }
        }

        ErrorCategory::System
    }

    fn assess_severity(&self, context: &ErrorContext) -> ErrorSeverity {
        let (component, message) = Self::haystacks(context);

        for (severity, keywords) in SEVERITY_KEYWORDS.iter() {
            if Self::matches_any(&component, &message, keywords) {
                return *severity;
            }
        }

        ErrorSeverity::Medium
    }

    fn assess_therapeutic_impact(&self, context: &mut ErrorContext) {
        let (component, message) = Self::haystacks(context);

        if Self::matches_any(&component, &message, THERAPEUTIC_KEYWORDS) {
            context.affects_therapeutic_safety = true;
        }

        if Self::matches_any(&component, &message, CRISIS_KEYWORDS) {
            context.affects_therapeutic_safety = true;
            context.requires_therapeutic_intervention = true;
            context.escalate_severity(ErrorSeverity::TherapeuticCritical);
        }

        // Caller-supplied context is an independent trigger and takes
        // precedence over whatever the keyword tiers concluded.
        if context_signals_crisis(context) {
            context.affects_therapeutic_safety = true;
            context.requires_therapeutic_intervention = true;
            context.escalate_severity(ErrorSeverity::TherapeuticCritical);
        }
    }
}

/// Reads the crisis signals out of the caller-supplied therapeutic context.
///
/// A value of the wrong JSON type is treated as potentially unsafe: the
/// safety flag is raised rather than silently assuming no crisis.
fn context_signals_crisis(context: &mut ErrorContext) -> bool {
    let mut crisis = false;

    if let Some(value) = context.therapeutic_context.get("in_crisis") {
        match value.as_bool() {
            Some(flag) => crisis |= flag,
            None => context.affects_therapeutic_safety = true,
        }
    }

    if let Some(value) = context.therapeutic_context.get("emotional_distress_level") {
        match value.as_f64() {
            Some(level) => crisis |= level >= CRISIS_DISTRESS_THRESHOLD,
            None => context.affects_therapeutic_safety = true,
        }
    }

    crisis
}
