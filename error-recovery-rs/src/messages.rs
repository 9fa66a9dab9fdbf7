//! # User-Facing Messaging
//!
//! Severity-graded operational and therapeutic message composition, plus a
//! sanitizer that keeps technical detail out of anything shown to a user.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ErrorSeverity;

// Patterns for technical detail that must never reach a user.
static TECHNICAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Absolute file paths
        Regex::new(r"(/[\w.\-]+){2,}").unwrap(),
        // Connection strings and URLs
        Regex::new(r"[a-zA-Z][a-zA-Z0-9+.\-]*://\S+").unwrap(),
        // host:port pairs
        Regex::new(r"\b[\w.\-]+:\d{2,5}\b").unwrap(),
        // IP addresses
        Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap(),
        // Hex identifiers and hashes
        Regex::new(r"\b[0-9a-fA-F]{16,}\b").unwrap(),
    ]
});

/// Removes technical detail from a string destined for a user.
pub fn sanitize_user_text(text: &str) -> String {
    let mut sanitized = text.to_string();
    for pattern in TECHNICAL_PATTERNS.iter() {
        sanitized = pattern.replace_all(&sanitized, "[detail removed]").into_owned();
    }
    sanitized
}

/// Operational message for a fault of the given severity.
pub fn user_message(severity: ErrorSeverity) -> String {
    match severity {
        ErrorSeverity::Low => {
            "A minor hiccup occurred and was smoothed over automatically.".to_string()
        }
        ErrorSeverity::Medium => {
            "Something needed a quick adjustment. You can keep going as normal."
                .to_string()
        }
        ErrorSeverity::High => {
            "We ran into a problem and are working around it. Some things may \
             behave differently for a short while."
                .to_string()
        }
        ErrorSeverity::Critical | ErrorSeverity::TherapeuticCritical => {
            "We hit a significant problem. Our team has been notified and is \
             on it; your progress is safe."
                .to_string()
        }
    }
}

/// Supportive therapeutic-tone message for the same severity.
pub fn therapeutic_message(severity: ErrorSeverity) -> String {
    match severity {
        ErrorSeverity::Low | ErrorSeverity::Medium => {
            "Everything is okay. Take your time, and continue whenever you're \
             ready."
                .to_string()
        }
        ErrorSeverity::High => {
            "Thanks for your patience while we sort this out. Your space here \
             remains steady and safe."
                .to_string()
        }
        ErrorSeverity::Critical | ErrorSeverity::TherapeuticCritical => {
            "We're here with you. Take a slow breath; nothing you've shared or \
             built has been lost, and support is on the way."
                .to_string()
        }
    }
}

/// Whether a fault of this severity needs the user to act before continuing.
pub fn requires_user_action(severity: ErrorSeverity) -> bool {
    severity >= ErrorSeverity::High
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_paths_and_endpoints() {
        let raw = "failed reading /var/lib/sessions/abc.json from redis://cache:6379";
        let clean = sanitize_user_text(raw);

        assert!(!clean.contains("/var/lib"));
        assert!(!clean.contains("redis://"));
        assert!(!clean.contains("6379"));
        assert!(clean.contains("[detail removed]"));
    }

    #[test]
    fn test_sanitize_leaves_plain_text_alone() {
        let raw = "the story paused for a moment";
        assert_eq!(sanitize_user_text(raw), raw);
    }

    #[test]
    fn test_messages_scale_with_severity() {
        assert!(user_message(ErrorSeverity::Critical).contains("team has been notified"));
        assert!(user_message(ErrorSeverity::Low).contains("minor"));

        // Therapeutic copy is always present, whatever the tier
        for severity in [
            ErrorSeverity::Low,
            ErrorSeverity::Medium,
            ErrorSeverity::High,
            ErrorSeverity::Critical,
            ErrorSeverity::TherapeuticCritical,
        ] {
            assert!(!therapeutic_message(severity).is_empty());
        }
    }

    #[test]
    fn test_user_action_only_for_high_and_up() {
        assert!(!requires_user_action(ErrorSeverity::Low));
        assert!(!requires_user_action(ErrorSeverity::Medium));
        assert!(requires_user_action(ErrorSeverity::High));
        assert!(requires_user_action(ErrorSeverity::Critical));
        assert!(requires_user_action(ErrorSeverity::TherapeuticCritical));
    }
}
