//! # Recovery Configuration
//!
//! Tunables for the recovery orchestrator, with defaults that match the
//! platform's production settings and selective override from a
//! `config::Config` source.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the recovery orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Attempt ceiling applied to each fault
    pub max_recovery_attempts: u32,
    /// How long backups are retained, in days
    pub backup_retention_days: i64,
    /// Base pause for the retry strategy
    pub retry_pause: Duration,
    /// Jitter factor (0.0 - 1.0) applied to the retry pause
    pub retry_jitter: f64,
    /// Simulated restart pause for the system-restart strategy
    pub restart_pause: Duration,
    /// Broadcast capacity of the event bus
    pub event_capacity: usize,
    /// Cap on retained error/recovery history entries
    pub history_limit: usize,
    /// Window used for the "recent errors" health figure
    pub recent_error_window: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_recovery_attempts: 3,
            backup_retention_days: 30,
            retry_pause: Duration::from_millis(100),
            retry_jitter: 0.1,
            restart_pause: Duration::from_millis(500),
            event_capacity: 256,
            history_limit: 1000,
            recent_error_window: Duration::from_secs(3600),
        }
    }
}

impl TryFrom<config::Config> for RecoveryConfig {
    type Error = config::ConfigError;

    fn try_from(cfg: config::Config) -> std::result::Result<Self, Self::Error> {
        // Start from defaults and selectively override from the provided config.
        let mut base = RecoveryConfig::default();

        if let Ok(max_attempts) = cfg.get::<u32>("recovery.max_recovery_attempts") {
            base.max_recovery_attempts = max_attempts;
        }
        if let Ok(retention) = cfg.get::<i64>("recovery.backup_retention_days") {
            base.backup_retention_days = retention;
        }
        if let Ok(pause_ms) = cfg.get::<u64>("recovery.retry_pause_ms") {
            base.retry_pause = Duration::from_millis(pause_ms);
        }
        if let Ok(jitter) = cfg.get::<f64>("recovery.retry_jitter") {
            base.retry_jitter = jitter;
        }
        if let Ok(pause_ms) = cfg.get::<u64>("recovery.restart_pause_ms") {
            base.restart_pause = Duration::from_millis(pause_ms);
        }
        if let Ok(capacity) = cfg.get::<usize>("recovery.event_capacity") {
            base.event_capacity = capacity;
        }
        if let Ok(limit) = cfg.get::<usize>("recovery.history_limit") {
            base.history_limit = limit;
        }
        if let Ok(window_secs) = cfg.get::<u64>("recovery.recent_error_window_secs") {
            base.recent_error_window = Duration::from_secs(window_secs);
        }

        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RecoveryConfig::default();
        assert_eq!(cfg.max_recovery_attempts, 3);
        assert_eq!(cfg.backup_retention_days, 30);
        assert_eq!(cfg.history_limit, 1000);
    }

    #[test]
    fn test_try_from_overrides_selectively() {
        let source = config::Config::builder()
            .set_override("recovery.max_recovery_attempts", 5)
            .unwrap()
            .set_override("recovery.retry_pause_ms", 250u64)
            .unwrap()
            .build()
            .unwrap();

        let cfg = RecoveryConfig::try_from(source).unwrap();
        assert_eq!(cfg.max_recovery_attempts, 5);
        assert_eq!(cfg.retry_pause, Duration::from_millis(250));
        // Untouched keys keep their defaults
        assert_eq!(cfg.backup_retention_days, 30);
    }
}
