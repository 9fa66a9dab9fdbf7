//! # Structured Logging
//!
//! Tracing initialization for services embedding the recovery core, plus a
//! helper that logs a fault context at a level chosen by its severity.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::types::{ErrorContext, ErrorSeverity, RecoveryError, Result};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to output logs to a file
    pub file_output: bool,
    /// The directory to store log files in
    pub log_dir: Option<String>,
    /// Whether to use JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "recovery-core".to_string(),
            file_output: false,
            log_dir: None,
            json_format: true,
        }
    }
}

/// Initializes the structured logging system. Safe to call more than once;
/// only the first call installs a subscriber.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<()> {
    if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
        return Ok(());
    }

    let config = config.unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", config.level)));

    let subscriber = Registry::default().with(filter);

    let subscriber = if config.json_format {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .boxed();
        subscriber.with(json_layer)
    } else {
        let text_layer = fmt::layer().with_target(true).with_thread_ids(true).boxed();
        subscriber.with(text_layer)
    };

    let file_layer = if config.file_output {
        if let Some(log_dir) = config.log_dir {
            let file_appender = tracing_appender::rolling::RollingFileAppender::new(
                tracing_appender::rolling::Rotation::DAILY,
                log_dir,
                format!("{}.log", config.service_name),
            );

            let (non_blocking, guard) =
                tracing_appender::non_blocking::NonBlocking::new(file_appender);

            // Keep the guard alive for the lifetime of the program so
            // buffered log lines are flushed.
            Box::leak(Box::new(guard));

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        } else {
            None
        }
    } else {
        None
    };
    let subscriber = subscriber.with(file_layer);

    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        RecoveryError::Initialization(format!("failed to set global subscriber: {e}"))
    })?;

    LOGGING_INITIALIZED.store(true, Ordering::SeqCst);

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = %config.json_format,
        "Structured logging initialized"
    );

    Ok(())
}

/// Logs a fault context at the level its severity calls for.
pub fn log_context(context: &ErrorContext) {
    use tracing::{error, info, warn};

    match context.severity() {
        ErrorSeverity::Critical | ErrorSeverity::TherapeuticCritical => {
            error!(
                error_id = %context.id,
                error_type = %context.error_type,
                category = %context.category,
                severity = %context.severity(),
                component = %context.component,
                function = %context.function,
                therapeutic_safety = %context.affects_therapeutic_safety,
                message = %context.message,
                "Critical fault reported"
            );
        }
        ErrorSeverity::High | ErrorSeverity::Medium => {
            warn!(
                error_id = %context.id,
                error_type = %context.error_type,
                category = %context.category,
                severity = %context.severity(),
                component = %context.component,
                function = %context.function,
                message = %context.message,
                "Fault reported"
            );
        }
        ErrorSeverity::Low => {
            info!(
                error_id = %context.id,
                category = %context.category,
                component = %context.component,
                message = %context.message,
                "Minor fault reported"
            );
        }
    }
}

impl TryFrom<config::Config> for LoggingConfig {
    type Error = config::ConfigError;

    fn try_from(cfg: config::Config) -> std::result::Result<Self, Self::Error> {
        // Start from defaults and selectively override from the provided config.
        let mut base = LoggingConfig::default();

        if let Ok(level) = cfg.get::<String>("logging.level") {
            base.level = level;
        }
        if let Ok(service_name) = cfg.get::<String>("logging.service_name") {
            base.service_name = service_name;
        }
        if let Ok(file_output) = cfg.get::<bool>("logging.file_output") {
            base.file_output = file_output;
        }
        if let Ok(log_dir) = cfg.get::<String>("logging.log_dir") {
            base.log_dir = Some(log_dir);
        }
        if let Ok(json_format) = cfg.get::<bool>("logging.json_format") {
            base.json_format = json_format;
        }

        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_source() {
        let source = config::Config::builder()
            .set_override("logging.level", "debug")
            .unwrap()
            .set_override("logging.json_format", false)
            .unwrap()
            .build()
            .unwrap();

        let cfg = LoggingConfig::try_from(source).unwrap();
        assert_eq!(cfg.level, "debug");
        assert!(!cfg.json_format);
        assert_eq!(cfg.service_name, "recovery-core");
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(None).unwrap();
        // Second call must be a no-op, not an error
        init_logging(None).unwrap();
    }
}
