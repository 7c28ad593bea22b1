//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The first error, as a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationIssue>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(issue) => Err(ConfigError::InvalidValue {
                field: issue.path,
                message: issue.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
///
/// Signal names are not checked here; they are resolved against the
/// platform signal table when traps are installed.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        if config.dispatcher.thread_name.trim().is_empty() {
            result.errors.push(ValidationIssue::new(
                "dispatcher.thread_name",
                "must not be empty",
            ));
        }
        if config.dispatcher.start_poll_interval_ms == 0 {
            result.warnings.push(ValidationIssue::new(
                "dispatcher.start_poll_interval_ms",
                "0 busy-spins while waiting for the worker to start",
            ));
        }

        // A bare level is the common case; full directives are left to EnvFilter.
        let level = config.logging.level.trim().to_ascii_lowercase();
        if !level.contains(['=', ',']) && !LEVELS.contains(&level.as_str()) {
            result.errors.push(ValidationIssue::new(
                "logging.level",
                format!("unknown level '{}'", config.logging.level),
            ));
        }
        if config.logging.sink_filter.trim().is_empty() {
            result.errors.push(ValidationIssue::new(
                "logging.sink_filter",
                "must not be empty",
            ));
        }

        if config.signals.shutdown.is_empty() {
            result.warnings.push(ValidationIssue::new(
                "signals.shutdown",
                "no shutdown signal; the sidekick can only be killed",
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::validate(&Config::default());
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_empty_thread_name() {
        let mut config = Config::default();
        config.dispatcher.thread_name = "  ".to_string();
        let result = ConfigValidator::validate(&config);
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].path, "dispatcher.thread_name");
    }

    #[test]
    fn test_unknown_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        let err = ConfigValidator::validate(&config).into_result().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_filter_directive_level() {
        let mut config = Config::default();
        config.logging.level = "info,enkidu_dispatcher=debug".to_string();
        assert!(ConfigValidator::validate(&config).is_valid());
    }

    #[test]
    fn test_warnings() {
        let mut config = Config::default();
        config.dispatcher.start_poll_interval_ms = 0;
        config.signals.shutdown.clear();
        let warnings = ConfigValidator::validate(&config).into_result().unwrap();
        assert_eq!(warnings.len(), 2);
    }
}
