//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MAX_REASONABLE_TTL_SECS: u64 = 24 * 60 * 60;
const MAX_REASONABLE_SETTLE_MS: u64 = 10_000;
const MAX_REASONABLE_PARALLELISM: usize = 32;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a [`ConfigError`], if any.
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors.into_iter().next().map(|e| ConfigError::InvalidValue {
            field: e.path,
            message: e.message,
        })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_store(config, &mut result);
        Self::validate_executor(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        if config.store.path.trim().is_empty() {
            result.add_error(ValidationError::new("store.path", "Store path cannot be empty"));
        }

        if config.store.cache_ttl_secs == 0 {
            result.add_error(ValidationError::new(
                "store.cache_ttl_secs",
                "cache_ttl_secs must be greater than 0",
            ));
        } else if config.store.cache_ttl_secs > MAX_REASONABLE_TTL_SECS {
            result.add_warning(ValidationWarning::new(
                "store.cache_ttl_secs",
                "cache_ttl_secs is above 24h, cached pages may be badly out of date",
            ));
        }
    }

    fn validate_executor(config: &Config, result: &mut ValidationResult) {
        let executor = &config.executor;

        if executor.max_parallel_tasks == 0 {
            result.add_error(ValidationError::new(
                "executor.max_parallel_tasks",
                "max_parallel_tasks must be greater than 0",
            ));
        } else if executor.max_parallel_tasks > MAX_REASONABLE_PARALLELISM {
            result.add_warning(ValidationWarning::new(
                "executor.max_parallel_tasks",
                format!(
                    "max_parallel_tasks is very high (>{}), each task holds a browser context",
                    MAX_REASONABLE_PARALLELISM
                ),
            ));
        }

        if executor.settle_delay_ms > MAX_REASONABLE_SETTLE_MS {
            result.add_warning(ValidationWarning::new(
                "executor.settle_delay_ms",
                "settle_delay_ms is above 10s, every action will be slow",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
