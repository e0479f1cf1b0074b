//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds and durations > 0)
//! - Detect duplicate dependency names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BreakerSettings, GuardConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("breaker name must not be empty")]
    EmptyName,

    #[error("duplicate breaker name '{0}'")]
    DuplicateName(String),

    #[error("breaker '{0}': failure_threshold must be greater than 0")]
    ZeroThreshold(String),

    #[error("breaker '{0}': recovery_timeout_ms must be greater than 0")]
    ZeroRecoveryTimeout(String),

    #[error("breaker '{0}': monitoring_window_ms must be greater than 0")]
    ZeroMonitoringWindow(String),

    #[error("breaker '{0}': expected_errors entries must not be empty")]
    EmptyMatcher(String),

    #[error("invalid metrics_address '{0}'")]
    MetricsAddress(String),

    #[error("unknown log_level '{0}'")]
    LogLevel(String),
}

/// Validate a full configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }

    errors.extend(validate_breakers(&config.catalog.breakers));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a list of breaker entries, including name uniqueness.
pub fn validate_breakers(breakers: &[BreakerSettings]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for b in breakers {
        if b.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName);
        } else if !seen.insert(b.name.as_str()) {
            errors.push(ValidationError::DuplicateName(b.name.clone()));
        }
        if b.failure_threshold == 0 {
            errors.push(ValidationError::ZeroThreshold(b.name.clone()));
        }
        if b.recovery_timeout_ms == 0 {
            errors.push(ValidationError::ZeroRecoveryTimeout(b.name.clone()));
        }
        if b.monitoring_window_ms == 0 {
            errors.push(ValidationError::ZeroMonitoringWindow(b.name.clone()));
        }
        if b.expected_errors.iter().any(|m| m.text().trim().is_empty()) {
            errors.push(ValidationError::EmptyMatcher(b.name.clone()));
        }
    }

    errors
}
