//! Errors surfaced to callers of protected operations.

use thiserror::Error;

/// Result of a call made through a breaker or the registry.
///
/// `Operation` always carries the original error value untouched.
#[derive(Debug, Error)]
pub enum CircuitError<E> {
    /// Breaker is open and no fallback is configured.
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },

    /// No breaker is registered under the requested name.
    #[error("circuit breaker not found: {name}")]
    NotFound { name: String },

    /// The protected operation ran and failed.
    #[error("{0}")]
    Operation(E),
}

impl<E> CircuitError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CircuitError::NotFound { .. })
    }

    /// The operation's own error, if the operation ran.
    pub fn into_operation(self) -> Option<E> {
        match self {
            CircuitError::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Name of the breaker that rejected the call, if any.
    pub fn breaker_name(&self) -> Option<&str> {
        match self {
            CircuitError::Open { name } | CircuitError::NotFound { name } => Some(name),
            CircuitError::Operation(_) => None,
        }
    }
}

/// Result type for protected calls.
pub type CircuitResult<T, E> = Result<T, CircuitError<E>>;
