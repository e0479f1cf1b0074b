//! Circuit breaker protection for calls to unreliable external dependencies.

pub mod catalog;
pub mod config;
pub mod observability;
pub mod resilience;

pub use catalog::Bootstrap;
pub use config::GuardConfig;
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitError, CircuitMetrics,
    CircuitState, ErrorMatcher, Fallback, NamedError,
};
