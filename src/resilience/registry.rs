//! Named collection of circuit breakers.
//!
//! # Responsibilities
//! - Own the name → breaker mapping
//! - Dispatch protected calls by dependency name
//! - Aggregate metrics and health across all breakers
//!
//! # Design Decisions
//! - Constructed once at the composition root and shared by reference (or `Arc`)
//! - `create` replaces an existing breaker of the same name
//! - Lookups never hold a map shard lock across an await

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;

use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::resilience::classifier::NamedError;
use crate::resilience::error::{CircuitError, CircuitResult};
use crate::resilience::types::{CircuitMetrics, HealthStatus};

/// Registry of circuit breakers keyed by dependency name.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register a breaker under `config.name`.
    ///
    /// An existing breaker with the same name is replaced; callers still
    /// holding the old `Arc` keep using the old instance.
    pub fn create(&self, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        let name = config.name.clone();
        let breaker = Arc::new(CircuitBreaker::new(config));

        if self.breakers.insert(name.clone(), breaker.clone()).is_some() {
            tracing::warn!(breaker = %name, "circuit breaker replaced");
        } else {
            tracing::info!(
                breaker = %name,
                failure_threshold = breaker.config().failure_threshold,
                recovery_timeout_ms = breaker.config().recovery_timeout.as_millis() as u64,
                "circuit breaker registered"
            );
        }
        breaker
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.value().clone())
    }

    /// Run `operation` through the breaker registered as `name`.
    ///
    /// Fails with [`CircuitError::NotFound`] without invoking `operation`
    /// when no such breaker exists.
    pub async fn execute<T, E, F, Fut>(&self, name: &str, operation: F) -> CircuitResult<T, E>
    where
        T: Any,
        E: NamedError,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(breaker) = self.get(name) else {
            tracing::error!(breaker = %name, "circuit breaker not found");
            return Err(CircuitError::NotFound {
                name: name.to_string(),
            });
        };
        breaker.execute(operation).await
    }

    /// Metrics snapshot of every breaker, ordered by name.
    pub fn all_metrics(&self) -> BTreeMap<String, CircuitMetrics> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().metrics()))
            .collect()
    }

    /// Health of every breaker, ordered by name.
    pub fn health_status(&self) -> BTreeMap<String, HealthStatus> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().health()))
            .collect()
    }

    /// Manually reset every breaker to Closed.
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().manual_reset();
        }
        tracing::info!(count = self.breakers.len(), "All circuit breakers reset");
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn remove(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.remove(name).map(|(_, breaker)| breaker)
    }

    /// Drop every registered breaker.
    pub fn clear(&self) {
        self.breakers.clear();
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
