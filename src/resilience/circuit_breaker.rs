//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast (or get the fallback)
//! - Half-Open: one trial call tests whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: qualifying failures >= threshold within monitoring window
//! Open → Half-Open: first call after recovery timeout (lazy, no timer)
//! Half-Open → Closed: probe call succeeds
//! Half-Open → Open: probe call fails with a qualifying error
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, never global
//! - Single probe in Half-Open (prevents hammering a recovering dependency)
//! - State lives behind one mutex that is never held across an await
//! - Completions are applied to the state current at completion time

use std::any::{self, Any};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::classifier::{is_qualifying, ErrorMatcher, NamedError};
use crate::resilience::error::{CircuitError, CircuitResult};
use crate::resilience::fallback::Fallback;
use crate::resilience::types::{CircuitMetrics, CircuitState, HealthStatus};

/// Configuration for one protected dependency.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Unique name of the protected dependency.
    pub name: String,
    /// Qualifying failures within the window needed to trip.
    pub failure_threshold: u32,
    /// How long the breaker stays open before admitting a probe.
    pub recovery_timeout: Duration,
    /// Only failures younger than this count toward the threshold.
    pub monitoring_window: Duration,
    /// Errors that count toward tripping; empty means all errors.
    pub expected_errors: Vec<ErrorMatcher>,
    /// Served instead of calling the dependency while open.
    pub fallback: Option<Fallback>,
}

impl CircuitBreakerConfig {
    /// Config with default thresholds: 5 failures, 30s recovery, 60s window.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            monitoring_window: Duration::from_secs(60),
            expected_errors: Vec::new(),
            fallback: None,
        }
    }

    /// Qualifying failures needed to trip. Values below 1 are raised to 1.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Time spent open before the next call becomes a probe.
    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Age limit for failures counted toward the threshold.
    pub fn monitoring_window(mut self, window: Duration) -> Self {
        self.monitoring_window = window;
        self
    }

    /// Errors that count toward tripping. Strings match by name or message.
    pub fn expected_errors<I, M>(mut self, matchers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ErrorMatcher>,
    {
        self.expected_errors = matchers.into_iter().map(Into::into).collect();
        self
    }

    /// Serve `fallback` instead of failing while open.
    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

/// Mutable state, only touched under the breaker's lock.
#[derive(Debug, Default)]
struct BreakerState {
    state: CircuitState,
    opened_at: Option<Instant>,
    /// Timestamps of qualifying failures, oldest first.
    failures: VecDeque<Instant>,
    /// Id of the in-flight half-open probe.
    probe: Option<u64>,
    next_probe_id: u64,
    metrics: CircuitMetrics,
}

enum Admission<'a> {
    Pass,
    Probe(ProbeGuard<'a>),
    Reject,
}

/// Holds the half-open probe slot. Dropping it without completion (the
/// caller's future was cancelled) frees the slot for the next caller.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    id: u64,
    released: bool,
}

impl ProbeGuard<'_> {
    fn release(mut self, st: &mut BreakerState) {
        if st.probe == Some(self.id) {
            st.probe = None;
        }
        self.released = true;
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut st = self.breaker.lock();
        if st.probe == Some(self.id) {
            st.probe = None;
            tracing::debug!(breaker = %self.breaker.config.name, "probe cancelled, slot released");
        }
    }
}

/// Circuit breaker guarding one dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a breaker in the Closed state. A zero threshold is treated as 1.
    pub fn new(mut config: CircuitBreakerConfig) -> Self {
        config.failure_threshold = config.failure_threshold.max(1);
        metrics::record_state(&config.name, CircuitState::Closed);
        Self {
            config,
            inner: Mutex::new(BreakerState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Run `operation` under breaker protection.
    ///
    /// While open, the operation is not invoked: the fallback result is
    /// returned if one is configured and produces a `T`, otherwise
    /// [`CircuitError::Open`]. When the operation runs and fails, its error
    /// is returned unchanged in [`CircuitError::Operation`].
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> CircuitResult<T, E>
    where
        T: Any,
        E: NamedError,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let probe = match self.admit() {
            Admission::Pass => None,
            Admission::Probe(guard) => Some(guard),
            Admission::Reject => return self.short_circuit().await,
        };

        let started = Instant::now();
        let result = operation().await;
        let elapsed = started.elapsed();

        match result {
            Ok(value) => {
                self.on_success(elapsed, probe);
                Ok(value)
            }
            Err(error) => {
                let qualifying = is_qualifying(&error, &self.config.expected_errors);
                self.on_failure(elapsed, qualifying, probe);
                Err(CircuitError::Operation(error))
            }
        }
    }

    /// Current state. Does not advance Open to Half-Open.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> CircuitMetrics {
        self.lock().metrics.clone()
    }

    /// False when open, or when more than half of all calls failed.
    pub fn is_healthy(&self) -> bool {
        self.health().healthy
    }

    /// State and health read under one lock.
    pub fn health(&self) -> HealthStatus {
        let st = self.lock();
        HealthStatus {
            healthy: st.state != CircuitState::Open && st.metrics.failure_rate() <= 0.5,
            state: st.state,
        }
    }

    /// Qualifying failures currently inside the monitoring window.
    pub fn qualifying_failures(&self) -> usize {
        let mut st = self.lock();
        self.evict_stale(&mut st, Instant::now());
        st.failures.len()
    }

    /// Force the breaker closed. Cumulative counters are kept.
    pub fn manual_reset(&self) {
        let mut st = self.lock();
        st.failures.clear();
        st.opened_at = None;
        st.probe = None;
        self.set_state(&mut st, CircuitState::Closed);
        tracing::info!(breaker = %self.config.name, "circuit breaker manually reset");
    }

    /// Force the breaker open. No-op if already open.
    pub fn trip(&self) {
        let mut st = self.lock();
        if st.state != CircuitState::Open {
            self.open(&mut st, Instant::now());
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // Counters stay meaningful even if a holder panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Admission<'_> {
        let mut st = self.lock();
        match st.state {
            CircuitState::Closed => Admission::Pass,
            CircuitState::Open => {
                let due = st
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout);
                if !due {
                    st.metrics.rejected_requests += 1;
                    return Admission::Reject;
                }
                self.set_state(&mut st, CircuitState::HalfOpen);
                tracing::info!(breaker = %self.config.name, "HALF_OPEN probe");
                Admission::Probe(self.take_probe(&mut st))
            }
            CircuitState::HalfOpen => {
                if st.probe.is_some() {
                    st.metrics.rejected_requests += 1;
                    Admission::Reject
                } else {
                    Admission::Probe(self.take_probe(&mut st))
                }
            }
        }
    }

    fn take_probe(&self, st: &mut BreakerState) -> ProbeGuard<'_> {
        let id = st.next_probe_id;
        st.next_probe_id += 1;
        st.probe = Some(id);
        ProbeGuard {
            breaker: self,
            id,
            released: false,
        }
    }

    async fn short_circuit<T: Any, E>(&self) -> CircuitResult<T, E> {
        let name = &self.config.name;

        if let Some(fallback) = &self.config.fallback {
            match fallback.produce::<T>().await {
                Some(value) => {
                    self.lock().metrics.fallback_count += 1;
                    metrics::record_rejection(name, true);
                    tracing::warn!(breaker = %name, "fallback used");
                    return Ok(value);
                }
                None => {
                    tracing::error!(
                        breaker = %name,
                        expected = any::type_name::<T>(),
                        produced = fallback.type_name(),
                        "fallback result type mismatch, rejecting call"
                    );
                }
            }
        }

        metrics::record_rejection(name, false);
        tracing::debug!(breaker = %name, "call rejected, circuit open");
        Err(CircuitError::Open { name: name.clone() })
    }

    fn on_success(&self, elapsed: Duration, probe: Option<ProbeGuard<'_>>) {
        metrics::record_call(&self.config.name, true, elapsed);

        let mut st = self.lock();
        st.metrics.record_completion(elapsed, true);
        if let Some(guard) = probe {
            guard.release(&mut st);
        }

        if st.state == CircuitState::HalfOpen {
            st.failures.clear();
            st.opened_at = None;
            st.probe = None;
            self.set_state(&mut st, CircuitState::Closed);
            tracing::info!(breaker = %self.config.name, "circuit breaker recovered");
        }
    }

    fn on_failure(&self, elapsed: Duration, qualifying: bool, probe: Option<ProbeGuard<'_>>) {
        metrics::record_call(&self.config.name, false, elapsed);

        let mut st = self.lock();
        st.metrics.record_completion(elapsed, false);
        if let Some(guard) = probe {
            guard.release(&mut st);
        }

        if !qualifying {
            tracing::debug!(breaker = %self.config.name, "non-qualifying failure ignored");
            return;
        }

        let now = Instant::now();
        self.evict_stale(&mut st, now);
        st.failures.push_back(now);
        tracing::warn!(
            breaker = %self.config.name,
            failures = st.failures.len(),
            threshold = self.config.failure_threshold,
            "recorded failure"
        );

        match st.state {
            CircuitState::HalfOpen => self.open(&mut st, now),
            CircuitState::Closed => {
                if st.failures.len() >= self.config.failure_threshold as usize {
                    self.open(&mut st, now);
                }
            }
            // Call was admitted before another caller tripped the breaker.
            CircuitState::Open => {}
        }
    }

    fn evict_stale(&self, st: &mut BreakerState, now: Instant) {
        let window = self.config.monitoring_window;
        while let Some(&oldest) = st.failures.front() {
            if now.duration_since(oldest) >= window {
                st.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn open(&self, st: &mut BreakerState, now: Instant) {
        st.opened_at = Some(now);
        st.probe = None;
        st.metrics.circuit_open_count += 1;
        self.set_state(st, CircuitState::Open);
        metrics::record_trip(&self.config.name);
        tracing::error!(
            breaker = %self.config.name,
            failures = st.failures.len(),
            open_count = st.metrics.circuit_open_count,
            "circuit breaker TRIPPED"
        );
    }

    fn set_state(&self, st: &mut BreakerState, next: CircuitState) {
        st.state = next;
        st.metrics.current_state = next;
        metrics::record_state(&self.config.name, next);
    }
}
