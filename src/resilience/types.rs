//! Shared breaker types: state, metrics snapshot, health summary.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through; qualifying failures are counted.
    #[default]
    Closed,
    /// Calls are short-circuited without reaching the dependency.
    Open,
    /// A single trial call is allowed through to test recovery.
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used for the state gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        };
        f.write_str(s)
    }
}

/// Point-in-time copy of a breaker's counters.
///
/// Counters are cumulative for the lifetime of the breaker; a manual reset
/// changes state but keeps history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CircuitMetrics {
    /// Calls whose operation actually ran.
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Calls short-circuited while open (fallback or rejection).
    pub rejected_requests: u64,
    /// Short-circuited calls answered by the fallback.
    pub fallback_count: u64,
    /// Number of trips into OPEN.
    pub circuit_open_count: u64,
    pub last_failure_time: Option<SystemTime>,
    /// Running mean over every completed call, success or failure.
    #[serde(with = "duration_millis")]
    pub average_response_time: Duration,
    pub current_state: CircuitState,
}

impl CircuitMetrics {
    /// Fraction of completed calls that failed, `0.0` without traffic.
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.failed_requests as f64 / self.total_requests as f64
        }
    }

    /// Fold one completed call into the counters and the running average.
    pub(crate) fn record_completion(&mut self, elapsed: Duration, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
            self.last_failure_time = Some(SystemTime::now());
        }

        let n = self.total_requests as f64;
        let avg = self.average_response_time.as_secs_f64();
        let next = avg + (elapsed.as_secs_f64() - avg) / n;
        self.average_response_time = Duration::from_secs_f64(next.max(0.0));
    }
}

/// Health summary for one breaker, as reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub state: CircuitState,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(millis.max(0.0) / 1000.0))
    }
}
