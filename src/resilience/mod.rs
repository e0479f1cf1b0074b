//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a protected dependency:
//!     → registry.rs (look up breaker by dependency name)
//!     → circuit_breaker.rs (admit, short-circuit or run the operation)
//!     → On failure: classifier.rs (does the error count toward tripping?)
//!     → circuit_breaker.rs (record failure, maybe trip)
//!     → original result, original error, or fallback.rs substitute
//! ```
//!
//! # Design Decisions
//! - The breaker never retries and never times out the operation; both
//!   compose outside `execute`
//! - Real operation errors are returned unchanged
//! - Open → Half-Open is evaluated lazily on the next call, no timers
//! - All resilience logic is per-dependency and composable

pub mod circuit_breaker;
pub mod classifier;
pub mod error;
pub mod fallback;
pub mod registry;
pub mod types;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use classifier::{is_qualifying, DependencyError, ErrorMatcher, NamedError};
pub use error::{CircuitError, CircuitResult};
pub use fallback::Fallback;
pub use registry::CircuitBreakerRegistry;
pub use types::{CircuitMetrics, CircuitState, HealthStatus};
