//! Dependency catalog.
//!
//! # Data Flow
//! ```text
//! defaults.rs (built-in settings + inference fallback)
//!     + GuardConfig.catalog (overrides / additions)
//!     → bootstrap.rs (merge, validate, attach fallbacks)
//!     → CircuitBreakerRegistry (one breaker per dependency)
//! ```
//!
//! # Design Decisions
//! - Defaults are data; the host application may override any of them
//! - Only the inference service degrades to a substitute result; payments
//!   and the rest fail loudly while open

pub mod bootstrap;
pub mod defaults;

pub use bootstrap::{initialize, Bootstrap, BootstrapError};
pub use defaults::{DATA_API, GEOCODING, ML_INFERENCE, NOTIFICATIONS, PAYMENTS};
