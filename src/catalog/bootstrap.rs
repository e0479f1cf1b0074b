//! Startup registration of the dependency catalog.
//!
//! # Responsibilities
//! - Merge built-in defaults with configured entries
//! - Attach fallbacks by dependency name
//! - Register one breaker per dependency in the given registry
//!
//! # Design Decisions
//! - The registry is passed in, never a process global
//! - Any invalid entry aborts startup before anything is registered

use std::collections::BTreeMap;

use thiserror::Error;

use crate::catalog::defaults;
use crate::config::schema::{BreakerSettings, CatalogConfig};
use crate::config::validation::{validate_breakers, ValidationError};
use crate::resilience::circuit_breaker::CircuitBreakerConfig;
use crate::resilience::fallback::Fallback;
use crate::resilience::registry::CircuitBreakerRegistry;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid breaker catalog: {0:?}")]
    Invalid(Vec<ValidationError>),

    #[error("fallback registered for unknown dependency '{0}'")]
    UnknownFallback(String),
}

/// Builds the breaker set for a process.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    catalog: CatalogConfig,
    /// Host-supplied fallbacks; each must name a catalog entry.
    fallbacks: BTreeMap<String, Fallback>,
    /// Attach the built-in inference fallback when `ml_inference` is present.
    inference_fallback: bool,
}

impl Bootstrap {
    /// Start from `catalog`. The built-in inference fallback is attached to
    /// `ml_inference` whenever the merged catalog contains it.
    pub fn new(catalog: CatalogConfig) -> Self {
        Self {
            catalog,
            fallbacks: BTreeMap::new(),
            inference_fallback: true,
        }
    }

    /// Attach (or replace) the fallback for `name`.
    pub fn with_fallback(mut self, name: impl Into<String>, fallback: Fallback) -> Self {
        self.fallbacks.insert(name.into(), fallback);
        self
    }

    /// Detach the fallback for `name`, built-in or host-supplied.
    pub fn without_fallback(mut self, name: &str) -> Self {
        self.fallbacks.remove(name);
        if name == defaults::ML_INFERENCE {
            self.inference_fallback = false;
        }
        self
    }

    fn fallback_for(&self, name: &str) -> Option<Fallback> {
        match self.fallbacks.get(name) {
            Some(fallback) => Some(fallback.clone()),
            None if self.inference_fallback && name == defaults::ML_INFERENCE => {
                Some(defaults::inference_fallback())
            }
            None => None,
        }
    }

    /// Defaults (if enabled) with configured entries applied by name.
    pub fn settings(&self) -> Vec<BreakerSettings> {
        let mut merged = if self.catalog.include_defaults {
            defaults::default_breakers()
        } else {
            Vec::new()
        };

        for entry in &self.catalog.breakers {
            match merged.iter_mut().find(|b| b.name == entry.name) {
                Some(existing) => *existing = entry.clone(),
                None => merged.push(entry.clone()),
            }
        }
        merged
    }

    /// Resolved breaker configs, fallbacks attached.
    pub fn configs(&self) -> Result<Vec<CircuitBreakerConfig>, BootstrapError> {
        let settings = self.settings();

        let errors = validate_breakers(&settings);
        if !errors.is_empty() {
            return Err(BootstrapError::Invalid(errors));
        }
        if let Some(name) = self
            .fallbacks
            .keys()
            .find(|name| !settings.iter().any(|s| &s.name == *name))
        {
            return Err(BootstrapError::UnknownFallback(name.clone()));
        }

        Ok(settings
            .into_iter()
            .map(|s| {
                let mut config = CircuitBreakerConfig::new(s.name.clone())
                    .failure_threshold(s.failure_threshold)
                    .recovery_timeout(s.recovery_timeout())
                    .monitoring_window(s.monitoring_window())
                    .expected_errors(s.expected_errors);
                config.fallback = self.fallback_for(&s.name);
                config
            })
            .collect())
    }

    /// Register every configured breaker. Returns how many were registered.
    pub fn initialize(&self, registry: &CircuitBreakerRegistry) -> Result<usize, BootstrapError> {
        let configs = self.configs()?;
        let count = configs.len();
        for config in configs {
            registry.create(config);
        }
        tracing::info!(count, "circuit breakers initialized successfully");
        Ok(count)
    }
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

/// Register the built-in catalog into `registry`.
pub fn initialize(registry: &CircuitBreakerRegistry) -> Result<usize, BootstrapError> {
    Bootstrap::default().initialize(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::resilience::classifier::DependencyError;
    use crate::resilience::types::CircuitState;

    fn custom(name: &str, threshold: u32) -> BreakerSettings {
        BreakerSettings {
            name: name.to_string(),
            failure_threshold: threshold,
            recovery_timeout_ms: 1_000,
            monitoring_window_ms: 10_000,
            expected_errors: vec![],
        }
    }

    #[test]
    fn test_initialize_registers_all_defaults() {
        let registry = CircuitBreakerRegistry::new();
        assert_eq!(initialize(&registry).unwrap(), 5);
        assert_eq!(
            registry.names(),
            vec!["data_api", "geocoding", "ml_inference", "notifications", "payments"]
        );

        let ml = registry.get(defaults::ML_INFERENCE).unwrap();
        assert!(ml.config().fallback.is_some());
        assert!(registry.get(defaults::PAYMENTS).unwrap().config().fallback.is_none());
    }

    #[test]
    fn test_configured_entries_override_and_extend() {
        let catalog = CatalogConfig {
            include_defaults: true,
            breakers: vec![custom(defaults::PAYMENTS, 9), custom("search", 2)],
        };
        let settings = Bootstrap::new(catalog).settings();

        assert_eq!(settings.len(), 6);
        let payments = settings.iter().find(|s| s.name == defaults::PAYMENTS).unwrap();
        assert_eq!(payments.failure_threshold, 9);
        assert!(settings.iter().any(|s| s.name == "search"));
    }

    #[test]
    fn test_without_defaults() {
        let catalog = CatalogConfig {
            include_defaults: false,
            breakers: vec![custom("search", 2)],
        };
        let registry = CircuitBreakerRegistry::new();
        let count = Bootstrap::new(catalog).initialize(&registry).unwrap();
        assert_eq!(count, 1);
        assert_eq!(registry.names(), vec!["search"]);
        assert!(registry.get("search").unwrap().config().fallback.is_none());
    }

    #[test]
    fn test_file_only_catalog_resolves() {
        let config = parse_config(
            "[catalog]\ninclude_defaults = false\n[[catalog.breakers]]\nname = \"search\"\n",
        )
        .unwrap();

        let configs = Bootstrap::new(config.catalog).configs().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "search");
        assert!(configs[0].fallback.is_none());
    }

    #[test]
    fn test_configured_ml_entry_keeps_inference_fallback() {
        let catalog = CatalogConfig {
            include_defaults: false,
            breakers: vec![custom(defaults::ML_INFERENCE, 2)],
        };
        let configs = Bootstrap::new(catalog.clone()).configs().unwrap();
        assert!(configs[0].fallback.is_some());

        let configs = Bootstrap::new(catalog)
            .without_fallback(defaults::ML_INFERENCE)
            .configs()
            .unwrap();
        assert!(configs[0].fallback.is_none());
    }

    #[test]
    fn test_unknown_fallback_rejected() {
        let catalog = CatalogConfig {
            include_defaults: false,
            breakers: vec![custom("search", 2)],
        };
        let registry = CircuitBreakerRegistry::new();
        let err = Bootstrap::new(catalog)
            .with_fallback("billing", Fallback::value(0u32))
            .initialize(&registry)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::UnknownFallback(name) if name == "billing"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_entry_aborts() {
        let catalog = CatalogConfig {
            include_defaults: true,
            breakers: vec![custom("search", 0)],
        };
        let registry = CircuitBreakerRegistry::new();
        let err = Bootstrap::new(catalog).initialize(&registry).unwrap_err();
        assert!(matches!(err, BootstrapError::Invalid(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_ml_fallback_served_when_open() {
        let registry = CircuitBreakerRegistry::new();
        initialize(&registry).unwrap();
        registry.get(defaults::ML_INFERENCE).unwrap().trip();

        let value = registry
            .execute(defaults::ML_INFERENCE, || async {
                Ok::<serde_json::Value, DependencyError>(serde_json::json!({ "success": true }))
            })
            .await
            .unwrap();
        assert_eq!(value, defaults::inference_fallback_value());
        assert_eq!(
            registry.get(defaults::ML_INFERENCE).unwrap().state(),
            CircuitState::Open
        );
    }
}
