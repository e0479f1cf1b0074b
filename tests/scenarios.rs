//! End-to-end breaker behaviour through the public API.

use std::time::Duration;

use circuit_guard::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitError, CircuitState,
    DependencyError, Fallback,
};
use serde_json::json;

mod common;
use common::FakeDependency;

fn network_breaker(name: &str) -> CircuitBreakerConfig {
    CircuitBreakerConfig::new(name)
        .failure_threshold(3)
        .recovery_timeout(Duration::from_millis(1000))
        .expected_errors(["NetworkError"])
}

#[tokio::test(start_paused = true)]
async fn test_trip_short_circuit_and_recover() {
    let cb = CircuitBreaker::new(network_breaker("data_api"));
    let dep = FakeDependency::failing_with(DependencyError::network("connection reset"));

    for i in 1..=3 {
        let err = cb.execute(|| dep.call()).await.unwrap_err();
        assert!(matches!(err, CircuitError::Operation(_)), "call {} should surface the real error", i);
    }
    assert_eq!(cb.state(), CircuitState::Open);
    assert_eq!(dep.calls(), 3);

    // 4th call never reaches the dependency.
    let err = cb.execute(|| dep.call()).await.unwrap_err();
    assert!(err.is_open());
    assert_eq!(err.breaker_name(), Some("data_api"));
    assert_eq!(dep.calls(), 3);

    tokio::time::advance(Duration::from_millis(1001)).await;
    dep.recover();

    assert_eq!(cb.execute(|| dep.call()).await.unwrap(), "ok");
    assert_eq!(dep.calls(), 4);
    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.qualifying_failures(), 0);

    let m = cb.metrics();
    assert_eq!(m.total_requests, 4);
    assert_eq!(m.successful_requests, 1);
    assert_eq!(m.failed_requests, 3);
    assert_eq!(m.circuit_open_count, 1);
    assert_eq!(m.current_state, CircuitState::Closed);
}

#[tokio::test]
async fn test_fallback_replaces_operation_while_open() {
    let cb = CircuitBreaker::new(
        network_breaker("ml_inference").with_fallback(Fallback::value(json!({ "fallback": true }))),
    );

    let calls = std::sync::atomic::AtomicU32::new(0);
    let op = || async {
        calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err::<serde_json::Value, _>(DependencyError::network("inference service down"))
    };

    for _ in 0..3 {
        cb.execute(op).await.unwrap_err();
    }
    assert_eq!(cb.state(), CircuitState::Open);

    for _ in 0..5 {
        assert_eq!(cb.execute(op).await.unwrap(), json!({ "fallback": true }));
    }
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    assert_eq!(cb.metrics().fallback_count, 5);
}

#[tokio::test]
async fn test_breakers_are_independent() {
    let registry = CircuitBreakerRegistry::new();
    registry.create(network_breaker("payments"));
    registry.create(network_breaker("geocoding"));

    let payments = FakeDependency::failing_with(DependencyError::network("stripe unreachable"));
    let geocoding = FakeDependency::default();

    for _ in 0..3 {
        registry.execute("payments", || payments.call()).await.unwrap_err();
        registry.execute("geocoding", || geocoding.call()).await.unwrap();
    }

    let health = registry.health_status();
    assert_eq!(health["payments"].state, CircuitState::Open);
    assert!(!health["payments"].healthy);
    assert_eq!(health["geocoding"].state, CircuitState::Closed);
    assert!(health["geocoding"].healthy);

    registry.reset_all();
    for status in registry.health_status().values() {
        assert_eq!(status.state, CircuitState::Closed);
    }

    // History survives the reset.
    assert_eq!(registry.all_metrics()["payments"].failed_requests, 3);
}

#[tokio::test]
async fn test_validation_errors_never_trip() {
    let cb = CircuitBreaker::new(network_breaker("data_api"));
    let dep = FakeDependency::failing_with(DependencyError::validation("email is required"));

    for _ in 0..50 {
        let err = cb.execute(|| dep.call()).await.unwrap_err();
        assert_eq!(
            err.into_operation(),
            Some(DependencyError::validation("email is required"))
        );
    }

    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.qualifying_failures(), 0);
    assert_eq!(dep.calls(), 50);
}

#[tokio::test]
async fn test_empty_expected_errors_counts_everything() {
    let cb = CircuitBreaker::new(CircuitBreakerConfig::new("notifications").failure_threshold(2));
    let dep = FakeDependency::failing_with(DependencyError::validation("bad token"));

    cb.execute(|| dep.call()).await.unwrap_err();
    cb.execute(|| dep.call()).await.unwrap_err();
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_is_a_new_trip() {
    let cb = CircuitBreaker::new(network_breaker("payments"));
    let dep = FakeDependency::failing_with(DependencyError::network("reset"));

    for _ in 0..3 {
        cb.execute(|| dep.call()).await.unwrap_err();
    }
    tokio::time::advance(Duration::from_millis(1000)).await;

    let err = cb.execute(|| dep.call()).await.unwrap_err();
    assert!(matches!(err, CircuitError::Operation(_)));
    assert_eq!(dep.calls(), 4);
    assert_eq!(cb.state(), CircuitState::Open);
    assert_eq!(cb.metrics().circuit_open_count, 2);
}

#[tokio::test]
async fn test_unknown_breaker_never_runs_operation() {
    let registry = CircuitBreakerRegistry::new();
    let dep = FakeDependency::default();

    let err = registry.execute("nope", || dep.call()).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(dep.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_trip_once() {
    let registry = std::sync::Arc::new(CircuitBreakerRegistry::new());
    registry.create(
        CircuitBreakerConfig::new("data_api")
            .failure_threshold(5)
            .recovery_timeout(Duration::from_secs(60)),
    );
    let dep = FakeDependency::failing_with(DependencyError::network("down"));

    let mut handles = Vec::new();
    for _ in 0..64 {
        let registry = registry.clone();
        let dep = dep.clone();
        handles.push(tokio::spawn(async move {
            let _ = registry.execute("data_api", || dep.call()).await;
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let m = registry.all_metrics()["data_api"].clone();
    assert_eq!(m.current_state, CircuitState::Open);
    assert_eq!(m.circuit_open_count, 1);
    assert_eq!(m.total_requests + m.rejected_requests, 64);
    assert_eq!(m.total_requests as u32, dep.calls());
}
