//! Built-in breaker settings for the marketplace's external dependencies.

use serde_json::{json, Value};

use crate::config::schema::BreakerSettings;
use crate::resilience::classifier::ErrorMatcher;
use crate::resilience::fallback::Fallback;

/// Backend data API / gateway.
pub const DATA_API: &str = "data_api";
/// Payments processor (escrow, payouts).
pub const PAYMENTS: &str = "payments";
/// Defect-detection inference service.
pub const ML_INFERENCE: &str = "ml_inference";
/// Address geocoding service.
pub const GEOCODING: &str = "geocoding";
/// Push, email and SMS notification service.
pub const NOTIFICATIONS: &str = "notifications";

/// Confidence reported by the inference fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

fn entry(
    name: &str,
    failure_threshold: u32,
    recovery_timeout_ms: u64,
    monitoring_window_ms: u64,
    expected_errors: Vec<ErrorMatcher>,
) -> BreakerSettings {
    BreakerSettings {
        name: name.to_string(),
        failure_threshold,
        recovery_timeout_ms,
        monitoring_window_ms,
        expected_errors,
    }
}

/// One entry per protected dependency.
pub fn default_breakers() -> Vec<BreakerSettings> {
    vec![
        entry(
            DATA_API,
            5,
            30_000,
            60_000,
            vec![
                ErrorMatcher::named("NetworkError"),
                ErrorMatcher::named("TimeoutError"),
                ErrorMatcher::message_contains("fetch failed"),
                ErrorMatcher::message_contains("503"),
            ],
        ),
        entry(
            PAYMENTS,
            3,
            60_000,
            300_000,
            vec![
                ErrorMatcher::named("NetworkError"),
                ErrorMatcher::named("TimeoutError"),
                ErrorMatcher::named("StripeConnectionError"),
                ErrorMatcher::named("StripeAPIError"),
            ],
        ),
        entry(
            ML_INFERENCE,
            3,
            30_000,
            120_000,
            vec![
                ErrorMatcher::named("NetworkError"),
                ErrorMatcher::named("TimeoutError"),
                ErrorMatcher::named("InferenceError"),
                ErrorMatcher::message_contains("model unavailable"),
            ],
        ),
        entry(
            GEOCODING,
            5,
            60_000,
            120_000,
            vec![
                ErrorMatcher::named("NetworkError"),
                ErrorMatcher::named("TimeoutError"),
                ErrorMatcher::message_contains("OVER_QUERY_LIMIT"),
            ],
        ),
        // Every notification failure counts; delivery is best effort.
        entry(NOTIFICATIONS, 10, 30_000, 60_000, vec![]),
    ]
}

/// Low-confidence result returned while the inference service is open.
///
/// Shaped like a segmentation response so callers can flag the job for
/// manual review instead of failing it.
pub fn inference_fallback_value() -> Value {
    json!({
        "success": false,
        "masks": [],
        "boxes": [],
        "scores": [],
        "num_instances": 0,
        "confidence": FALLBACK_CONFIDENCE,
        "fallback": true,
        "requires_manual_review": true,
    })
}

pub fn inference_fallback() -> Fallback {
    Fallback::new(|| async { inference_fallback_value() })
}
