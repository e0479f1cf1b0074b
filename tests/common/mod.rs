//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use circuit_guard::resilience::DependencyError;

/// A fake dependency that counts invocations and fails on demand.
#[derive(Clone, Default)]
pub struct FakeDependency {
    calls: Arc<AtomicU32>,
    failing: Arc<AtomicBool>,
    error: Arc<std::sync::Mutex<Option<DependencyError>>>,
}

#[allow(dead_code)]
impl FakeDependency {
    /// A dependency that fails every call with `error`.
    pub fn failing_with(error: DependencyError) -> Self {
        let dep = Self::default();
        dep.fail_with(error);
        dep
    }

    pub fn fail_with(&self, error: DependencyError) {
        *self.error.lock().unwrap() = Some(error);
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The protected operation.
    pub async fn call(&self) -> Result<&'static str, DependencyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            let err = self.error.lock().unwrap().clone();
            Err(err.unwrap_or_else(|| DependencyError::network("unreachable")))
        } else {
            Ok("ok")
        }
    }
}
