//! Substitute results served while a breaker is open.

use std::any::{self, Any};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

type Produce = dyn Fn() -> BoxFuture<'static, Box<dyn Any + Send>> + Send + Sync;

/// A zero-argument producer of a substitute result.
///
/// Breakers are shared across call sites with different result types, so the
/// produced value is type-erased and recovered with [`Fallback::produce`].
#[derive(Clone)]
pub struct Fallback {
    produce: Arc<Produce>,
    type_name: &'static str,
}

impl Fallback {
    /// Build a fallback from an async producer.
    pub fn new<T, F, Fut>(f: F) -> Self
    where
        T: Any + Send,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            produce: Arc::new(move || f().map(|v| Box::new(v) as Box<dyn Any + Send>).boxed()),
            type_name: any::type_name::<T>(),
        }
    }

    /// Build a fallback that returns a clone of `value` every time.
    pub fn value<T>(value: T) -> Self
    where
        T: Any + Clone + Send + Sync,
    {
        Self::new(move || {
            let v = value.clone();
            async move { v }
        })
    }

    /// Name of the type this fallback produces.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Run the producer. Returns `None` if it does not produce a `T`.
    pub async fn produce<T: Any>(&self) -> Option<T> {
        let value = (self.produce)().await;
        value.downcast::<T>().ok().map(|b| *b)
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback")
            .field("type_name", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_produces_typed_value() {
        let fb = Fallback::value(serde_json::json!({ "fallback": true }));
        let v: Option<serde_json::Value> = fb.produce().await;
        assert_eq!(v, Some(serde_json::json!({ "fallback": true })));
    }

    #[tokio::test]
    async fn test_type_mismatch_yields_none() {
        let fb = Fallback::new(|| async { 7u32 });
        assert!(fb.produce::<String>().await.is_none());
        assert_eq!(fb.produce::<u32>().await, Some(7));
        assert_eq!(fb.type_name(), "u32");
    }
}
