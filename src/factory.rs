//! Backend client construction.

use crate::credentials::TokenSource;
use crate::{Backend, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Builds a backend client from a resolved token source.
///
/// The provider calls this once when it is configured and again whenever it
/// is reset, so a reset always yields a fresh client.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Creates a new client authenticating with `tokens`.
    async fn build(&self, tokens: Arc<dyn TokenSource>) -> Result<Arc<dyn Backend>>;
}

/// Factory function type for clients that need no async setup.
pub type BackendFn = fn(Arc<dyn TokenSource>) -> Result<Arc<dyn Backend>>;

/// Adapts a plain function into a [`ClientFactory`].
///
/// # Example
///
/// ```
/// use berglas_provider::backends::memory::MemoryBackend;
/// use berglas_provider::factory::FnFactory;
/// use std::sync::Arc;
///
/// let factory = FnFactory::new(|_tokens| Ok(Arc::new(MemoryBackend::new())));
/// ```
#[derive(Clone, Copy)]
pub struct FnFactory {
    build: BackendFn,
}

impl FnFactory {
    /// Wraps `build`.
    pub fn new(build: BackendFn) -> Self {
        Self { build }
    }
}

#[async_trait]
impl ClientFactory for FnFactory {
    async fn build(&self, tokens: Arc<dyn TokenSource>) -> Result<Arc<dyn Backend>> {
        (self.build)(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticTokenSource;
    use crate::ProviderError;

    fn failing_factory(_tokens: Arc<dyn TokenSource>) -> Result<Arc<dyn Backend>> {
        Err(ProviderError::Backend("no client".to_string()))
    }

    #[tokio::test]
    async fn test_fn_factory_propagates_errors() {
        let factory = FnFactory::new(failing_factory);
        let result = factory.build(Arc::new(StaticTokenSource::new("t"))).await;

        assert!(matches!(result, Err(ProviderError::Backend(_))));
    }

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn test_fn_factory_builds_memory_backend() {
        use crate::backends::memory::MemoryBackend;

        let factory = FnFactory::new(|_tokens| Ok(Arc::new(MemoryBackend::new())));
        let backend = factory
            .build(Arc::new(StaticTokenSource::new("t")))
            .await
            .unwrap();

        assert_eq!(backend.name(), "memory");
    }
}
