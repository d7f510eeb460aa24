//! Shared provider state handed to every resource operation.

use crate::{Backend, ProviderError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

struct Inner {
    client: Arc<dyn Backend>,
    stop: CancellationToken,
}

/// Configured client handle and stop token, shared by all operations of
/// one provider instance.
///
/// Operations take the read lock just long enough to clone the handle out;
/// [`reset`](Self::reset) takes the write lock and replaces both the client
/// and the stop token.
pub struct ProviderMeta {
    inner: RwLock<Inner>,
}

impl ProviderMeta {
    /// Creates the shared state around a freshly built client.
    pub fn new(client: Arc<dyn Backend>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                client,
                stop: CancellationToken::new(),
            }),
        }
    }

    /// Returns the configured client.
    pub async fn client(&self) -> Arc<dyn Backend> {
        self.inner.read().await.client.clone()
    }

    /// Returns the token that fires when the provider is stopped or reset.
    pub async fn stop_token(&self) -> CancellationToken {
        self.inner.read().await.stop.clone()
    }

    /// Replaces the client and stop token. Operations still holding the old
    /// stop token observe it as cancelled.
    pub async fn reset(&self, client: Arc<dyn Backend>) {
        let mut inner = self.inner.write().await;
        inner.stop.cancel();
        inner.client = client;
        inner.stop = CancellationToken::new();
    }

    /// Cancels in-flight operations without replacing the client.
    pub async fn stop(&self) {
        self.inner.read().await.stop.cancel();
    }

    /// Runs `fut` unless `ctx` or the provider stop token fires first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Cancelled`] if cancelled, otherwise the
    /// result of `fut`.
    pub async fn run<T, F>(&self, ctx: &CancellationToken, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let stop = self.stop_token().await;
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(ProviderError::Cancelled),
            _ = stop.cancelled() => Err(ProviderError::Cancelled),
            res = fut => res,
        }
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryBackend;

    #[tokio::test]
    async fn test_client_shared() {
        let meta = ProviderMeta::new(Arc::new(MemoryBackend::new()));

        let a = meta.client().await;
        let b = meta.client().await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_reset_replaces_client_and_stop_token() {
        let meta = ProviderMeta::new(Arc::new(MemoryBackend::new()));
        let before = meta.client().await;
        let old_stop = meta.stop_token().await;

        meta.reset(Arc::new(MemoryBackend::new())).await;

        assert!(!Arc::ptr_eq(&before, &meta.client().await));
        assert!(old_stop.is_cancelled());
        assert!(!meta.stop_token().await.is_cancelled());
    }

    #[tokio::test]
    async fn test_run_completes() {
        let meta = ProviderMeta::new(Arc::new(MemoryBackend::new()));
        let ctx = CancellationToken::new();

        let value = meta.run(&ctx, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_cancelled_by_caller() {
        let meta = ProviderMeta::new(Arc::new(MemoryBackend::new()));
        let ctx = CancellationToken::new();
        ctx.cancel();

        let result: Result<()> = meta.run(&ctx, std::future::pending()).await;
        assert!(matches!(result, Err(ProviderError::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_cancelled_by_stop() {
        let meta = ProviderMeta::new(Arc::new(MemoryBackend::new()));
        meta.stop().await;

        let result: Result<()> = meta
            .run(&CancellationToken::new(), std::future::pending())
            .await;
        assert!(matches!(result, Err(ProviderError::Cancelled)));
    }
}
