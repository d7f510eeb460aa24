//! In-memory backend.
//!
//! This backend keeps every generation of every secret in memory and never
//! encrypts anything. It exists for tests and for exercising the provider
//! without Cloud Storage or Cloud KMS access.

use crate::secret::{CreateRequest, DeleteRequest, ReadRequest, Secret, UpdateRequest};
use crate::{Backend, ProviderError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory backend.
///
/// Generations start at `1` for each object and increase by one on every
/// write. Errors can be injected per operation to simulate backend failures.
///
/// # Example
///
/// ```
/// use berglas_provider::backends::memory::MemoryBackend;
/// use berglas_provider::secret::ReadRequest;
/// use berglas_provider::Backend;
///
/// #[tokio::main]
/// async fn main() -> berglas_provider::Result<()> {
///     let backend = MemoryBackend::new();
///     backend.set_secret("my-bucket", "api-key", "kms-key", "sk_live_abc").await;
///
///     let secret = backend
///         .read(ReadRequest {
///             bucket: "my-bucket".to_string(),
///             object: "api-key".to_string(),
///             generation: 0,
///         })
///         .await?;
///     assert_eq!(secret.generation, 1);
///     Ok(())
/// }
/// ```
pub struct MemoryBackend {
    objects: RwLock<HashMap<(String, String), Vec<Secret>>>,
    calls: RwLock<Vec<String>>,

    /// Error message to return from `create()`
    pub create_error: Option<String>,
    /// Error message to return from `read()`
    pub read_error: Option<String>,
    /// Error message to return from `update()`
    pub update_error: Option<String>,
    /// Error message to return from `delete()`
    pub delete_error: Option<String>,
}

impl MemoryBackend {
    /// Creates a new backend with empty storage.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            create_error: None,
            read_error: None,
            update_error: None,
            delete_error: None,
        }
    }

    /// Pre-populates the backend with a new generation of a secret.
    ///
    /// Useful for setting up test fixtures.
    pub async fn set_secret(
        &self,
        bucket: &str,
        object: &str,
        key: &str,
        plaintext: impl Into<Vec<u8>>,
    ) -> Secret {
        let mut objects = self.objects.write().await;
        let history = objects
            .entry((bucket.to_string(), object.to_string()))
            .or_default();
        let secret = new_generation(bucket, object, key, plaintext.into(), history.last());
        history.push(secret.clone());
        secret
    }

    /// Returns the operations invoked so far, in order (e.g. `"create b/s"`).
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    async fn record(&self, op: &str, bucket: &str, object: &str) {
        debug!(op, bucket, object, "memory backend call");
        self.calls
            .write()
            .await
            .push(format!("{op} {bucket}/{object}"));
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn new_generation(
    bucket: &str,
    object: &str,
    key: &str,
    plaintext: Vec<u8>,
    previous: Option<&Secret>,
) -> Secret {
    Secret {
        parent: bucket.to_string(),
        name: object.to_string(),
        kms_key: key.to_string(),
        plaintext,
        generation: previous.map_or(1, |p| p.generation + 1),
        metageneration: 1,
        updated_at: Some(Utc::now()),
    }
}

fn injected(err: &Option<String>) -> Result<()> {
    match err {
        Some(msg) => Err(ProviderError::Backend(msg.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self, req: CreateRequest) -> Result<Secret> {
        self.record("create", &req.bucket, &req.object).await;
        injected(&self.create_error)?;

        let mut objects = self.objects.write().await;
        let history = objects.entry((req.bucket.clone(), req.object.clone())).or_default();
        if !history.is_empty() {
            return Err(ProviderError::PreconditionFailed(format!(
                "secret {}/{} already exists",
                req.bucket, req.object
            )));
        }

        let secret = new_generation(&req.bucket, &req.object, &req.key, req.plaintext, None);
        history.push(secret.clone());
        Ok(secret)
    }

    async fn read(&self, req: ReadRequest) -> Result<Secret> {
        self.record("read", &req.bucket, &req.object).await;
        injected(&self.read_error)?;

        let objects = self.objects.read().await;
        let history = objects
            .get(&(req.bucket.clone(), req.object.clone()))
            .ok_or_else(|| ProviderError::NotFound(format!("{}/{}", req.bucket, req.object)))?;

        let found = if req.generation > 0 {
            history.iter().find(|s| s.generation == req.generation)
        } else {
            history.last()
        };

        found.cloned().ok_or_else(|| {
            ProviderError::NotFound(format!(
                "{}/{}#{}",
                req.bucket, req.object, req.generation
            ))
        })
    }

    async fn update(&self, req: UpdateRequest) -> Result<Secret> {
        self.record("update", &req.bucket, &req.object).await;
        injected(&self.update_error)?;

        let mut objects = self.objects.write().await;
        let history = objects
            .get_mut(&(req.bucket.clone(), req.object.clone()))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ProviderError::NotFound(format!("{}/{}", req.bucket, req.object)))?;

        let current = history.last().cloned().ok_or_else(|| {
            ProviderError::NotFound(format!("{}/{}", req.bucket, req.object))
        })?;

        if req.generation > 0 && req.generation != current.generation {
            return Err(ProviderError::PreconditionFailed(format!(
                "generation {} does not match current generation {}",
                req.generation, current.generation
            )));
        }
        if req.metageneration > 0 && req.metageneration != current.metageneration {
            return Err(ProviderError::PreconditionFailed(format!(
                "metageneration {} does not match current metageneration {}",
                req.metageneration, current.metageneration
            )));
        }

        let key = if req.key.is_empty() {
            current.kms_key.as_str()
        } else {
            req.key.as_str()
        };

        let secret = new_generation(&req.bucket, &req.object, key, req.plaintext, Some(&current));
        history.push(secret.clone());
        Ok(secret)
    }

    async fn delete(&self, req: DeleteRequest) -> Result<()> {
        self.record("delete", &req.bucket, &req.object).await;
        injected(&self.delete_error)?;

        let mut objects = self.objects.write().await;
        objects.remove(&(req.bucket, req.object));
        Ok(())
    }
}
