//! Backend trait for the secret-management client.
//!
//! The provider never encrypts, stores or authorizes anything itself. Every
//! resource operation maps to exactly one call on a [`Backend`], which owns
//! envelope encryption with Cloud KMS and object storage in Cloud Storage.

use crate::secret::{CreateRequest, DeleteRequest, ReadRequest, Secret, UpdateRequest};
use crate::Result;
use async_trait::async_trait;

/// Backend represents a Berglas-compatible secret store.
///
/// Implementations must be `Send + Sync`: a single handle is shared by every
/// resource operation running against a configured provider.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the backend name (e.g., "memory").
    fn name(&self) -> &str;

    /// Encrypts and stores a new secret.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::PreconditionFailed`](crate::ProviderError::PreconditionFailed):
    ///   the object already exists
    async fn create(&self, req: CreateRequest) -> Result<Secret>;

    /// Reads and decrypts a secret.
    ///
    /// A `generation` of `0` reads the latest generation.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::NotFound`](crate::ProviderError::NotFound):
    ///   the object or generation does not exist
    async fn read(&self, req: ReadRequest) -> Result<Secret>;

    /// Writes new contents, producing a new generation.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::NotFound`](crate::ProviderError::NotFound):
    ///   the object does not exist
    /// - [`ProviderError::PreconditionFailed`](crate::ProviderError::PreconditionFailed):
    ///   `generation` or `metageneration` is set and does not match
    async fn update(&self, req: UpdateRequest) -> Result<Secret>;

    /// Deletes a secret and all of its generations.
    ///
    /// Deleting a secret that does not exist is not an error.
    async fn delete(&self, req: DeleteRequest) -> Result<()>;
}
