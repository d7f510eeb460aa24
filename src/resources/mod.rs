//! Resource and data source handlers.
//!
//! Each resource kind is one type implementing [`Resource`]; each data
//! source kind implements [`DataSource`]. Handlers receive the caller's
//! cancellation token, the shared [`ProviderMeta`] and the resource's
//! [`ResourceData`], and issue one backend call per operation.

mod secret;
mod secret_data;

pub use secret::SecretResource;
pub use secret_data::SecretDataSource;

use crate::meta::ProviderMeta;
use crate::schema::Schema;
use crate::state::ResourceData;
use crate::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A managed resource kind.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Returns the type name (e.g., "berglas_secret").
    fn type_name(&self) -> &str;

    /// Returns the attribute schema.
    fn schema(&self) -> Schema;

    /// Creates the remote object and sets the id on `d`.
    async fn create(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()>;

    /// Refreshes `d` from the remote object identified by its id.
    async fn read(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()>;

    /// Applies changed attributes to the remote object.
    async fn update(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()>;

    /// Deletes the remote object and clears the id on `d`.
    async fn delete(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()>;

    /// Builds state for an existing remote object from an id alone.
    async fn import(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: ResourceData,
    ) -> Result<Vec<ResourceData>>;
}

/// A read-only data source kind.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns the type name (e.g., "berglas_secret").
    fn type_name(&self) -> &str;

    /// Returns the attribute schema.
    fn schema(&self) -> Schema;

    /// Looks up the remote object described by `d` and fills in the rest.
    async fn read(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()>;
}
