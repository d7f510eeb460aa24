//! `berglas_secret` resource.

use super::Resource;
use crate::error::ResultExt;
use crate::id;
use crate::meta::ProviderMeta;
use crate::schema::{Attribute, Schema};
use crate::secret::{CreateRequest, DeleteRequest, ReadRequest, UpdateRequest};
use crate::state::ResourceData;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Manages one secret object.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretResource;

impl SecretResource {
    /// Creates the handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resource for SecretResource {
    fn type_name(&self) -> &str {
        "berglas_secret"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("Manages a Berglas secret.")
            .with_attribute(
                "bucket",
                Attribute::required_string()
                    .with_description("Name of the Cloud Storage bucket for the secret")
                    .force_new(),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of the secret object in the bucket")
                    .force_new(),
            )
            .with_attribute(
                "key",
                Attribute::required_string()
                    .with_description("Fully-qualified name of the Cloud KMS key")
                    .force_new(),
            )
            .with_attribute(
                "plaintext",
                Attribute::required_string()
                    .with_description("Plaintext contents")
                    .sensitive(),
            )
            .with_attribute(
                "generation",
                Attribute::computed_int().with_description("Generation of the object"),
            )
            .with_attribute(
                "metageneration",
                Attribute::computed_int().with_description("Metageneration of the object"),
            )
    }

    async fn create(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()> {
        let client = meta.client().await;

        let bucket = d.get_str("bucket")?;
        let name = d.get_str("name")?;
        let bucket = id::sanitize_bucket(&bucket);
        let name = id::sanitize_object(&name);
        info!(bucket, name, "creating secret");

        let req = CreateRequest {
            bucket: bucket.to_string(),
            object: name.to_string(),
            key: d.get_str("key")?,
            plaintext: d.get_str("plaintext")?.into_bytes(),
        };
        let secret = meta
            .run(ctx, client.create(req))
            .await
            .context("failed to create secret")?;

        d.set_id(id::encode(bucket, &secret.name, secret.generation));
        d.set_many(vec![
            ("generation", Value::from(secret.generation)),
            ("metageneration", Value::from(secret.metageneration)),
        ])
        .context("failed to update resource fields")?;

        self.read(ctx, meta, d).await
    }

    async fn read(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()> {
        read_secret(ctx, meta, d).await
    }

    async fn update(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()> {
        let client = meta.client().await;

        let secret_id = id::decode(d.id()).context("failed to decode id")?;

        if !d.has_change("plaintext") {
            debug!(id = %secret_id, "plaintext unchanged, skipping update");
            return Ok(());
        }
        info!(id = %secret_id, "updating secret");

        let req = UpdateRequest {
            bucket: secret_id.bucket().to_string(),
            object: secret_id.object().to_string(),
            generation: secret_id.generation(),
            metageneration: d.get_int("metageneration")?,
            key: d.get_str("key")?,
            plaintext: d.get_str("plaintext")?.into_bytes(),
        };
        let secret = meta
            .run(ctx, client.update(req))
            .await
            .context("failed to update secret")?;

        d.set_id(id::encode(secret_id.bucket(), &secret.name, secret.generation));
        d.set_many(vec![
            ("generation", Value::from(secret.generation)),
            ("metageneration", Value::from(secret.metageneration)),
            ("plaintext", Value::from(secret.plaintext_lossy())),
        ])
        .context("failed to update resource fields")?;

        self.read(ctx, meta, d).await
    }

    async fn delete(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()> {
        let client = meta.client().await;

        let secret_id = id::decode(d.id()).context("failed to decode id")?;
        info!(id = %secret_id, "deleting secret");

        let req = DeleteRequest {
            bucket: secret_id.bucket().to_string(),
            object: secret_id.object().to_string(),
        };
        meta.run(ctx, client.delete(req))
            .await
            .context("failed to delete secret")?;

        d.clear_id();
        Ok(())
    }

    async fn import(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        mut d: ResourceData,
    ) -> Result<Vec<ResourceData>> {
        let secret_id = id::decode(d.id()).context("failed to decode id")?;

        d.set_many(vec![
            ("bucket", Value::from(secret_id.bucket())),
            ("name", Value::from(secret_id.object())),
            ("generation", Value::from(secret_id.generation())),
        ])
        .context("failed to update resource fields")?;

        self.read(ctx, meta, &mut d).await?;
        Ok(vec![d])
    }
}

/// Reads the secret named by `d`'s id and populates every attribute.
///
/// Shared by the resource and the data source.
pub(super) async fn read_secret(
    ctx: &CancellationToken,
    meta: &ProviderMeta,
    d: &mut ResourceData,
) -> Result<()> {
    let client = meta.client().await;

    let secret_id = id::decode(d.id()).context("failed to decode id")?;
    debug!(id = %secret_id, "reading secret");

    let req = ReadRequest {
        bucket: secret_id.bucket().to_string(),
        object: secret_id.object().to_string(),
        generation: secret_id.generation(),
    };
    let secret = meta
        .run(ctx, client.read(req))
        .await
        .context("failed to read secret")?;

    d.set_many(vec![
        ("bucket", Value::from(secret_id.bucket())),
        ("name", Value::from(secret.name.as_str())),
        ("key", Value::from(secret.kms_key.as_str())),
        ("plaintext", Value::from(secret.plaintext_lossy())),
        ("generation", Value::from(secret.generation)),
        ("metageneration", Value::from(secret.metageneration)),
    ])
    .context("failed to update resource fields")
}
