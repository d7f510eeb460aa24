//! `berglas_secret` data source.

use super::secret::read_secret;
use super::DataSource;
use crate::id;
use crate::meta::ProviderMeta;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use crate::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Reads a secret without managing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretDataSource;

impl SecretDataSource {
    /// Creates the handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DataSource for SecretDataSource {
    fn type_name(&self) -> &str {
        "berglas_secret"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("Access Berglas secrets.")
            .with_attribute(
                "bucket",
                Attribute::required_string()
                    .with_description("Name of the Cloud Storage bucket for the secret"),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of the secret object in the bucket"),
            )
            .with_attribute(
                "generation",
                Attribute::optional_int().with_description("Generation of the object"),
            )
            .with_attribute(
                "key",
                Attribute::computed_string()
                    .with_description("Fully-qualified name of the Cloud KMS key"),
            )
            .with_attribute(
                "plaintext",
                Attribute::computed_string()
                    .with_description("Plaintext contents")
                    .sensitive(),
            )
            .with_attribute(
                "metageneration",
                Attribute::computed_int().with_description("Metageneration of the object"),
            )
    }

    async fn read(
        &self,
        ctx: &CancellationToken,
        meta: &ProviderMeta,
        d: &mut ResourceData,
    ) -> Result<()> {
        let bucket = d.get_str("bucket")?;
        let name = d.get_str("name")?;
        let generation = d.get_int("generation")?;

        d.set_id(id::encode(&bucket, &name, generation));
        read_secret(ctx, meta, d).await
    }
}
