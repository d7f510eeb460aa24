//! Provider definition: schema, handler registry and configuration.

use crate::config::{ProviderSettings, ACCESS_TOKEN_ENV_VARS, CREDENTIALS_ENV_VARS};
use crate::credentials;
use crate::error::{Diagnostics, ResultExt};
use crate::factory::ClientFactory;
use crate::meta::ProviderMeta;
use crate::resources::{DataSource, Resource, SecretDataSource, SecretResource};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use crate::{ProviderError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Default)]
struct Configured {
    settings: Option<ProviderSettings>,
    meta: Option<Arc<ProviderMeta>>,
}

/// The Berglas provider.
///
/// Holds the provider schema and one handler per resource and data source
/// type. Every operation requires [`configure`](Self::configure) to have
/// succeeded first.
///
/// # Example
///
/// ```
/// use berglas_provider::backends::memory::MemoryBackend;
/// use berglas_provider::factory::FnFactory;
/// use berglas_provider::Provider;
/// use serde_json::json;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() {
///     let factory = FnFactory::new(|_tokens| Ok(Arc::new(MemoryBackend::new())));
///     let provider = Provider::new("dev", Arc::new(factory));
///
///     provider
///         .configure_with_env(json!({"access_token": "ya29.token"}), |_| None)
///         .await
///         .unwrap();
///
///     let ctx = CancellationToken::new();
///     let state = provider
///         .create(
///             "berglas_secret",
///             &ctx,
///             json!({"bucket": "b", "name": "s", "key": "k", "plaintext": "p"}),
///         )
///         .await
///         .unwrap();
///     assert_eq!(state["id"], "b/s#1");
/// }
/// ```
pub struct Provider {
    version: String,
    schema: Schema,
    resources: BTreeMap<String, Arc<dyn Resource>>,
    data_sources: BTreeMap<String, Arc<dyn DataSource>>,
    factory: Arc<dyn ClientFactory>,
    configured: RwLock<Configured>,
}

impl Provider {
    /// Creates a provider with all resources and data sources registered.
    pub fn new(version: impl Into<String>, factory: Arc<dyn ClientFactory>) -> Self {
        let mut provider = Self {
            version: version.into(),
            schema: provider_schema(),
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
            factory,
            configured: RwLock::new(Configured::default()),
        };
        provider.register_resource(Arc::new(SecretResource::new()));
        provider.register_data_source(Arc::new(SecretDataSource::new()));
        provider
    }

    /// Registers a resource handler under its type name.
    pub fn register_resource(&mut self, resource: Arc<dyn Resource>) {
        self.resources
            .insert(resource.type_name().to_string(), resource);
    }

    /// Registers a data source handler under its type name.
    pub fn register_data_source(&mut self, data_source: Arc<dyn DataSource>) {
        self.data_sources
            .insert(data_source.type_name().to_string(), data_source);
    }

    /// Returns the provider version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the provider configuration schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the registered resource type names.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Returns the registered data source type names.
    pub fn data_source_types(&self) -> impl Iterator<Item = &str> {
        self.data_sources.keys().map(String::as_str)
    }

    /// Checks the provider schema and every handler schema for consistency.
    pub fn internal_validate(&self) -> Result<()> {
        self.schema
            .internal_validate()
            .context("provider")?;
        for (name, resource) in &self.resources {
            resource
                .schema()
                .internal_validate()
                .context(&format!("resource {name}"))?;
        }
        for (name, data_source) in &self.data_sources {
            data_source
                .schema()
                .internal_validate()
                .context(&format!("data source {name}"))?;
        }
        Ok(())
    }

    /// Configures the provider from its configuration block, reading unset
    /// attributes from the process environment.
    pub async fn configure(&self, config: Value) -> std::result::Result<(), Diagnostics> {
        self.configure_with_env(config, |k| std::env::var(k).ok())
            .await
    }

    /// Like [`configure`](Self::configure), with an explicit environment
    /// lookup.
    pub async fn configure_with_env<F>(
        &self,
        config: Value,
        lookup: F,
    ) -> std::result::Result<(), Diagnostics>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = self.settings_from(config, lookup)?;
        self.configure_settings(settings).await.map_err(Into::into)
    }

    fn settings_from<F>(&self, config: Value, lookup: F) -> Result<ProviderSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut data = ResourceData::new(&self.schema).with_attributes(config)?;
        self.schema.apply_env_defaults(&mut data, lookup)?;
        self.schema.validate(&data)?;
        ProviderSettings::from_data(&data)
    }

    /// Configures the provider from already-resolved settings.
    ///
    /// Resolves credentials, builds a client and replaces any previous
    /// configuration.
    pub async fn configure_settings(&self, settings: ProviderSettings) -> Result<()> {
        let client = self.build_client(&settings).await?;

        let mut configured = self.configured.write().await;
        if let Some(old) = configured.meta.take() {
            old.stop().await;
        }
        configured.meta = Some(Arc::new(ProviderMeta::new(client)));
        configured.settings = Some(settings);

        info!(version = %self.version, "provider configured");
        Ok(())
    }

    /// Rebuilds the client from the stored settings and swaps it in.
    ///
    /// In-flight operations are cancelled through the stop token.
    pub async fn reset(&self) -> Result<()> {
        let (settings, meta) = {
            let configured = self.configured.read().await;
            match (&configured.settings, &configured.meta) {
                (Some(s), Some(m)) => (s.clone(), m.clone()),
                _ => return Err(ProviderError::NotConfigured),
            }
        };

        let client = self.build_client(&settings).await?;
        meta.reset(client).await;

        info!("provider reset");
        Ok(())
    }

    /// Cancels in-flight operations.
    pub async fn stop(&self) {
        if let Some(meta) = &self.configured.read().await.meta {
            meta.stop().await;
        }
    }

    /// Returns the shared state of a configured provider.
    pub async fn meta(&self) -> Result<Arc<ProviderMeta>> {
        self.configured
            .read()
            .await
            .meta
            .clone()
            .ok_or(ProviderError::NotConfigured)
    }

    async fn build_client(
        &self,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn crate::Backend>> {
        let tokens = credentials::resolve(&settings.access_token, &settings.credentials)
            .await
            .context("failed to configure provider")?;

        self.factory
            .build(tokens)
            .await
            .context("failed to setup berglas")
    }

    fn resource(&self, type_name: &str) -> Result<&Arc<dyn Resource>> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> Result<&Arc<dyn DataSource>> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Creates a resource from its planned attributes and returns the new
    /// state.
    pub async fn create(
        &self,
        type_name: &str,
        ctx: &CancellationToken,
        planned: Value,
    ) -> std::result::Result<Value, Diagnostics> {
        let result = async {
            let resource = self.resource(type_name)?;
            let meta = self.meta().await?;
            let schema = resource.schema();

            let mut d = ResourceData::new(&schema).with_attributes(planned)?;
            schema.validate(&d)?;
            resource.create(ctx, &meta, &mut d).await?;
            Ok::<_, ProviderError>(d.to_state())
        }
        .await;
        report(type_name, "create", result)
    }

    /// Refreshes a resource from its current state.
    pub async fn read(
        &self,
        type_name: &str,
        ctx: &CancellationToken,
        state: Value,
    ) -> std::result::Result<Value, Diagnostics> {
        let result = async {
            let resource = self.resource(type_name)?;
            let meta = self.meta().await?;

            let (id, attrs) = split_id(state);
            let mut d = ResourceData::new(&resource.schema())
                .with_id(id)
                .with_attributes(attrs)?;
            resource.read(ctx, &meta, &mut d).await?;
            Ok::<_, ProviderError>(d.to_state())
        }
        .await;
        report(type_name, "read", result)
    }

    /// Applies the planned attributes to a resource and returns the new
    /// state.
    ///
    /// Changes to `force_new` attributes are rejected with
    /// [`ProviderError::RequiresReplace`]; those need a delete and create.
    pub async fn update(
        &self,
        type_name: &str,
        ctx: &CancellationToken,
        prior: Value,
        planned: Value,
    ) -> std::result::Result<Value, Diagnostics> {
        let result = async {
            let resource = self.resource(type_name)?;
            let meta = self.meta().await?;
            let schema = resource.schema();

            let (id, prior) = split_id(prior);
            let (_, planned) = split_id(planned);
            let mut d = ResourceData::new(&schema)
                .with_id(id)
                .with_attributes(planned)?
                .with_prior_state(prior)?;
            schema.validate(&d)?;
            schema.check_in_place_update(&d)?;
            resource.update(ctx, &meta, &mut d).await?;
            Ok::<_, ProviderError>(d.to_state())
        }
        .await;
        report(type_name, "update", result)
    }

    /// Deletes a resource.
    pub async fn delete(
        &self,
        type_name: &str,
        ctx: &CancellationToken,
        state: Value,
    ) -> std::result::Result<(), Diagnostics> {
        let result = async {
            let resource = self.resource(type_name)?;
            let meta = self.meta().await?;

            let (id, attrs) = split_id(state);
            let mut d = ResourceData::new(&resource.schema())
                .with_id(id)
                .with_attributes(attrs)?;
            resource.delete(ctx, &meta, &mut d).await
        }
        .await;
        report(type_name, "delete", result)
    }

    /// Imports an existing resource by id and returns its state.
    pub async fn import(
        &self,
        type_name: &str,
        ctx: &CancellationToken,
        id: &str,
    ) -> std::result::Result<Vec<Value>, Diagnostics> {
        let result = async {
            let resource = self.resource(type_name)?;
            let meta = self.meta().await?;

            let d = ResourceData::new(&resource.schema()).with_id(id);
            let imported = resource.import(ctx, &meta, d).await?;
            Ok::<_, ProviderError>(imported.iter().map(ResourceData::to_state).collect())
        }
        .await;
        report(type_name, "import", result)
    }

    /// Reads a data source from its configuration.
    pub async fn read_data_source(
        &self,
        type_name: &str,
        ctx: &CancellationToken,
        config: Value,
    ) -> std::result::Result<Value, Diagnostics> {
        let result = async {
            let data_source = self.data_source(type_name)?;
            let meta = self.meta().await?;
            let schema = data_source.schema();

            let (_, attrs) = split_id(config);
            let mut d = ResourceData::new(&schema).with_attributes(attrs)?;
            schema.validate(&d)?;
            data_source.read(ctx, &meta, &mut d).await?;
            Ok::<_, ProviderError>(d.to_state())
        }
        .await;
        report(type_name, "read data source", result)
    }
}

fn provider_schema() -> Schema {
    Schema::new()
        .with_attribute(
            "credentials",
            Attribute::optional_string()
                .with_description(
                    "JSON credentials with which to authenticate against the API. This can be \
                     set to the raw credential contents or it can be set to a file path on disk \
                     which contains the file contents.",
                )
                .env_default(CREDENTIALS_ENV_VARS)
                .conflicts_with(&["access_token"]),
        )
        .with_attribute(
            "access_token",
            Attribute::optional_string()
                .with_description("OAuth2 access token to use for communicating with Google APIs.")
                .env_default(ACCESS_TOKEN_ENV_VARS)
                .conflicts_with(&["credentials"]),
        )
}

/// Separates the `id` attribute from the rest of a state object.
fn split_id(state: Value) -> (String, Value) {
    match state {
        Value::Object(mut map) => {
            let id = match map.remove("id") {
                Some(Value::String(id)) => id,
                _ => String::new(),
            };
            (id, Value::Object(map))
        }
        other => (String::new(), other),
    }
}

fn report<T>(type_name: &str, op: &str, result: Result<T>) -> std::result::Result<T, Diagnostics> {
    result.map_err(|e| {
        warn!(resource = type_name, op, error = %e, "operation failed");
        e.into()
    })
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryBackend;
    use crate::factory::FnFactory;
    use serde_json::json;

    fn provider() -> Provider {
        let factory = FnFactory::new(|_tokens| Ok(Arc::new(MemoryBackend::new())));
        Provider::new("test", Arc::new(factory))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_internal_validate() {
        provider().internal_validate().unwrap();
    }

    #[test]
    fn test_registered_types() {
        let p = provider();
        assert_eq!(p.resource_types().collect::<Vec<_>>(), vec!["berglas_secret"]);
        assert_eq!(p.data_source_types().collect::<Vec<_>>(), vec!["berglas_secret"]);
    }

    #[tokio::test]
    async fn test_operations_require_configuration() {
        let p = provider();
        let diags = p
            .read("berglas_secret", &CancellationToken::new(), json!({"id": "b/s"}))
            .await
            .unwrap_err();

        assert_eq!(diags[0].summary, "provider is not configured");
    }

    #[tokio::test]
    async fn test_configure_rejects_conflicting_credentials() {
        let p = provider();
        let diags = p
            .configure_with_env(json!({"access_token": "t", "credentials": "{}"}), no_env)
            .await
            .unwrap_err();

        assert!(diags[0].summary.contains("conflicts with"));
        assert!(p.meta().await.is_err());
    }

    #[tokio::test]
    async fn test_configure_reads_env_defaults() {
        let p = provider();
        p.configure_with_env(json!({}), |k| {
            (k == "GOOGLE_OAUTH_ACCESS_TOKEN").then(|| "ya29.env".to_string())
        })
        .await
        .unwrap();

        assert!(p.meta().await.is_ok());
    }

    #[tokio::test]
    async fn test_configure_surfaces_credential_errors() {
        let p = provider();
        let diags = p
            .configure_with_env(json!({"credentials": "{not json"}), no_env)
            .await
            .unwrap_err();

        assert!(diags[0]
            .summary
            .starts_with("failed to configure provider: failed to parse credentials"));
    }

    #[tokio::test]
    async fn test_configure_surfaces_factory_errors() {
        let factory = FnFactory::new(|_tokens| Err(ProviderError::Backend("no network".into())));
        let p = Provider::new("test", Arc::new(factory));

        let diags = p
            .configure_with_env(json!({"access_token": "t"}), no_env)
            .await
            .unwrap_err();

        assert_eq!(
            diags[0].summary,
            "failed to setup berglas: backend error: no network"
        );
    }

    #[tokio::test]
    async fn test_reset_replaces_client() {
        let p = provider();
        p.configure_settings(ProviderSettings::new().with_access_token("t"))
            .await
            .unwrap();

        let meta = p.meta().await.unwrap();
        let before = meta.client().await;
        let stop = meta.stop_token().await;

        p.reset().await.unwrap();

        assert!(!Arc::ptr_eq(&before, &meta.client().await));
        assert!(stop.is_cancelled());
    }

    #[tokio::test]
    async fn test_reset_requires_configuration() {
        assert!(matches!(
            provider().reset().await,
            Err(ProviderError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let p = provider();
        p.configure_settings(ProviderSettings::new().with_access_token("t"))
            .await
            .unwrap();

        let diags = p
            .import("berglas_iam", &CancellationToken::new(), "b/s")
            .await
            .unwrap_err();
        assert_eq!(diags[0].summary, "unknown resource type: berglas_iam");
    }

    #[tokio::test]
    async fn test_create_validates_required_attributes() {
        let p = provider();
        p.configure_settings(ProviderSettings::new().with_access_token("t"))
            .await
            .unwrap();

        let diags = p
            .create(
                "berglas_secret",
                &CancellationToken::new(),
                json!({"bucket": "b", "name": "s", "key": "k"}),
            )
            .await
            .unwrap_err();
        assert_eq!(diags[0].summary, "missing required attribute \"plaintext\"");
    }

    #[test]
    fn test_split_id() {
        let (id, rest) = split_id(json!({"id": "b/s#1", "name": "s"}));
        assert_eq!(id, "b/s#1");
        assert_eq!(rest, json!({"name": "s"}));
    }
}
