//! Credential resolution.
//!
//! The provider authenticates to Cloud Storage and Cloud KMS with a single
//! token source chosen once at configuration time. Three inputs are tried
//! in strict order:
//!
//! 1. an explicit OAuth2 access token (literal or path to a file),
//! 2. explicit credentials JSON (literal or path to a file),
//! 3. Application Default Credentials.
//!
//! # Example
//!
//! ```
//! use berglas_provider::credentials;
//!
//! #[tokio::main]
//! async fn main() -> berglas_provider::Result<()> {
//!     let source = credentials::resolve("ya29.a0Af...", "").await?;
//!     assert_eq!(source.name(), "access_token");
//!     Ok(())
//! }
//! ```

pub mod contents;
mod source;

pub use contents::PathOrContents;
pub use source::{AccessToken, OAuthTokenSource, StaticTokenSource, TokenSource};

use crate::{ProviderError, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use yup_oauth2::authenticator::{ApplicationDefaultCredentialsTypes, DefaultAuthenticator};
use yup_oauth2::authorized_user::AuthorizedUserSecret;

/// OAuth2 scope requested for every token.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Environment variable naming a credentials file for default discovery.
const APPLICATION_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// How long to wait for the metadata server before giving up on it.
const METADATA_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns the best token source for the given inputs.
///
/// Empty strings are treated as unset. When both `access_token` and
/// `credentials` are given, the access token wins; schema validation is
/// expected to have rejected that combination earlier.
///
/// # Errors
///
/// Returns [`ProviderError::Context`] wrapping the cause when the chosen
/// input cannot be read or parsed, or when no default credentials exist.
pub async fn resolve(access_token: &str, credentials: &str) -> Result<Arc<dyn TokenSource>> {
    if !access_token.is_empty() {
        info!(method = "access_token", "authenticating via access_token");

        let token = contents::read(access_token)
            .await
            .map_err(|e| ProviderError::context("failed to load access token", e))?;

        return Ok(Arc::new(StaticTokenSource::new(token.contents.trim_end())));
    }

    if !credentials.is_empty() {
        info!(method = "credentials", "authenticating via credentials");

        let creds = contents::read(credentials)
            .await
            .map_err(|e| ProviderError::context("failed to load credentials", e))?;
        debug!(from_file = creds.from_file, "loaded credentials");

        let auth = from_json(&creds.contents)
            .await
            .map_err(|e| ProviderError::context("failed to parse credentials", e))?;

        return Ok(Arc::new(OAuthTokenSource::new(
            "credentials",
            auth,
            &[CLOUD_PLATFORM_SCOPE],
        )));
    }

    info!(method = "default", "authenticating via default credentials");
    let auth = default_credentials()
        .await
        .map_err(|e| ProviderError::context("failed to get default credentials", e))?;

    Ok(Arc::new(OAuthTokenSource::new(
        "default",
        auth,
        &[CLOUD_PLATFORM_SCOPE],
    )))
}

/// Only the `type` discriminator; the rest is parsed by the matching flow.
#[derive(Debug, Deserialize)]
struct CredentialsKind {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Builds an authenticator from a credentials JSON document.
///
/// Accepts `service_account` keys and `authorized_user` refresh tokens.
async fn from_json(json: &str) -> Result<DefaultAuthenticator> {
    let kind: CredentialsKind = serde_json::from_str(json)?;

    match kind.kind.as_deref() {
        Some("service_account") => {
            let key = yup_oauth2::parse_service_account_key(json).map_err(|e| {
                ProviderError::Credentials(format!("invalid service account key: {e}"))
            })?;
            yup_oauth2::ServiceAccountAuthenticator::builder(key)
                .build()
                .await
                .map_err(ProviderError::Io)
        }
        Some("authorized_user") => {
            let secret: AuthorizedUserSecret = serde_json::from_str(json)?;
            yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
                .build()
                .await
                .map_err(ProviderError::Io)
        }
        Some(other) => Err(ProviderError::Credentials(format!(
            "unsupported credentials type {other:?}"
        ))),
        None => Err(ProviderError::Credentials(
            "credentials JSON has no \"type\" field".to_string(),
        )),
    }
}

/// Discovers Application Default Credentials.
///
/// Checks `GOOGLE_APPLICATION_CREDENTIALS`, then the gcloud well-known file,
/// then the GCE metadata server.
async fn default_credentials() -> Result<DefaultAuthenticator> {
    if let Ok(path) = std::env::var(APPLICATION_CREDENTIALS_ENV) {
        if !path.is_empty() {
            debug!(path = %path, "using {}", APPLICATION_CREDENTIALS_ENV);
            let json = tokio::fs::read_to_string(&path).await?;
            return from_json(&json).await;
        }
    }

    if let Some(path) = well_known_file() {
        if let Ok(json) = tokio::fs::read_to_string(&path).await {
            debug!(path = %path.display(), "using gcloud application default credentials");
            return from_json(&json).await;
        }
    }

    let opts = yup_oauth2::ApplicationDefaultCredentialsFlowOpts::default();
    let auth = match yup_oauth2::ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
        ApplicationDefaultCredentialsTypes::InstanceMetadata(auth) => auth.build().await?,
        ApplicationDefaultCredentialsTypes::ServiceAccount(auth) => auth.build().await?,
    };

    // The metadata flow builds without touching the network; probe it so a
    // missing metadata server fails here instead of on the first call.
    match tokio::time::timeout(METADATA_PROBE_TIMEOUT, auth.token(&[CLOUD_PLATFORM_SCOPE])).await {
        Ok(Ok(_)) => Ok(auth),
        Ok(Err(e)) => Err(ProviderError::Credentials(format!(
            "could not find default credentials: {e}"
        ))),
        Err(_) => Err(ProviderError::Credentials(
            "could not find default credentials: metadata server timed out".to_string(),
        )),
    }
}

/// Location of the credentials written by `gcloud auth application-default login`.
fn well_known_file() -> Option<std::path::PathBuf> {
    if cfg!(windows) {
        dirs::config_dir().map(|d| d.join("gcloud").join("application_default_credentials.json"))
    } else {
        dirs::home_dir().map(|d| {
            d.join(".config")
                .join("gcloud")
                .join("application_default_credentials.json")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;
    use tracing_test::traced_test;

    // Tests that touch the process environment take this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[tokio::test]
    #[traced_test]
    async fn test_resolve_access_token_literal() {
        let source = resolve("ya29.literal", "").await.unwrap();

        assert_eq!(source.name(), "access_token");
        assert_eq!(source.token().await.unwrap().value, "ya29.literal");
        assert!(logs_contain("authenticating via access_token"));
    }

    #[tokio::test]
    async fn test_resolve_access_token_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ya29.from-file").unwrap();

        let source = resolve(file.path().to_str().unwrap(), "").await.unwrap();
        assert_eq!(source.token().await.unwrap().value, "ya29.from-file");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_access_token_takes_precedence() {
        let source = resolve("ya29.token", "{not json").await.unwrap();

        assert_eq!(source.name(), "access_token");
        assert!(!logs_contain("authenticating via credentials"));
    }

    #[tokio::test]
    async fn test_unreadable_access_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(dir.path().to_str().unwrap(), "").await.unwrap_err();

        assert!(err.to_string().starts_with("failed to load access token"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_invalid_credentials_json() {
        let err = resolve("", "{not json").await.unwrap_err();

        assert!(err.to_string().starts_with("failed to parse credentials"));
        assert!(matches!(err.root_cause(), ProviderError::Json(_)));
        assert!(logs_contain("authenticating via credentials"));
    }

    #[tokio::test]
    async fn test_unsupported_credentials_type() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"type": "external_account"}}"#).unwrap();

        let err = resolve("", file.path().to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("unsupported credentials type"));
    }

    #[tokio::test]
    async fn test_credentials_without_type() {
        let err = resolve("", r#"{"client_email": "x@example.com"}"#)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no \"type\" field"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_resolve_authorized_user_credentials() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "type": "authorized_user",
                "client_id": "123.apps.googleusercontent.com",
                "client_secret": "secret",
                "refresh_token": "1//refresh"
            }}"#
        )
        .unwrap();

        let source = resolve("", file.path().to_str().unwrap()).await.unwrap();

        assert_eq!(source.name(), "credentials");
        assert!(logs_contain("authenticating via credentials"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_resolve_default_credentials_from_env_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        std::env::set_var(APPLICATION_CREDENTIALS_ENV, file.path());

        let result = resolve("", "").await;
        std::env::remove_var(APPLICATION_CREDENTIALS_ENV);

        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("failed to get default credentials"));
        assert!(matches!(err.root_cause(), ProviderError::Json(_)));
        assert!(logs_contain("authenticating via default credentials"));
    }

    #[tokio::test]
    async fn test_invalid_service_account_key() {
        let err = resolve("", r#"{"type": "service_account"}"#).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to parse credentials"));
    }
}
