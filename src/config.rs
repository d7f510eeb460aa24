//! Provider configuration.

use crate::state::ResourceData;
use crate::Result;
use std::fmt;

/// Environment variables consulted, in order, for `credentials`.
pub const CREDENTIALS_ENV_VARS: &[&str] = &[
    "GOOGLE_APPLICATION_CREDENTIALS",
    "GOOGLE_CREDENTIALS",
    "GOOGLE_CLOUD_KEYFILE_JSON",
    "GCLOUD_KEYFILE_JSON",
];

/// Environment variables consulted, in order, for `access_token`.
pub const ACCESS_TOKEN_ENV_VARS: &[&str] = &["GOOGLE_OAUTH_ACCESS_TOKEN"];

/// Authentication settings for a provider instance.
///
/// Empty strings mean "unset". Use the builder methods for ergonomic
/// construction:
///
/// ```
/// use berglas_provider::ProviderSettings;
///
/// let settings = ProviderSettings::new().with_credentials("/path/to/key.json");
/// assert!(settings.access_token.is_empty());
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    /// OAuth2 access token, or a path to a file containing one
    pub access_token: String,

    /// Credentials JSON, or a path to a file containing it
    pub credentials: String,
}

impl ProviderSettings {
    /// Creates settings that fall back to default credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the access token (literal or path).
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    /// Sets the credentials (literal JSON or path).
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = credentials.into();
        self
    }

    /// Reads settings from validated provider configuration.
    pub fn from_data(data: &ResourceData) -> Result<Self> {
        Ok(Self {
            access_token: data.get_str("access_token")?,
            credentials: data.get_str("credentials")?,
        })
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |s: &str| if s.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("ProviderSettings")
            .field("access_token", &mask(&self.access_token))
            .field("credentials", &mask(&self.credentials))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;

    #[test]
    fn test_settings_builder() {
        let settings = ProviderSettings::new()
            .with_access_token("ya29.token")
            .with_credentials("");

        assert_eq!(settings.access_token, "ya29.token");
        assert!(settings.credentials.is_empty());
    }

    #[test]
    fn test_from_data() {
        let schema = Schema::new()
            .with_attribute("access_token", Attribute::optional_string())
            .with_attribute("credentials", Attribute::optional_string());
        let data = ResourceData::new(&schema)
            .with_attributes(json!({"credentials": "/tmp/key.json"}))
            .unwrap();

        let settings = ProviderSettings::from_data(&data).unwrap();
        assert_eq!(settings, ProviderSettings::new().with_credentials("/tmp/key.json"));
    }

    #[test]
    fn test_debug_masks_values() {
        let settings = ProviderSettings::new().with_access_token("ya29.secret");
        let debug = format!("{settings:?}");
        assert!(!debug.contains("ya29.secret"));
        assert!(debug.contains("REDACTED"));
    }
}
