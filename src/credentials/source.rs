//! Token sources for authenticating outbound backend calls.

use crate::{ProviderError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use yup_oauth2::authenticator::DefaultAuthenticator;

/// A short-lived credential attached to outbound requests.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Bearer token value
    pub value: String,
    /// When the token stops being valid, if known
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a token that never expires.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Checks if the token has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns the token, or an error if it has already expired.
    pub fn ensure_valid(self) -> Result<Self> {
        if self.is_expired() {
            return Err(ProviderError::Credentials(
                "token source returned an expired token".to_string(),
            ));
        }
        Ok(self)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// TokenSource produces access tokens on demand.
///
/// Implementations are resolved once when the provider is configured and
/// shared by every backend call afterwards, so they must be `Send + Sync`.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    /// Returns which credential branch produced this source
    /// (`access_token`, `credentials` or `default`).
    fn name(&self) -> &str;

    /// Returns a valid access token, refreshing it if needed.
    async fn token(&self) -> Result<AccessToken>;
}

/// Source that always returns the same token.
pub struct StaticTokenSource {
    token: AccessToken,
}

impl StaticTokenSource {
    /// Creates a static source around a literal token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

impl fmt::Debug for StaticTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenSource")
            .field("token", &self.token)
            .finish()
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    fn name(&self) -> &str {
        "access_token"
    }

    async fn token(&self) -> Result<AccessToken> {
        Ok(self.token.clone())
    }
}

/// Source backed by an OAuth2 flow (service account, authorized user or
/// instance metadata). Tokens are cached and refreshed by the authenticator.
pub struct OAuthTokenSource {
    name: &'static str,
    auth: DefaultAuthenticator,
    scopes: Vec<String>,
}

impl OAuthTokenSource {
    pub(crate) fn new(name: &'static str, auth: DefaultAuthenticator, scopes: &[&str]) -> Self {
        Self {
            name,
            auth,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Debug for OAuthTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokenSource")
            .field("name", &self.name)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[async_trait]
impl TokenSource for OAuthTokenSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn token(&self) -> Result<AccessToken> {
        let token = self
            .auth
            .token(&self.scopes)
            .await
            .map_err(|e| ProviderError::Credentials(format!("failed to fetch token: {e}")))?;

        let value = token
            .token()
            .ok_or_else(|| ProviderError::Credentials("token response has no access token".into()))?
            .to_string();

        let expires_at = token
            .expiration_time()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.unix_timestamp(), 0));

        AccessToken { value, expires_at }.ensure_valid()
    }
}
