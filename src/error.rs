//! Error types and diagnostics for provider operations.

use std::num::ParseIntError;
use thiserror::Error;

/// Result type alias using [`ProviderError`].
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while configuring the provider or running a
/// resource operation.
///
/// All errors implement `std::error::Error` and can be chained with `source()`.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Resource identifier is missing the bucket/object separator.
    #[error("id must be {{bucket}}/{{object}}#{{generation}}, got {0:?}")]
    InvalidId(String),

    /// Generation suffix of a resource identifier is not a base-10 integer.
    #[error("failed to parse generation {value:?}")]
    InvalidGeneration {
        /// The offending suffix
        value: String,
        /// Underlying parse error
        #[source]
        source: ParseIntError,
    },

    /// Credentials could not be loaded, parsed or discovered.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Secret does not exist in the backend.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// Write was rejected because the object changed underneath it.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Backend call failed for a reason the provider does not classify.
    #[error("backend error: {0}")]
    Backend(String),

    /// Required attribute has no value.
    #[error("missing required attribute {0:?}")]
    MissingAttribute(String),

    /// Attribute holds a value of the wrong type.
    #[error("attribute {name:?} must be a {expected}")]
    InvalidAttribute {
        /// Attribute name
        name: String,
        /// Expected type
        expected: String,
    },

    /// Two mutually exclusive attributes were both set.
    #[error("{0:?} conflicts with {1:?}")]
    ConflictingAttributes(String, String),

    /// Planned change touches an attribute that cannot be updated in place.
    #[error("changing {0:?} requires replacing the resource")]
    RequiresReplace(String),

    /// Schema definition is internally inconsistent.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Operation was attempted before the provider was configured.
    #[error("provider is not configured")]
    NotConfigured,

    /// No resource or data source is registered under this type name.
    #[error("unknown resource type: {0}")]
    UnknownResource(String),

    /// Operation was cancelled by the caller or the provider was stopped.
    #[error("operation cancelled")]
    Cancelled,

    /// Wraps an underlying error with a descriptive prefix.
    #[error("{context}: {source}")]
    Context {
        /// What was being attempted
        context: String,
        /// Underlying error
        #[source]
        source: Box<ProviderError>,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    /// Wraps an error with a description of the operation that failed.
    ///
    /// # Example
    ///
    /// ```
    /// use berglas_provider::ProviderError;
    ///
    /// let err = ProviderError::NotFound("my-bucket/api-key".to_string());
    /// let wrapped = ProviderError::context("failed to read secret", err);
    ///
    /// assert_eq!(
    ///     wrapped.to_string(),
    ///     "failed to read secret: secret not found: my-bucket/api-key"
    /// );
    /// ```
    pub fn context(context: impl Into<String>, err: ProviderError) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(err),
        }
    }

    /// Returns the innermost error, skipping any [`ProviderError::Context`]
    /// wrappers.
    pub fn root_cause(&self) -> &ProviderError {
        match self {
            Self::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Extension trait for attaching a descriptive prefix to a [`Result`].
pub trait ResultExt<T> {
    /// Wraps the error, if any, with `context`.
    fn context(self, context: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|e| ProviderError::context(context, e))
    }
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed.
    Error,
    /// Operation succeeded but something deserves attention.
    Warning,
}

/// A user-visible message returned to the host framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// One-line summary (the full error message)
    pub summary: String,
    /// Innermost cause, if it differs from the summary
    pub detail: Option<String>,
}

impl Diagnostic {
    /// Builds an error diagnostic from a provider error.
    pub fn from_error(err: &ProviderError) -> Self {
        let summary = err.to_string();
        let root = err.root_cause().to_string();
        Self {
            severity: Severity::Error,
            detail: (root != summary).then_some(root),
            summary,
        }
    }
}

/// Diagnostics produced by a single operation.
pub type Diagnostics = Vec<Diagnostic>;

impl From<ProviderError> for Diagnostics {
    fn from(err: ProviderError) -> Self {
        vec![Diagnostic::from_error(&err)]
    }
}
