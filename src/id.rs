//! Resource identifier codec.
//!
//! A secret is addressed by the bucket it lives in, its object name and,
//! optionally, a specific object generation. The three parts are flattened
//! into a single string that is used as the resource id:
//!
//! ```text
//! {bucket}/{object}
//! {bucket}/{object}#{generation}
//! ```
//!
//! The generation suffix is only written when the generation is positive;
//! a generation of `0` means "latest".

use crate::{ProviderError, Result};
use std::fmt;
use std::str::FromStr;

/// Decoded form of a resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretId {
    bucket: String,
    object: String,
    generation: i64,
}

impl SecretId {
    /// Creates an identifier, normalizing the bucket and object names.
    pub fn new(bucket: &str, object: &str, generation: i64) -> Self {
        Self {
            bucket: sanitize_bucket(bucket).to_string(),
            object: sanitize_object(object).to_string(),
            generation,
        }
    }

    /// Bucket name without any `gs://` prefix or surrounding slashes.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object name without surrounding slashes.
    pub fn object(&self) -> &str {
        &self.object
    }

    /// Object generation, `0` for latest.
    pub fn generation(&self) -> i64 {
        self.generation
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.object)?;
        if self.generation > 0 {
            write!(f, "#{}", self.generation)?;
        }
        Ok(())
    }
}

impl FromStr for SecretId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        decode(s)
    }
}

/// Encodes the identifier for the given parts.
///
/// # Example
///
/// ```
/// use berglas_provider::id::encode;
///
/// assert_eq!(encode("gs://my-bucket/", "api-key", 0), "my-bucket/api-key");
/// assert_eq!(encode("my-bucket", "/api-key/", 3), "my-bucket/api-key#3");
/// ```
pub fn encode(bucket: &str, object: &str, generation: i64) -> String {
    SecretId::new(bucket, object, generation).to_string()
}

/// Explodes an identifier into its parts.
///
/// A leading `gs://` is dropped before splitting, so `gs://b/o` decodes to
/// bucket `b`.
///
/// # Errors
///
/// - [`ProviderError::InvalidId`] if there is no `/` separator
/// - [`ProviderError::InvalidGeneration`] if the `#` suffix is not a
///   base-10 64-bit integer
pub fn decode(id: &str) -> Result<SecretId> {
    let (bucket, remainder) = id
        .strip_prefix("gs://")
        .unwrap_or(id)
        .split_once('/')
        .ok_or_else(|| ProviderError::InvalidId(id.to_string()))?;

    let (object, generation) = match remainder.split_once('#') {
        Some((object, suffix)) => {
            let generation =
                suffix
                    .parse::<i64>()
                    .map_err(|source| ProviderError::InvalidGeneration {
                        value: suffix.to_string(),
                        source,
                    })?;
            (object, generation)
        }
        None => (remainder, 0),
    };

    Ok(SecretId::new(bucket, object, generation))
}

/// Removes any `gs://` prefix and surrounding `/` from a bucket name.
pub fn sanitize_bucket(s: &str) -> &str {
    sanitize_object(s.strip_prefix("gs://").unwrap_or(s))
}

/// Removes surrounding `/` from an object name.
pub fn sanitize_object(s: &str) -> &str {
    s.trim_matches('/')
}
