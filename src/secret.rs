//! Secret data structures exchanged with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A snapshot of one generation of a secret object.
///
/// The plaintext is held in memory only as long as the snapshot lives and is
/// never included in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    /// Bucket holding the secret object
    pub parent: String,

    /// Object name within the bucket
    pub name: String,

    /// Fully-qualified Cloud KMS key used to encrypt the data key
    #[serde(rename = "kms_key")]
    pub kms_key: String,

    /// Decrypted contents
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub plaintext: Vec<u8>,

    /// Object generation
    pub generation: i64,

    /// Object metadata generation
    pub metageneration: i64,

    /// When this generation was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Secret {
    /// Returns the plaintext as UTF-8, replacing invalid sequences.
    pub fn plaintext_lossy(&self) -> String {
        String::from_utf8_lossy(&self.plaintext).into_owned()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("parent", &self.parent)
            .field("name", &self.name)
            .field("kms_key", &self.kms_key)
            .field("plaintext", &"[REDACTED]")
            .field("generation", &self.generation)
            .field("metageneration", &self.metageneration)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Request to store a new secret.
#[derive(Clone)]
pub struct CreateRequest {
    /// Destination bucket
    pub bucket: String,
    /// Object name
    pub object: String,
    /// Fully-qualified Cloud KMS key
    pub key: String,
    /// Contents to encrypt
    pub plaintext: Vec<u8>,
}

/// Request to read and decrypt a secret.
#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    /// Bucket holding the secret
    pub bucket: String,
    /// Object name
    pub object: String,
    /// Specific generation, or `0` for latest
    pub generation: i64,
}

/// Request to overwrite a secret's contents.
#[derive(Clone)]
pub struct UpdateRequest {
    /// Bucket holding the secret
    pub bucket: String,
    /// Object name
    pub object: String,
    /// Expected current generation, or `0` to skip the check
    pub generation: i64,
    /// Expected current metageneration, or `0` to skip the check
    pub metageneration: i64,
    /// Fully-qualified Cloud KMS key
    pub key: String,
    /// New contents
    pub plaintext: Vec<u8>,
}

/// Request to remove a secret and all of its generations.
#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    /// Bucket holding the secret
    pub bucket: String,
    /// Object name
    pub object: String,
}

impl fmt::Debug for CreateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateRequest")
            .field("bucket", &self.bucket)
            .field("object", &self.object)
            .field("key", &self.key)
            .field("plaintext", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for UpdateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRequest")
            .field("bucket", &self.bucket)
            .field("object", &self.object)
            .field("generation", &self.generation)
            .field("metageneration", &self.metageneration)
            .field("key", &self.key)
            .field("plaintext", &"[REDACTED]")
            .finish()
    }
}
