//! Berglas provider - manage Berglas secrets as declarative resources.
//!
//! Berglas stores secrets as objects in a Cloud Storage bucket, encrypted with
//! a Cloud KMS key. This crate exposes those secrets to an
//! infrastructure-as-code host as a `berglas_secret` resource and a
//! `berglas_secret` data source.
//!
//! # Features
//!
//! - **Declarative Resources**: create, read, update, delete and import secrets
//! - **Generation Tracking**: resource ids pin the object generation they describe
//! - **Flexible Authentication**: access token, credentials JSON or default credentials
//! - **Cancellation**: every backend call honors the caller's token and provider stop
//! - **Diagnostics**: errors carry their full context chain to the host
//!
//! # Quick Start
//!
//! ```no_run
//! use berglas_provider::backends::memory::MemoryBackend;
//! use berglas_provider::factory::FnFactory;
//! use berglas_provider::Provider;
//! use serde_json::json;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let factory = FnFactory::new(|_tokens| Ok(Arc::new(MemoryBackend::new())));
//!     let provider = Provider::new("0.1.0", Arc::new(factory));
//!
//!     // Credentials may also come from GOOGLE_OAUTH_ACCESS_TOKEN and friends
//!     provider.configure(json!({})).await.expect("configure");
//!
//!     let ctx = CancellationToken::new();
//!     let state = provider
//!         .create(
//!             "berglas_secret",
//!             &ctx,
//!             json!({
//!                 "bucket": "my-secrets",
//!                 "name": "api-key",
//!                 "key": "projects/p/locations/global/keyRings/r/cryptoKeys/k",
//!                 "plaintext": "sk-secret123",
//!             }),
//!         )
//!         .await
//!         .expect("create");
//!
//!     println!("created {}", state["id"]);
//! }
//! ```
//!
//! # Resource Identifiers
//!
//! Ids have the form `{bucket}/{object}#{generation}`; the `#{generation}`
//! suffix is omitted when the generation is 0. See [`id`].
//!
//! # Feature Flags
//!
//! | Feature | Default | Notes |
//! |---------|---------|-------|
//! | `memory` | yes | In-memory backend for tests and local experiments |

pub mod backend;
pub mod backends;
pub mod config;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod id;
pub mod meta;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod secret;
pub mod state;

pub use backend::Backend;
pub use config::ProviderSettings;
pub use error::{Diagnostic, Diagnostics, ProviderError, Result, ResultExt, Severity};
pub use factory::{ClientFactory, FnFactory};
pub use id::SecretId;
pub use meta::ProviderMeta;
pub use provider::Provider;
pub use secret::Secret;
pub use state::ResourceData;
