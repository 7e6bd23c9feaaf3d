//!
//! Adapters for the remote key service.
//!
//! The dispatcher only sees the `KeyService` trait; `keyauth::KeyAuthV1` is the HTTP
//! implementation used at runtime.
//!
pub mod keyauth;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::RemoteError;

/// One key as returned by `/list-keys`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct KeyRecord {
    pub key: String,
    pub expiry: String,
}

/// The answer from `/validate`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Outbound calls to the key service. Each method is exactly one HTTP request.
#[async_trait]
pub trait KeyService: Send + Sync {
    async fn validate(&self, key: &str) -> Result<ValidationResult, RemoteError>;

    async fn add_key(&self, key: &str, expiry: &str) -> Result<(), RemoteError>;

    async fn revoke_key(&self, key: &str) -> Result<(), RemoteError>;

    async fn list_keys(&self) -> Result<Vec<KeyRecord>, RemoteError>;
}
