//!
//! This module provides the HTTP adapter for the KeyAuth v1 key service.
//!
//! Functions:
//! - `KeyAuthV1::new`: Creates a client bound to a base URL with a request timeout.
//! - `KeyService` impl: `/validate`, `/add-key`, `/revoke-key` and `/list-keys`.
//!
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::json;

use crate::adapters::{KeyRecord, KeyService, ValidationResult};
use crate::error::RemoteError;

pub struct KeyAuthV1 {
    client: Client,
    base_url: String,
}

impl KeyAuthV1 {
    /// Creates a new KeyAuth v1 adapter.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root of the key service, e.g. `https://keys.example.com`. A trailing slash is ignored.
    /// * `timeout` - Upper bound for each request, connect through body.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("keyrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(KeyAuthV1 {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request and reads the whole body, whatever the status.
    async fn exchange(&self, request: RequestBuilder) -> Result<(StatusCode, String), RemoteError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("Key service answered {} ({} bytes)", status, body.len());
        Ok((status, body))
    }
}

/// Turns a non-2xx status into an error carrying the body text.
fn check_status(status: StatusCode, body: String) -> Result<String, RemoteError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(RemoteError::Status { status: status.as_u16(), body })
    }
}

#[async_trait]
impl KeyService for KeyAuthV1 {
    async fn validate(&self, key: &str) -> Result<ValidationResult, RemoteError> {
        let (status, body) = self
            .exchange(self.client.post(self.url("/validate")).json(&json!({ "key": key })))
            .await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }
        // A rejection the service explains is still an answer, not a failure.
        match serde_json::from_str::<ValidationResult>(&body) {
            Ok(result) if !result.valid => Ok(result),
            _ => Err(RemoteError::Status { status: status.as_u16(), body }),
        }
    }

    async fn add_key(&self, key: &str, expiry: &str) -> Result<(), RemoteError> {
        let (status, body) = self
            .exchange(
                self.client
                    .post(self.url("/add-key"))
                    .json(&json!({ "key": key, "expiry": expiry })),
            )
            .await?;
        check_status(status, body).map(|_| ())
    }

    async fn revoke_key(&self, key: &str) -> Result<(), RemoteError> {
        let (status, body) = self
            .exchange(self.client.post(self.url("/revoke-key")).json(&json!({ "key": key })))
            .await?;
        check_status(status, body).map(|_| ())
    }

    async fn list_keys(&self) -> Result<Vec<KeyRecord>, RemoteError> {
        let (status, body) = self.exchange(self.client.get(self.url("/list-keys"))).await?;
        let body = check_status(status, body)?;
        Ok(serde_json::from_str(&body)?)
    }
}
