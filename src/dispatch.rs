//! # Dispatch Module
//!
//! Maps a `key` subcommand to one call against the key service and renders the outcome.
//!
//! Each handler returns a `Reply`. Failures never escape `Dispatcher::dispatch`: they are
//! rendered with the theme's error style so the caller always receives exactly one reply.

use std::sync::Arc;

use log::warn;

use crate::adapters::{KeyRecord, KeyService, ValidationResult};
use crate::error::{CommandError, ExpiryError, RemoteError};
use crate::expiry::{format_expiry, is_expired, resolve_expiry, Clock};
use crate::reply::{Reply, Theme};

pub const NO_KEYS_MESSAGE: &str = "No keys found.";

/// One invocation of the `key` command family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandRequest {
    Validate { key: String },
    Add { key: String, expiry: String },
    Revoke { key: String },
    List,
}

impl CommandRequest {
    pub fn subcommand(&self) -> &'static str {
        match self {
            CommandRequest::Validate { .. } => "validate",
            CommandRequest::Add { .. } => "add",
            CommandRequest::Revoke { .. } => "revoke",
            CommandRequest::List => "list",
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum HandlerError {
    #[error(transparent)]
    Expiry(#[from] ExpiryError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub struct Dispatcher {
    service: Arc<dyn KeyService>,
    clock: Arc<dyn Clock>,
    theme: Theme,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn KeyService>, clock: Arc<dyn Clock>, theme: Theme) -> Self {
        Dispatcher { service, clock, theme }
    }

    /// Runs one command and renders its reply.
    ///
    /// # Arguments
    ///
    /// * `command` - The parsed command, or the reason the inbound payload could not be parsed.
    ///
    /// # Returns
    ///
    /// A success reply, or an error-styled reply if anything failed along the way.
    pub async fn dispatch(&self, command: Result<CommandRequest, CommandError>) -> Reply {
        let command = match command {
            Ok(command) => command,
            Err(err) => return self.theme.error(&err),
        };

        let outcome = match command {
            CommandRequest::Validate { key } => self.validate(&key).await,
            CommandRequest::Add { key, expiry } => self.add(&key, &expiry).await,
            CommandRequest::Revoke { key } => self.revoke(&key).await,
            CommandRequest::List => self.list().await,
        };

        outcome.unwrap_or_else(|err| self.theme.error(&err))
    }

    async fn validate(&self, key: &str) -> Result<Reply, HandlerError> {
        let result = self.service.validate(key).await?;
        Ok(self.render_validation(key, &result))
    }

    async fn add(&self, key: &str, expiry: &str) -> Result<Reply, HandlerError> {
        let resolved = format_expiry(resolve_expiry(expiry, self.clock.today())?);
        self.service.add_key(key, &resolved).await?;

        // The reply shows the date computed here, not anything the service echoes back.
        Ok(self.theme.notice(
            "🔑 Key Added",
            format!("Key: `{}`\nExpires: `{}`", key, resolved),
        ))
    }

    async fn revoke(&self, key: &str) -> Result<Reply, HandlerError> {
        self.service.revoke_key(key).await?;
        Ok(self.theme.notice("🚫 Key Revoked", format!("Key: `{}`", key)))
    }

    async fn list(&self) -> Result<Reply, HandlerError> {
        let keys = self.service.list_keys().await?;
        Ok(self.theme.notice("📋 Key List", render_key_list(&keys)))
    }

    fn render_validation(&self, key: &str, result: &ValidationResult) -> Reply {
        if !result.valid {
            let reason = result.reason.as_deref().unwrap_or("No reason given");
            return self.theme.notice("❌ Invalid Key", format!("Reason: {}", reason));
        }

        let expiry = result.expiry.as_deref().unwrap_or("never");
        if is_expired(expiry, self.clock.today()) {
            warn!("Key service reports {} as valid but its expiry {} has passed", key, expiry);
        }
        self.theme.notice(
            "✅ Key is Valid",
            format!("Key: `{}`\nExpires: `{}`", key, expiry),
        )
    }
}

/// One line per record, in the order the service returned them.
pub fn render_key_list(keys: &[KeyRecord]) -> String {
    if keys.is_empty() {
        return NO_KEYS_MESSAGE.to_string();
    }
    keys.iter()
        .map(|record| format!("**{}** — expires `{}`", record.key, record.expiry))
        .collect::<Vec<_>>()
        .join("\n")
}
