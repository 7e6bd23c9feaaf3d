//! Configuration module for the key relay.
//!
//! Every setting can be given as a flag or through the environment variable named next to it.
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use clap::{ArgAction, Args};

use crate::adapters::keyauth::KeyAuthV1;
use crate::auth::InteractionVerifier;
use crate::error::RelayError;
use crate::reply::{Theme, DEFAULT_FOOTER};

/// The key service and the look of every reply.
#[derive(Args, Clone, Debug)]
pub struct ServiceConfig {
    /// Base URL of the key service.
    #[arg(long, env = "KEY_API_BASE")]
    pub api_base: String,

    /// Timeout for each key service request, in seconds.
    /// `serve` rejects values that would outlast the interaction deadline.
    #[arg(long, env = "KEY_API_TIMEOUT_SECS", default_value_t = 2)]
    pub api_timeout_secs: u64,

    /// Thumbnail image shown on every reply.
    #[arg(long, env = "KEY_THUMBNAIL_URL")]
    pub thumbnail_url: Option<String>,

    /// Footer label shown on every reply.
    #[arg(long, env = "KEY_FOOTER", default_value = DEFAULT_FOOTER)]
    pub footer: String,

    /// Reply colour as hex, e.g. 2f3136.
    #[arg(long, env = "KEY_COLOR", default_value = "2f3136", value_parser = parse_color)]
    pub color: u32,

    /// Show replies only to the caller.
    #[arg(long, env = "KEY_EPHEMERAL", default_value_t = true, action = ArgAction::Set)]
    pub ephemeral: bool,
}

impl ServiceConfig {
    pub fn theme(&self) -> Theme {
        Theme {
            color: self.color,
            footer: self.footer.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            ephemeral: self.ephemeral,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Fails when a key service request could outlast `deadline`.
    pub fn check_timeout_within(&self, deadline: Duration) -> Result<(), RelayError> {
        if self.timeout() >= deadline {
            return Err(RelayError::Config(format!(
                "KEY_API_TIMEOUT_SECS must be below {}ms, got {}s",
                deadline.as_millis(),
                self.api_timeout_secs
            )));
        }
        Ok(())
    }

    /// Builds the HTTP adapter for the configured key service.
    pub fn key_service(&self) -> Result<KeyAuthV1, RelayError> {
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(RelayError::Config(format!("KEY_API_BASE is not an http(s) URL: {}", self.api_base)));
        }
        Ok(KeyAuthV1::new(&self.api_base, self.timeout())?)
    }
}

/// The interactions endpoint.
#[derive(Args, Clone, Debug)]
pub struct ServerConfig {
    #[arg(long, env = "RELAY_ADDRESS", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub address: IpAddr,

    #[arg(long, env = "RELAY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Hex-encoded application public key. Signatures are not checked when unset.
    #[arg(long, env = "DISCORD_PUBLIC_KEY")]
    pub public_key: Option<String>,
}

impl ServerConfig {
    pub fn verifier(&self) -> Result<Option<InteractionVerifier>, RelayError> {
        self.public_key.as_deref().map(InteractionVerifier::from_hex).transpose()
    }
}

/// Credentials for registering the command family.
#[derive(Args, Clone, Debug)]
pub struct RegisterConfig {
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: String,

    #[arg(long, env = "DISCORD_CLIENT_ID")]
    pub client_id: String,

    #[arg(long, env = "DISCORD_API_BASE", default_value = "https://discord.com/api/v10")]
    pub platform_api: String,
}

fn parse_color(input: &str) -> Result<u32, String> {
    let digits = input.trim().trim_start_matches('#').trim_start_matches("0x");
    match u32::from_str_radix(digits, 16) {
        Ok(color) if color <= 0xFF_FF_FF => Ok(color),
        _ => Err(format!("`{}` is not a hex RGB colour", input)),
    }
}
