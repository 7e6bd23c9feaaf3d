use chrono::NaiveDate;
use clap::Subcommand;

use crate::config::{RegisterConfig, ServerConfig, ServiceConfig};
use crate::dispatch::CommandRequest;

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the interactions endpoint.
    Serve {
        #[command(flatten)]
        service: ServiceConfig,

        #[command(flatten)]
        server: ServerConfig,
    },

    /// Register the `key` command family with the platform.
    Register {
        #[command(flatten)]
        register: RegisterConfig,
    },

    /// Run one key command and print the reply.
    Key {
        #[command(flatten)]
        service: ServiceConfig,

        /// Resolve relative expiries from this day (YYYY-MM-DD) instead of today.
        #[arg(long)]
        today: Option<NaiveDate>,

        #[command(subcommand)]
        command: KeyCommand,
    },
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    /// Validate a key.
    Validate { key: String },

    /// Add a new key. EXPIRY is e.g. 7d, 1w, 1m, 1y or life.
    Add { key: String, expiry: String },

    /// Revoke a key.
    Revoke { key: String },

    /// List all active keys.
    List,
}

impl From<KeyCommand> for CommandRequest {
    fn from(command: KeyCommand) -> Self {
        match command {
            KeyCommand::Validate { key } => CommandRequest::Validate { key },
            KeyCommand::Add { key, expiry } => CommandRequest::Add { key, expiry },
            KeyCommand::Revoke { key } => CommandRequest::Revoke { key },
            KeyCommand::List => CommandRequest::List,
        }
    }
}
