mod adapters;
mod auth;
mod client;
mod commands;
mod config;
mod delivery;
mod dispatch;
mod error;
mod expiry;
mod logging;
mod reply;
mod server;
#[cfg(test)]
mod test_utils;

use std::process::ExitCode;

use clap::Parser;
use log::error;

use crate::commands::commands::Commands;
use crate::error::RelayError;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        // Interactions endpoint.
        Commands::Serve { service, server } => server::start_server(&service, &server).await,

        // Slash command registration.
        Commands::Register { register } => commands::register::register_commands(&register).await,

        // One-off command from the terminal.
        Commands::Key { service, today, command } => {
            commands::keys::run_key_command(&service, today, command).await
        }
    };

    exit_code(result)
}

fn exit_code(result: Result<(), RelayError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
