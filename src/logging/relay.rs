//! Provides logging for relayed commands.
//!
//! Every invocation produces one line when the command arrives and one when its reply is ready.
//!
//! # Functions
//! - `log_command`: Logs an incoming command.
//! - `log_reply`: Logs the rendered reply and how long it took.
//! - `log_delivery_failure`: Logs a reply that could not be handed back to the caller.

use chrono::{DateTime, Utc};
use log::{error, info};
use uuid::Uuid;

use crate::dispatch::CommandRequest;
use crate::error::{CommandError, DeliveryError};
use crate::reply::Reply;

const MAX_LOGGED_BODY: usize = 128;

/// Logs the details of an incoming command.
///
/// # Arguments
///
/// * request_id - The unique identifier for the invocation.
/// * req_time - The time the command was received.
/// * source - Where the command came from (client address or `console`).
/// * command - The parsed command, or why it could not be parsed.
///
pub fn log_command(
    request_id: Uuid,
    req_time: DateTime<Utc>,
    source: &str,
    command: &Result<CommandRequest, CommandError>,
) {
    match command {
        Ok(command) => info!(
            "[{}] {} [{}] - Command: key {}, Args: {}",
            req_time.timestamp(),
            request_id,
            source,
            command.subcommand(),
            truncate_body(&describe_arguments(command), MAX_LOGGED_BODY)
        ),
        Err(err) => error!(
            "[{}] {} [{}] - Rejected command: {}",
            req_time.timestamp(),
            request_id,
            source,
            err
        ),
    }
}

/// Logs the reply produced for a command.
///
/// # Arguments
///
/// * request_id - The unique identifier for the invocation.
/// * req_time - The time the command was received.
/// * reply - The rendered reply.
///
pub fn log_reply(request_id: Uuid, req_time: DateTime<Utc>, reply: &Reply) {
    let elapsed = Utc::now().signed_duration_since(req_time).num_milliseconds();
    let log_msg = format!(
        "[{}] {} - Reply: {}, Body: {}, Relay Time: {}ms",
        req_time.timestamp(),
        request_id,
        reply.title,
        truncate_body(&reply.body, MAX_LOGGED_BODY),
        elapsed
    );
    if reply.is_error() {
        error!("{}", log_msg);
    } else {
        info!("{}", log_msg);
    }
}

pub fn log_delivery_failure(request_id: Uuid, err: &DeliveryError) {
    error!("{} - Reply could not be delivered: {}", request_id, err);
}

fn describe_arguments(command: &CommandRequest) -> String {
    match command {
        CommandRequest::Validate { key } | CommandRequest::Revoke { key } => {
            format!("key={}", mask_key(key))
        }
        CommandRequest::Add { key, expiry } => format!("key={} expiry={}", mask_key(key), expiry),
        CommandRequest::List => "-".to_string(),
    }
}

/// Keeps only the last four characters of a license key.
fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

fn truncate_body(body: &str, max_length: usize) -> String {
    match body.char_indices().nth(max_length) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
