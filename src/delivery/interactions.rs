//!
//! Delivery through the platform's HTTP interactions endpoint.
//!
//! The HTTP server parses each interaction, queues it as an `Invocation` and waits on a oneshot
//! channel for the reply, which it then renders as the interaction response.
//!
//! Functions:
//! - `queue`: Creates the sender used by the server and the `Delivery` consumed by the relay loop.
//! - `parse_command`: Turns interaction command data into a `CommandRequest`.
//! - `render_response`: Renders a `Reply` as an interaction response body.
//! - `command_definitions`: The `key` command family as registered with the platform.
//!
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use crate::delivery::{Delivery, Invocation, ReplySink};
use crate::dispatch::CommandRequest;
use crate::error::{CommandError, DeliveryError};
use crate::reply::Reply;

pub const COMMAND_NAME: &str = "key";

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
const FLAG_EPHEMERAL: u64 = 1 << 6;

const OPTION_SUB_COMMAND: u8 = 1;
const OPTION_STRING: u8 = 3;

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<CommandData>,
}

#[derive(Debug, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

/// Parses the data of an application command interaction.
///
/// # Arguments
///
/// * `data` - The `data` object of the interaction.
///
/// # Returns
///
/// The command, or a `CommandError` naming what was wrong with it.
pub fn parse_command(data: &CommandData) -> Result<CommandRequest, CommandError> {
    if data.name != COMMAND_NAME {
        return Err(CommandError::UnknownCommand(data.name.clone()));
    }
    let sub = data
        .options
        .first()
        .ok_or_else(|| CommandError::UnknownSubcommand(String::new()))?;

    match sub.name.as_str() {
        "validate" => Ok(CommandRequest::Validate { key: string_option(sub, "key")? }),
        "add" => Ok(CommandRequest::Add {
            key: string_option(sub, "key")?,
            expiry: string_option(sub, "expiry")?,
        }),
        "revoke" => Ok(CommandRequest::Revoke { key: string_option(sub, "key")? }),
        "list" => Ok(CommandRequest::List),
        other => Err(CommandError::UnknownSubcommand(other.to_string())),
    }
}

fn string_option(sub: &CommandOption, name: &'static str) -> Result<String, CommandError> {
    sub.options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_ref())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(CommandError::MissingOption(name))
}

/// The response to a `PING` interaction.
pub fn pong() -> Value {
    json!({ "type": RESPONSE_PONG })
}

/// Renders a reply as a channel message response, ephemeral when the reply asks for it.
pub fn render_response(reply: &Reply) -> Value {
    let mut data = json!({ "embeds": [reply.to_embed()] });
    if reply.ephemeral {
        data["flags"] = json!(FLAG_EPHEMERAL);
    }
    json!({ "type": RESPONSE_CHANNEL_MESSAGE, "data": data })
}

/// The `key` command family with its four subcommands.
pub fn command_definitions() -> Value {
    let string_arg = |name: &str, description: &str| {
        json!({ "type": OPTION_STRING, "name": name, "description": description, "required": true })
    };
    let subcommand = |name: &str, description: &str, options: Vec<Value>| {
        json!({ "type": OPTION_SUB_COMMAND, "name": name, "description": description, "options": options })
    };

    json!([{
        "name": COMMAND_NAME,
        "description": "Key management",
        "options": [
            subcommand("validate", "Validate a key", vec![string_arg("key", "The license key")]),
            subcommand("add", "Add a new key", vec![
                string_arg("key", "Key to add"),
                string_arg("expiry", "Expiry (e.g. 7d, 1w, 1m, 1y, life)"),
            ]),
            subcommand("revoke", "Revoke a key", vec![string_arg("key", "Key to revoke")]),
            subcommand("list", "List all active keys", vec![]),
        ],
    }])
}

/// Hands the reply back to the HTTP handler waiting on the interaction.
pub struct ResponseSink(oneshot::Sender<Reply>);

#[async_trait]
impl ReplySink for ResponseSink {
    async fn send(self: Box<Self>, reply: Reply) -> Result<(), DeliveryError> {
        self.0.send(reply).map_err(|_| DeliveryError::Closed)
    }
}

/// The server side of the queue.
#[derive(Clone)]
pub struct InteractionQueue(mpsc::Sender<Invocation>);

impl InteractionQueue {
    /// Queues a command and returns the receiver its reply will arrive on.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Closed` if the relay loop has stopped.
    pub async fn submit(
        &self,
        source: String,
        command: Result<CommandRequest, CommandError>,
    ) -> Result<oneshot::Receiver<Reply>, DeliveryError> {
        let (sender, receiver) = oneshot::channel();
        let invocation = Invocation::new(source, command, Box::new(ResponseSink(sender)));
        self.0.send(invocation).await.map_err(|_| DeliveryError::Closed)?;
        Ok(receiver)
    }
}

pub struct InteractionDelivery(mpsc::Receiver<Invocation>);

#[async_trait]
impl Delivery for InteractionDelivery {
    async fn receive(&mut self) -> Option<Invocation> {
        self.0.recv().await
    }
}

pub fn queue(capacity: usize) -> (InteractionQueue, InteractionDelivery) {
    let (sender, receiver) = mpsc::channel(capacity);
    (InteractionQueue(sender), InteractionDelivery(receiver))
}
