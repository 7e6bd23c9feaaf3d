//! # Delivery Module
//!
//! The seam between the messaging platform and the dispatcher.
//!
//! A `Delivery` hands out invocations; each invocation carries its own `ReplySink` so the reply
//! goes back to exactly the caller that sent the command.
//!
//! ## Functions
//! - `run`: Pulls invocations until the delivery is exhausted and relays each on its own task.

pub mod console;
pub mod interactions;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::error;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::dispatch::{CommandRequest, Dispatcher};
use crate::error::{CommandError, DeliveryError};
use crate::logging::relay::{log_command, log_delivery_failure, log_reply};
use crate::reply::Reply;

/// Sends one reply back to the caller that issued the command.
#[async_trait]
pub trait ReplySink: Send {
    async fn send(self: Box<Self>, reply: Reply) -> Result<(), DeliveryError>;
}

/// A source of invocations. `None` means no more commands will arrive.
#[async_trait]
pub trait Delivery: Send {
    async fn receive(&mut self) -> Option<Invocation>;
}

pub struct Invocation {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub source: String,
    pub command: Result<CommandRequest, CommandError>,
    pub reply_to: Box<dyn ReplySink>,
}

impl Invocation {
    pub fn new(
        source: impl Into<String>,
        command: Result<CommandRequest, CommandError>,
        reply_to: Box<dyn ReplySink>,
    ) -> Self {
        Invocation {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            source: source.into(),
            command,
            reply_to,
        }
    }
}

/// Relays invocations from `delivery` through `dispatcher` until the delivery closes.
///
/// Invocations run concurrently on their own tasks. Returns once the delivery is exhausted and
/// every outstanding reply has been handed to its sink.
pub async fn run<D: Delivery>(mut delivery: D, dispatcher: Arc<Dispatcher>) {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            next = delivery.receive() => match next {
                Some(invocation) => {
                    tasks.spawn(relay(invocation, Arc::clone(&dispatcher)));
                }
                None => break,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(err) = joined {
                    error!("Relay task failed: {}", err);
                }
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            error!("Relay task failed: {}", err);
        }
    }
}

async fn relay(invocation: Invocation, dispatcher: Arc<Dispatcher>) {
    let Invocation { id, received_at, source, command, reply_to } = invocation;

    log_command(id, received_at, &source, &command);
    let reply = dispatcher.dispatch(command).await;
    log_reply(id, received_at, &reply);

    if let Err(err) = reply_to.send(reply).await {
        log_delivery_failure(id, &err);
    }
}
