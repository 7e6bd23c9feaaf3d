//! One-shot delivery for the `key` CLI subcommand: a single command in, the rendered reply out.

use std::io::Write;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::delivery::{Delivery, Invocation, ReplySink};
use crate::dispatch::CommandRequest;
use crate::error::DeliveryError;
use crate::reply::Reply;

pub struct ConsoleDelivery {
    pending: Option<(CommandRequest, oneshot::Sender<bool>)>,
}

impl ConsoleDelivery {
    /// Returns the delivery and a receiver that yields `true` once an error reply has been
    /// printed. The receiver errors if nothing was printed.
    pub fn new(command: CommandRequest) -> (Self, oneshot::Receiver<bool>) {
        let (outcome, receiver) = oneshot::channel();
        (ConsoleDelivery { pending: Some((command, outcome)) }, receiver)
    }
}

#[async_trait]
impl Delivery for ConsoleDelivery {
    async fn receive(&mut self) -> Option<Invocation> {
        let (command, outcome) = self.pending.take()?;
        let sink = ConsoleSink { out: Box::new(std::io::stdout()), outcome: Some(outcome) };
        Some(Invocation::new("console", Ok(command), Box::new(sink)))
    }
}

/// Writes the reply as plain text, then reports whether it was an error.
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
    outcome: Option<oneshot::Sender<bool>>,
}

#[async_trait]
impl ReplySink for ConsoleSink {
    async fn send(self: Box<Self>, reply: Reply) -> Result<(), DeliveryError> {
        let ConsoleSink { mut out, outcome } = *self;
        writeln!(out, "{}", reply.to_plain_text())?;
        out.flush()?;
        if let Some(outcome) = outcome {
            let _ = outcome.send(reply.is_error());
        }
        Ok(())
    }
}
