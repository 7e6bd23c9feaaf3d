use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpiryError {
    #[error("Invalid expiry `{0}`: use <number><d|w|m|y> (e.g. 7d, 1w, 1m, 1y) or `life`")]
    InvalidDurationKind(String),

    #[error("Expiry `{0}` is too far in the future")]
    DurationOutOfRange(String),
}

/// Any failure talking to the remote key service.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Key service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Parsing(#[from] serde_json::Error),
}

/// An inbound payload that could not be turned into a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("Missing required option: {0}")]
    MissingOption(&'static str),
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Caller is no longer waiting for a reply")]
    Closed,

    #[error("Key service did not answer within {0}ms")]
    Deadline(u128),

    #[error("Failed to write reply: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that stop the process at startup.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Server(#[from] hyper::Error),

    #[error("Command registration rejected with {status}: {body}")]
    Registration { status: u16, body: String },

    #[error("Command failed")]
    CommandFailed,

    #[error("Reply was not delivered")]
    NotDelivered,
}
