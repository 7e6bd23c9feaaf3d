use std::sync::Arc;

use chrono::NaiveDate;

use crate::commands::commands::KeyCommand;
use crate::config::ServiceConfig;
use crate::delivery::{self, console::ConsoleDelivery};
use crate::dispatch::Dispatcher;
use crate::error::RelayError;
use crate::expiry::{Clock, FixedClock, SystemClock};

/// Command: Runs one key command against the key service and prints the rendered reply.
///
/// # Errors
///
/// Returns `RelayError::CommandFailed` when the printed reply is an error reply, and
/// `RelayError::NotDelivered` when the reply could not be written.
///
/// # Arguments
///
/// * `service` - Key service and reply theme settings.
/// * `today` - Optional day to resolve relative expiries from. Defaults to the current UTC date.
/// * `command` - The key command to run.
///
/// # Example
///
/// ```
/// // keyrelay key --api-base https://keys.example.com add ABC-123 1m
/// run_key_command(&service, None, KeyCommand::Add { key: "ABC-123".into(), expiry: "1m".into() }).await?;
/// ```
pub async fn run_key_command(
    service: &ServiceConfig,
    today: Option<NaiveDate>,
    command: KeyCommand,
) -> Result<(), RelayError> {
    let clock: Arc<dyn Clock> = match today {
        Some(day) => Arc::new(FixedClock(day)),
        None => Arc::new(SystemClock),
    };
    let dispatcher = Dispatcher::new(Arc::new(service.key_service()?), clock, service.theme());

    let (console, outcome) = ConsoleDelivery::new(command.into());
    delivery::run(console, Arc::new(dispatcher)).await;

    match outcome.await {
        Ok(false) => Ok(()),
        Ok(true) => Err(RelayError::CommandFailed),
        Err(_) => Err(RelayError::NotDelivered),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::test_utils::upstream;

    fn service(api_base: String) -> ServiceConfig {
        ServiceConfig {
            api_base,
            api_timeout_secs: 2,
            thumbnail_url: None,
            footer: "Relay".to_string(),
            color: 0,
            ephemeral: true,
        }
    }

    #[tokio::test]
    async fn test_success_reply_is_ok() {
        let (base_url, _) = upstream(200, "[]", Duration::ZERO).await;
        let result = run_key_command(&service(base_url), None, KeyCommand::List).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_error_reply_fails_the_command() {
        let (base_url, _) = upstream(500, "down", Duration::ZERO).await;
        let result = run_key_command(&service(base_url), None, KeyCommand::Revoke { key: "A".to_string() }).await;
        assert!(matches!(result, Err(RelayError::CommandFailed)));
    }

    #[tokio::test]
    async fn test_invalid_expiry_fails_the_command() {
        let (base_url, captured) = upstream(200, "{}", Duration::ZERO).await;
        let command = KeyCommand::Add { key: "A".to_string(), expiry: "soon".to_string() };
        let result = run_key_command(&service(base_url), None, command).await;
        assert!(matches!(result, Err(RelayError::CommandFailed)));
        assert!(captured.lock().unwrap().is_empty());
    }
}
