use log::info;
use reqwest::Client;

use crate::config::RegisterConfig;
use crate::delivery::interactions::command_definitions;
use crate::error::RelayError;

/// Command: Registers the `key` command family as global application commands.
///
/// Overwrites whatever commands the application had registered before.
///
/// # Errors
///
/// Returns an error if the request fails or the platform rejects it.
pub async fn register_commands(config: &RegisterConfig) -> Result<(), RelayError> {
    let url = format!(
        "{}/applications/{}/commands",
        config.platform_api.trim_end_matches('/'),
        config.client_id
    );

    info!("Registering slash commands...");
    let response = Client::new()
        .put(&url)
        .header("Authorization", format!("Bot {}", config.token))
        .json(&command_definitions())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RelayError::Registration { status: status.as_u16(), body });
    }
    info!("Slash commands registered.");
    Ok(())
}
