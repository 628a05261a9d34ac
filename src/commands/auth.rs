//! `fintrack auth` checks that the saved OAuth token can be used and refreshes it when needed.
//! Getting the first token through the browser consent flow is not done here.

use crate::api::TokenProvider;
use crate::commands::Out;
use crate::{Config, Mode, Result};
use anyhow::Context;
use tracing::debug;

/// # Errors
/// Returns an error if the client secret or token file is missing or invalid, or the refresh fails.
pub async fn auth(config: &Config, mode: Mode, force_refresh: bool) -> Result<Out<()>> {
    if mode == Mode::Test {
        debug!("Test mode, using {}", config.test_drive_dir().display());
        return Ok("Running in test mode, no Google token is needed".into());
    }
    let mut token_provider = TokenProvider::load(config.client_secret_path(), config.token_path())
        .await
        .with_context(|| {
            format!(
                "Unable to use the token in {}. Authorize fintrack with Google and save the \
                token there, with the drive.file and drive.appdata scopes",
                config.token_path().display()
            )
        })?;
    if force_refresh {
        token_provider.refresh().await?;
    } else {
        token_provider.token_with_refresh().await?;
    }
    Ok("Google authentication is valid".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_auth_in_test_mode() {
        let env = TestEnv::drive().await;
        let out = auth(&env.config(), Mode::Test, false).await.unwrap();
        assert!(out.message().contains("test mode"));
    }

    #[tokio::test]
    async fn test_auth_without_token_fails() {
        let env = TestEnv::drive().await;
        let err = auth(&env.config(), Mode::Google, false).await.unwrap_err();
        assert!(format!("{err:#}").contains("token"));
    }
}
