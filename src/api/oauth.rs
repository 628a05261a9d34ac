//! Provides the OAuth bearer token used for Google Drive calls.
//!
//! The interactive consent flow is not handled here: a `token.json` obtained elsewhere must already
//! exist. This module loads it, validates its scopes, and refreshes it through the token endpoint
//! when it is about to expire.

use crate::api::files::{File, SecretFile, TokenFile};
use crate::Result;
use anyhow::Context;
use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use std::path::Path;
use tracing::{debug, info};

/// Used when the token endpoint does not say how long a new access token lives.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Loads the client credentials and the saved token.
    ///
    /// # Errors
    /// Returns an error if either file is missing or unreadable, or if the token lacks a required
    /// scope.
    pub(crate) async fn load(secret_path: impl AsRef<Path>, token_path: impl AsRef<Path>) -> Result<Self> {
        let secret_path = secret_path.as_ref();
        let token_path = token_path.as_ref();
        let secret: File<SecretFile> = File::load(secret_path).await.with_context(|| {
            format!(
                "Unable to load the OAuth client credentials at {}",
                secret_path.display()
            )
        })?;
        let token: File<TokenFile> = File::load(token_path)
            .await
            .with_context(|| format!("Unable to load the OAuth token at {}", token_path.display()))?;
        token.data().validate_scopes()?;
        Ok(Self {
            secret: secret.data().clone(),
            token,
        })
    }

    /// The current access token, which may be expired.
    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// Returns an access token, refreshing it first if it has expired or is about to.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token())
    }

    /// Exchanges the refresh token for a new access token and saves it to the token file.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        debug!("Refreshing the OAuth access token");
        let token_url = TokenUrl::new(self.secret.token_uri().to_string())
            .context("The token_uri in the client secret file is not a valid URL")?;
        let client = BasicClient::new(ClientId::new(self.secret.client_id().to_string()))
            .set_client_secret(ClientSecret::new(self.secret.client_secret().to_string()))
            .set_token_uri(token_url);

        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Unable to build the HTTP client")?;

        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&http_client)
            .await
            .context("Failed to refresh the OAuth token, you may need to re-authorize")?;

        let lifetime = response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            Utc::now() + lifetime,
            response.refresh_token().map(|t| t.secret().to_string()),
        );
        self.token.save().await?;
        info!(
            "OAuth token refreshed, valid until {} (saved to {})",
            self.token.data().expires_at(),
            self.token.path().display()
        );
        Ok(())
    }
}
