//! Token refresh protocol: one `POST` to the renewal endpoint trading a refresh
//! token for a new access token. An authorization failure here is terminal;
//! this call never goes through the coordinator.

use super::{dispatcher::http_client, error::RefreshError};
use crate::{config::ClientConfig, session::UserRecord};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{Instrument, debug, info_span};

#[derive(Clone, Debug)]
pub struct RefreshedTokens {
    pub access_token: SecretString,
    /// Present when the server rotates refresh tokens.
    pub refresh_token: Option<SecretString>,
    pub user: Option<UserRecord>,
}

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// # Errors
    /// `MissingRefreshToken` for an empty token (no network call is made),
    /// `Failed` for any other failure.
    async fn refresh(&self, refresh_token: &SecretString) -> Result<RefreshedTokens, RefreshError>;
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    user: Option<UserRecord>,
}

pub struct HttpTokenRefresher {
    client: Client,
    url: String,
}

impl HttpTokenRefresher {
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_client(http_client(config)?, config))
    }

    #[must_use]
    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            url: config.endpoint(&config.refresh_path),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &SecretString) -> Result<RefreshedTokens, RefreshError> {
        if refresh_token.expose_secret().is_empty() {
            return Err(RefreshError::MissingRefreshToken);
        }

        let payload = json!({
            "refresh": refresh_token.expose_secret()
        });

        let span = info_span!(
            "auth.refresh_token",
            http.method = "POST",
            url = %self.url
        );
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .instrument(span)
            .await
            .map_err(|err| RefreshError::Failed(format!("{} - {err}", self.url)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RefreshError::Failed(format!("{} - {err}", self.url)))?;

        if !status.is_success() {
            return Err(RefreshError::Failed(format!(
                "{} - {}, {}",
                self.url,
                status,
                body.trim().chars().take(200).collect::<String>()
            )));
        }

        let response: RefreshResponse = serde_json::from_str(&body).map_err(|err| {
            RefreshError::Failed(format!("Error parsing JSON response: {err}"))
        })?;

        let access_token = response
            .access
            .filter(|access| !access.is_empty())
            .ok_or_else(|| {
                RefreshError::Failed("Error parsing JSON response: no access token found".into())
            })?;

        debug!(
            rotated = response.refresh.is_some(),
            with_user = response.user.is_some(),
            "access token renewed"
        );

        Ok(RefreshedTokens {
            access_token: SecretString::from(access_token),
            refresh_token: response
                .refresh
                .filter(|refresh| !refresh.is_empty())
                .map(SecretString::from),
            user: response.user,
        })
    }
}
