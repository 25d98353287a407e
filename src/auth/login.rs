//! Session lifecycle entry points: sign in, fetch the profile, sign out. The
//! manager wires the store, dispatcher, refresher and coordinator together for
//! callers that only hold a [`ClientConfig`].

use super::{
    coordinator::{Coordinator, Dispatch},
    dispatcher::{ApiRequest, HttpDispatcher, http_client},
    error::ApiError,
    notifier::SessionListener,
    refresh::HttpTokenRefresher,
};
use crate::{
    config::ClientConfig,
    session::{CredentialStorage, CredentialStore, Session, UserRecord},
};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access: String,
    #[serde(default)]
    refresh: String,
    #[serde(default)]
    user: Option<UserRecord>,
}

pub struct SessionManager {
    config: ClientConfig,
    coordinator: Arc<Coordinator>,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: ClientConfig, coordinator: Arc<Coordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    /// Loads the persisted session and builds the HTTP stack for `config`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn connect(
        config: ClientConfig,
        storage: Arc<dyn CredentialStorage>,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Self> {
        let client = http_client(&config)?;
        let store = Arc::new(CredentialStore::load(storage));
        let dispatcher = Arc::new(HttpDispatcher::with_client(client.clone(), &config));
        let refresher = Arc::new(HttpTokenRefresher::with_client(client, &config));
        let coordinator = Arc::new(Coordinator::new(store, dispatcher, refresher, listener));

        Ok(Self::new(config, coordinator))
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.coordinator.store().snapshot()
    }

    /// Exchanges credentials for a token pair and stores the new session. The
    /// profile is fetched when the login response does not carry it. On
    /// failure the stored session is left untouched.
    ///
    /// # Errors
    /// Returns the login or profile failure, `Decode` when tokens are missing,
    /// or `Storage` when the session cannot be persisted.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<UserRecord, ApiError> {
        let dispatcher = self.coordinator.dispatcher();

        let request = ApiRequest::post(
            self.config.login_path.as_str(),
            json!({
                "email": email,
                "password": password.expose_secret()
            }),
        );

        let response: LoginResponse = dispatcher.send(&request, None).await?.json()?;

        if response.access.is_empty() || response.refresh.is_empty() {
            return Err(ApiError::Decode(
                "Error parsing JSON response: no token pair found".to_string(),
            ));
        }

        let access_token = SecretString::from(response.access);
        let refresh_token = SecretString::from(response.refresh);

        let user = match response.user {
            Some(user) => user,
            None => {
                let profile = ApiRequest::get(self.config.profile_path.as_str());
                dispatcher.send(&profile, Some(&access_token)).await?.json()?
            }
        };

        self.coordinator
            .store()
            .set(user.clone(), access_token, refresh_token)
            .map_err(|err| ApiError::Storage(format!("{err:#}")))?;

        info!(user.id = %user.id, "signed in");

        Ok(user)
    }

    /// Fetches the profile through the coordinator and replaces the stored
    /// user record wholesale.
    ///
    /// # Errors
    /// Returns the request failure, `Decode` for an unexpected body, or
    /// `Storage` when the session cannot be persisted.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<UserRecord, ApiError> {
        let response = self
            .coordinator
            .dispatch(ApiRequest::get(self.config.profile_path.as_str()))
            .await?;
        let user: UserRecord = response.json()?;

        // Read the tokens after the call: it may have renewed them.
        let store = self.coordinator.store();
        store
            .set(user.clone(), store.access_token(), store.refresh_token())
            .map_err(|err| ApiError::Storage(format!("{err:#}")))?;

        Ok(user)
    }

    /// User-initiated sign out. Returns whether a session was cleared.
    pub fn logout(&self) -> bool {
        self.coordinator.terminator().sign_out()
    }
}
