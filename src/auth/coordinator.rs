//! Reauthentication coordinator.
//!
//! Every authenticated call goes through [`Coordinator::dispatch_with_budget`]:
//!
//! 1. dispatch with the access token currently in the store,
//! 2. on failure classify the error body,
//! 3. on `TokenExpired`, and only while retries remain, renew the access token,
//! 4. retry once with the renewed token; that outcome is final,
//! 5. when renewal fails, terminate the session and return the original error.
//!
//! Renewal is singleflight: concurrent detectors queue on one gate and re-read
//! the store once they hold it, so a token renewed by another task is reused
//! instead of spending the refresh token a second time. Only the task that
//! owns a failed renewal terminates the session.

use super::{
    classify::{AuthFailure, classify_error},
    dispatcher::{ApiRequest, ApiResponse, RequestDispatcher},
    error::{ApiError, RefreshError},
    notifier::{SessionListener, SessionTerminator},
    refresh::TokenRefresher,
};
use crate::session::CredentialStore;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// At most one refresh-and-retry cycle per logical request.
pub const MAX_RETRIES: u8 = 1;

/// The capability every call path adapts to.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// # Errors
    /// Returns the request's final failure after any reauthentication attempt.
    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

#[derive(Debug, PartialEq, Eq)]
enum Renewal {
    /// This task renewed the access token.
    Renewed,
    /// Another task renewed it while this one waited for the gate.
    Reused,
    Failed,
}

pub struct Coordinator {
    store: Arc<CredentialStore>,
    dispatcher: Arc<dyn RequestDispatcher>,
    refresher: Arc<dyn TokenRefresher>,
    terminator: SessionTerminator,
    refresh_gate: Mutex<()>,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        store: Arc<CredentialStore>,
        dispatcher: Arc<dyn RequestDispatcher>,
        refresher: Arc<dyn TokenRefresher>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        let terminator = SessionTerminator::new(store.clone(), listener);

        Self {
            store,
            dispatcher,
            refresher,
            terminator,
            refresh_gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<dyn RequestDispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn terminator(&self) -> &SessionTerminator {
        &self.terminator
    }

    /// Dispatches `request`, renewing the access token and retrying while
    /// `retries_remaining` allows. Values above [`MAX_RETRIES`] are clamped.
    ///
    /// # Errors
    /// - non-expiry failures are returned unchanged,
    /// - a failed renewal returns the original failure after terminating the session,
    /// - a retry that fails with another expiry returns `ApiError::RetryExhausted`.
    #[instrument(skip_all, fields(http.method = %request.method, path = %request.path))]
    pub async fn dispatch_with_budget(
        &self,
        request: &ApiRequest,
        retries_remaining: u8,
    ) -> Result<ApiResponse, ApiError> {
        let mut retries_remaining = retries_remaining.min(MAX_RETRIES);
        let mut retried = false;

        loop {
            let sent_with = self.store.access_token();

            let err = match self.dispatcher.send(request, Some(&sent_with)).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            match classify_error(&err) {
                AuthFailure::TokenExpired => {}
                failure => {
                    debug!(?failure, "not recoverable by refresh");
                    return Err(err);
                }
            }

            if retries_remaining == 0 {
                return Err(if retried { retry_exhausted(err) } else { err });
            }
            retries_remaining -= 1;

            match self.renew(&sent_with).await {
                Renewal::Renewed | Renewal::Reused => {
                    debug!("retrying with renewed access token");
                    retried = true;
                }
                Renewal::Failed => return Err(err),
            }
        }
    }

    async fn renew(&self, sent_with: &SecretString) -> Renewal {
        let _gate = self.refresh_gate.lock().await;

        let current = self.store.snapshot();
        let current_access = current.access_token().expose_secret();

        if !current_access.is_empty() && current_access != sent_with.expose_secret() {
            debug!("access token already renewed");
            return Renewal::Reused;
        }

        let tokens = match self.refresher.refresh(current.refresh_token()).await {
            Ok(tokens) => tokens,
            Err(err) => {
                match err {
                    RefreshError::MissingRefreshToken => warn!("cannot renew session: {err}"),
                    RefreshError::Failed(_) => warn!("{err}"),
                }
                self.terminator.terminate();
                return Renewal::Failed;
            }
        };

        let refresh_token = tokens
            .refresh_token
            .unwrap_or_else(|| current.refresh_token().clone());

        let Some(user) = tokens.user.or_else(|| current.user().cloned()) else {
            warn!("token refresh returned no user record and none is stored");
            self.terminator.terminate();
            return Renewal::Failed;
        };

        // The session may have been signed out while the refresh was in flight.
        match self.store.set_if_current(
            current.refresh_token(),
            user,
            tokens.access_token,
            refresh_token,
        ) {
            Ok(true) => {}
            Ok(false) => {
                info!("session ended during renewal, discarding renewed tokens");
                return Renewal::Failed;
            }
            Err(err) => {
                warn!("failed to store renewed session: {err:#}");
                self.terminator.terminate();
                return Renewal::Failed;
            }
        }

        info!("session renewed");

        Renewal::Renewed
    }
}

#[async_trait]
impl Dispatch for Coordinator {
    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.dispatch_with_budget(&request, MAX_RETRIES).await
    }
}

fn retry_exhausted(err: ApiError) -> ApiError {
    match err {
        ApiError::Http { url, status, body } => ApiError::RetryExhausted { url, status, body },
        other => other,
    }
}
