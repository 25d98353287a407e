//! Typed JSON client for the console API. This is the data-fetching call path:
//! it never handles tokens itself and goes through a [`Dispatch`] capability,
//! normally the reauthentication coordinator.
//!
//! GET results can be memoized with [`ApiClient::get_cached`]. Cached entries
//! belong to the signed-in user and are dropped as soon as the observed
//! session ends or changes hands.

use crate::{
    auth::{ApiError, ApiRequest, Dispatch},
    session::Session,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Default)]
struct QueryCache {
    owner: Option<String>,
    entries: HashMap<String, Value>,
}

pub struct ApiClient {
    dispatch: Arc<dyn Dispatch>,
    session: Mutex<watch::Receiver<Session>>,
    cache: Mutex<QueryCache>,
}

impl ApiClient {
    #[must_use]
    pub fn new(dispatch: Arc<dyn Dispatch>, session: watch::Receiver<Session>) -> Self {
        let owner = session_owner(&session.borrow());

        Self {
            dispatch,
            session: Mutex::new(session),
            cache: Mutex::new(QueryCache {
                owner,
                entries: HashMap::new(),
            }),
        }
    }

    /// # Errors
    /// Returns the request failure or `Decode` for an unexpected body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.dispatch.dispatch(ApiRequest::get(path)).await?.json()
    }

    /// # Errors
    /// Returns the request failure or `Decode` for an unexpected body.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|err| ApiError::Request(format!("Failed to encode request: {err}")))?;
        let value = self
            .dispatch
            .dispatch(ApiRequest::post(path, body))
            .await?
            .json()?;
        self.invalidate(path);
        Ok(value)
    }

    /// # Errors
    /// Returns the request failure.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.dispatch.dispatch(ApiRequest::delete(path)).await?;
        self.invalidate(path);
        Ok(())
    }

    /// Like [`ApiClient::get_json`], but serves repeated reads of `path` from
    /// the cache while the same user stays signed in.
    ///
    /// # Errors
    /// Returns the request failure or `Decode` for an unexpected body.
    pub async fn get_cached<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let owner = self.sync_owner();

        let cached = self.cache().entries.get(path).cloned();

        let value = match cached {
            Some(value) => {
                debug!(path, "query cache hit");
                value
            }
            None => {
                let value: Value = self.get_json(path).await?;
                // Another user may have signed in while the request was pending.
                if self.sync_owner() == owner {
                    self.cache().entries.insert(path.to_string(), value.clone());
                } else {
                    debug!(path, "session changed during fetch, not caching");
                }
                value
            }
        };

        serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// Drops cached entries whose path starts with `prefix`.
    pub fn invalidate(&self, prefix: &str) {
        self.cache()
            .entries
            .retain(|path, _| !path.starts_with(prefix));
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, QueryCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops the cache when the session changed hands and returns its owner.
    fn sync_owner(&self) -> Option<String> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        if !session.has_changed().unwrap_or(false) {
            return self.cache().owner.clone();
        }

        let owner = session_owner(&session.borrow_and_update());
        let mut cache = self.cache();

        if cache.owner != owner {
            debug!(entries = cache.entries.len(), "session changed, dropping query cache");
            cache.entries.clear();
            cache.owner.clone_from(&owner);
        }

        owner
    }
}

fn session_owner(session: &Session) -> Option<String> {
    session
        .is_authenticated()
        .then(|| session.user().map(|user| user.id.clone()))
        .flatten()
}
