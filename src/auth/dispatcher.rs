//! Request dispatcher: sends one request with the bearer token it is given and
//! hands back the raw outcome. It never interprets a 401; the full error body
//! is passed up so the coordinator can classify it.

use super::error::ApiError;
use crate::{APP_USER_AGENT, config::ClientConfig};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{Instrument, debug, info_span};

/// A logical request. It is cloned as-is when the coordinator retries it.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// # Errors
    /// Returns `ApiError::Decode` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };

        serde_json::from_str(body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Sends `request`, attaching `access_token` as a bearer credential when it
    /// is non-empty.
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&SecretString>,
    ) -> Result<ApiResponse, ApiError>;
}

/// # Errors
/// Returns an error if the HTTP client cannot be initialized.
pub fn http_client(config: &ClientConfig) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(config.timeout)
        .build()?)
}

/// Maps reqwest failures into transport or timeout errors.
pub(crate) fn map_request_error(err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(err.to_string())
    } else if err.is_builder() {
        ApiError::Request(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

pub struct HttpDispatcher {
    client: Client,
    config: ClientConfig,
}

impl HttpDispatcher {
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            config: config.clone(),
        })
    }

    #[must_use]
    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl RequestDispatcher for HttpDispatcher {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&SecretString>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.config.endpoint(&request.path);

        let mut builder = self.client.request(request.method.clone(), &url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(token) = access_token.filter(|t| !t.expose_secret().is_empty()) {
            builder = builder.bearer_auth(token.expose_secret());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let span = info_span!(
            "api.request",
            http.method = %request.method,
            url = %url
        );
        let response = builder
            .send()
            .instrument(span)
            .await
            .map_err(|err| map_request_error(&err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| map_request_error(&err))?;

        debug!(status = status.as_u16(), "{} {}", request.method, url);

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ApiError::Http {
                url,
                status: status.as_u16(),
                body,
            })
        }
    }
}
