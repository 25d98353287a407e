//! Client configuration: where the API lives, which paths issue and renew
//! tokens, and where the session is persisted. Values are public; secrets
//! never live here.

use anyhow::{Result, anyhow};
use std::{path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_LOGIN_PATH: &str = "/api/token/";
pub const DEFAULT_REFRESH_PATH: &str = "/api/token/refresh/";
pub const DEFAULT_PROFILE_PATH: &str = "/api/users/me/";
/// Default request timeout applied to every outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: Url,
    pub login_path: String,
    pub refresh_path: String,
    pub profile_path: String,
    pub timeout: Duration,
    pub state_file: PathBuf,
}

impl ClientConfig {
    /// # Errors
    /// Returns an error if `api_url` cannot be parsed, has no host, or uses an unsupported scheme.
    pub fn new(api_url: &str, state_file: impl Into<PathBuf>) -> Result<Self> {
        let api_url = Url::parse(api_url.trim())?;

        match api_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(anyhow!("Error parsing URL: unsupported scheme {scheme}")),
        }

        if api_url.host().is_none() {
            return Err(anyhow!("Error parsing URL: no host specified"));
        }

        Ok(Self {
            api_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            profile_path: DEFAULT_PROFILE_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            state_file: state_file.into(),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Joins `path` onto the API base URL, keeping any base path prefix.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        endpoint_url(self.api_url.as_str(), path)
    }
}

/// Joins a base URL and a path with exactly one slash between them.
#[must_use]
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};

    #[test]
    fn endpoint_keeps_base_path() -> Result<()> {
        let config = ClientConfig::new("https://billing.example.com/console/", "/tmp/s.json")?;
        assert_eq!(
            config.endpoint(DEFAULT_REFRESH_PATH),
            "https://billing.example.com/console/api/token/refresh/"
        );
        Ok(())
    }

    #[test]
    fn endpoint_handles_missing_slashes() {
        assert_eq!(
            endpoint_url("http://localhost:8000", "api/bills/?page=2"),
            "http://localhost:8000/api/bills/?page=2"
        );
        assert_eq!(endpoint_url("", "/api/bills/"), "/api/bills/");
    }

    #[test]
    fn new_rejects_unsupported_scheme() -> Result<()> {
        let err = ClientConfig::new("ftp://example.com", "/tmp/s.json")
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert!(err.to_string().contains("unsupported scheme"));
        Ok(())
    }

    #[test]
    fn new_applies_defaults() -> Result<()> {
        let config = ClientConfig::new("http://localhost:8000", "/tmp/s.json")?;
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
        assert_eq!(config.profile_path, DEFAULT_PROFILE_PATH);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);

        let config = config.with_timeout(Duration::from_secs(3));
        assert_eq!(config.timeout, Duration::from_secs(3));
        Ok(())
    }
}
