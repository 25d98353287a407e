use crate::config::ClientConfig;
use anyhow::Result;
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub state_file: PathBuf,
    pub timeout: u64,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String, state_file: PathBuf, timeout: u64) -> Self {
        Self {
            api_url,
            state_file,
            timeout,
        }
    }

    /// # Errors
    /// Returns an error if the API URL is invalid.
    pub fn client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig::new(&self.api_url, &self.state_file)?
            .with_timeout(Duration::from_secs(self.timeout)))
    }
}
