pub mod login;
pub mod logout;
pub mod profile;
pub mod request;
pub mod status;

mod run;

use crate::{
    auth::{LogListener, SessionManager},
    cli::globals::GlobalArgs,
    session::FileStorage,
};
use anyhow::Result;
use std::sync::Arc;

#[derive(Debug)]
pub enum Action {
    Login(login::Args),
    Logout(GlobalArgs),
    Status(GlobalArgs),
    Profile(GlobalArgs),
    Get(request::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

/// Builds a session manager backed by the state file named in `globals`.
pub(crate) fn connect(globals: &GlobalArgs) -> Result<SessionManager> {
    let config = globals.client_config()?;
    let storage = Arc::new(FileStorage::new(config.state_file.clone()));

    SessionManager::connect(config, storage, Arc::new(LogListener))
}
