use crate::cli::actions::{Action, login, logout, profile, request, status};
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => login::execute(args).await,
        Action::Logout(globals) => logout::execute(&globals),
        Action::Status(globals) => status::execute(&globals),
        Action::Profile(globals) => profile::execute(&globals).await,
        Action::Get(args) => request::execute(args).await,
    }
}
