use crate::cli::{actions::connect, globals::GlobalArgs};
use anyhow::{Context, Result};
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub email: String,
    pub password: SecretString,
}

/// Signs in and persists the new session.
/// # Errors
/// Returns an error if the credentials are rejected or the session cannot be stored.
pub async fn execute(args: Args) -> Result<()> {
    let manager = connect(&args.globals)?;

    let user = manager
        .login(&args.email, &args.password)
        .await
        .context("Sign in failed")?;

    let name = if user.display_name.is_empty() {
        &user.email
    } else {
        &user.display_name
    };
    println!("Signed in as {name} (id {})", user.id);

    Ok(())
}
