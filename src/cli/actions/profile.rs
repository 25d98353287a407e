use crate::cli::{actions::connect, globals::GlobalArgs};
use anyhow::{Context, Result, bail};

/// Refreshes the stored profile from the API and prints it as JSON.
/// # Errors
/// Returns an error if not signed in or the request fails.
pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let manager = connect(globals)?;

    if !manager.session().is_authenticated() {
        bail!("Not signed in");
    }

    let user = manager
        .fetch_profile()
        .await
        .context("Failed to fetch profile")?;

    println!("{}", serde_json::to_string_pretty(&user)?);

    Ok(())
}
