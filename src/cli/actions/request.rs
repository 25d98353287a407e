use crate::{
    api::ApiClient,
    cli::{actions::connect, globals::GlobalArgs},
};
use anyhow::{Context, Result};
use serde_json::Value;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub path: String,
}

/// Sends an authenticated GET and prints the JSON body.
/// # Errors
/// Returns an error if the request fails or the body is not JSON.
pub async fn execute(args: Args) -> Result<()> {
    let manager = connect(&args.globals)?;
    let coordinator = manager.coordinator();
    let client = ApiClient::new(coordinator.clone(), coordinator.store().subscribe());

    let value: Value = client
        .get_json(&args.path)
        .await
        .with_context(|| format!("GET {} failed", args.path))?;

    println!("{}", serde_json::to_string_pretty(&value)?);

    Ok(())
}
