use crate::cli::{actions::connect, globals::GlobalArgs};
use anyhow::Result;

/// # Errors
/// Returns an error if the client cannot be initialized.
pub fn execute(globals: &GlobalArgs) -> Result<()> {
    let manager = connect(globals)?;

    if manager.logout() {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }

    Ok(())
}
