use crate::cli::{
    actions::{Action, login, request},
    commands::{self, api},
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;

/// Maps parsed arguments to the [`Action`] to run.
///
/// # Errors
/// Returns an error if a required argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let globals = api::parse(matches)?;

    let (name, sub_m) = matches
        .subcommand()
        .context("missing subcommand")?;

    match name {
        commands::CMD_LOGIN => {
            let email = sub_m
                .get_one::<String>("email")
                .cloned()
                .ok_or_else(|| anyhow!("missing required argument: --email"))?;
            let password = sub_m
                .get_one::<String>("password")
                .cloned()
                .map(SecretString::from)
                .ok_or_else(|| anyhow!("missing required argument: --password"))?;

            Ok(Action::Login(login::Args {
                globals,
                email,
                password,
            }))
        }
        commands::CMD_LOGOUT => Ok(Action::Logout(globals)),
        commands::CMD_STATUS => Ok(Action::Status(globals)),
        commands::CMD_PROFILE => Ok(Action::Profile(globals)),
        commands::CMD_GET => {
            let path = sub_m
                .get_one::<String>("path")
                .cloned()
                .ok_or_else(|| anyhow!("missing required argument: PATH"))?;

            Ok(Action::Get(request::Args { globals, path }))
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}
