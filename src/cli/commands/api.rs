use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use clap::{Arg, Command};
use std::{env::var_os, path::PathBuf};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_STATE_FILE: &str = "state-file";
pub const ARG_TIMEOUT: &str = "timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Billing console API base URL, example: https://billing.example.com")
                .env("LEDGERDESK_API_URL")
                .default_value("http://localhost:8000")
                .global(true),
        )
        .arg(
            Arg::new(ARG_STATE_FILE)
                .long(ARG_STATE_FILE)
                .help("Where the session is persisted (default: $XDG_CONFIG_HOME/ledgerdesk/session.json)")
                .env("LEDGERDESK_STATE_FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Request timeout in seconds")
                .env("LEDGERDESK_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..))
                .global(true),
        )
}

/// Default session file under the user's config directory.
#[must_use]
pub fn default_state_file() -> PathBuf {
    let config_dir = var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| var_os("HOME").map(|home| PathBuf::from(home).join(".config")));

    match config_dir {
        Some(dir) => dir.join("ledgerdesk").join("session.json"),
        None => PathBuf::from("ledgerdesk-session.json"),
    }
}

/// # Errors
/// Returns an error if a required argument is missing.
pub fn parse(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let api_url = matches
        .get_one::<String>(ARG_API_URL)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_API_URL}"))?;

    let state_file = matches
        .get_one::<PathBuf>(ARG_STATE_FILE)
        .cloned()
        .unwrap_or_else(default_state_file);

    let timeout = matches.get_one::<u64>(ARG_TIMEOUT).copied().unwrap_or(10);

    Ok(GlobalArgs::new(api_url, state_file, timeout))
}
