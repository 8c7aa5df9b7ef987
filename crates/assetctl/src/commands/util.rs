//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::PathBuf;

use crate::cli::ManifestArgs;
use crate::error::CliError;
use crate::state;

/// The state file for a manifest: `--state`, or next to the manifest.
pub fn state_path(args: &ManifestArgs) -> PathBuf {
    args.state
        .clone()
        .unwrap_or_else(|| state::default_path(&args.file))
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Print a status line on stderr unless quiet.
pub fn status(global_quiet: bool, message: &str) {
    if !global_quiet {
        eprintln!("{message}");
    }
}
