//! Command dispatch: bridges CLI args -> core service -> output formatting.

pub mod apply;
pub mod chunks;
pub mod config_cmd;
pub mod destroy;
pub mod plan;
pub mod refresh;
pub mod show;
pub mod util;

use assetctl_core::AssetService;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    service: &AssetService,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Apply(args) => apply::handle(service, &args, global).await,
        Command::Refresh(args) => refresh::handle(service, &args, global).await,
        Command::Destroy(args) => destroy::handle(service, &args, global).await,
        // Offline commands are handled before a service is built
        Command::Plan(_)
        | Command::Show(_)
        | Command::Chunks(_)
        | Command::Config(_)
        | Command::Completions(_) => Err(CliError::Internal(
            "offline command dispatched to the service".into(),
        )),
    }
}
