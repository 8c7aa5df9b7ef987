//! `destroy`: delete the tracked resource and drop its state.

use assetctl_core::AssetService;

use crate::cli::{GlobalOpts, ManifestArgs};
use crate::error::CliError;
use crate::state;

use super::util;

pub async fn handle(
    service: &AssetService,
    args: &ManifestArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state_path = util::state_path(args);
    let tracked = state::require(&state_path)?;
    let snapshot = &tracked.snapshot;

    if !util::confirm(
        &format!(
            "Delete {} {}? This is destructive.",
            snapshot.kind, snapshot.id
        ),
        "destroy",
        global.yes,
    )? {
        return Ok(());
    }

    service.delete(snapshot).await?;
    state::remove(&state_path)?;
    util::status(
        global.quiet,
        &format!("Deleted {} {}", snapshot.kind, snapshot.id),
    );
    Ok(())
}
