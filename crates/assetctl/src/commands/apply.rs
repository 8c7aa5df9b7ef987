//! `apply`: create the resource on first run, patch it afterwards.

use tracing::debug;

use assetctl_core::AssetService;

use crate::cli::{GlobalOpts, ManifestArgs};
use crate::error::CliError;
use crate::manifest;
use crate::state::{self, StateFile};

use super::{show, util};

pub async fn handle(
    service: &AssetService,
    args: &ManifestArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let desired = manifest::load(&args.file)?;
    let state_path = util::state_path(args);

    let snapshot = match state::load(&state_path)? {
        None => {
            util::status(global.quiet, &format!("Creating {}...", desired.kind));
            let created = service
                .create(&desired)
                .await
                .map_err(|e| CliError::from(e).with_kind(desired.kind))?;
            util::status(
                global.quiet,
                &format!("Created {} {}", created.kind, created.id),
            );
            created
        }
        Some(tracked) => {
            manifest::check_kind(&desired, &tracked.snapshot)?;
            let updated = service.update(&desired, &tracked.snapshot).await?;
            if updated == tracked.snapshot {
                util::status(global.quiet, "No changes.");
                return Ok(());
            }
            util::status(
                global.quiet,
                &format!(
                    "Updated {} {} (version {} -> {})",
                    updated.kind,
                    updated.id,
                    tracked.snapshot.object_version,
                    updated.object_version
                ),
            );
            updated
        }
    };

    debug!(path = %state_path.display(), "writing state");
    state::save(&state_path, &StateFile::new(snapshot.clone()))?;
    show::print_snapshot(&snapshot, global)
}
