//! `refresh`: re-read the tracked resource.

use assetctl_core::AssetService;

use crate::cli::{GlobalOpts, ManifestArgs};
use crate::error::CliError;
use crate::state::{self, StateFile};

use super::{show, util};

pub async fn handle(
    service: &AssetService,
    args: &ManifestArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state_path = util::state_path(args);
    let tracked = state::require(&state_path)?;

    match service.read(&tracked.snapshot).await? {
        Some(fresh) => {
            state::save(&state_path, &StateFile::new(fresh.clone()))?;
            show::print_snapshot(&fresh, global)
        }
        None => {
            state::remove(&state_path)?;
            util::status(
                global.quiet,
                &format!(
                    "{} {} no longer exists; dropped {}",
                    tracked.snapshot.kind,
                    tracked.snapshot.id,
                    state_path.display()
                ),
            );
            Ok(())
        }
    }
}
