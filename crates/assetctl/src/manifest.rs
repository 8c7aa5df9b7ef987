//! Manifest loading.

use std::path::Path;

use assetctl_core::{DesiredConfig, Manifest, ResourceSnapshot};

use crate::error::CliError;

/// Parse a YAML manifest into a desired configuration.
///
/// A relative `file_path` resolves against the manifest's directory.
pub fn load(path: &Path) -> Result<DesiredConfig, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let manifest: Manifest = serde_yaml::from_str(&raw).map_err(|e| CliError::Manifest {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut desired = manifest.into_desired();
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    desired.resolve_source(base);
    Ok(desired)
}

/// The manifest must describe the same kind of resource the state tracks.
pub fn check_kind(desired: &DesiredConfig, snapshot: &ResourceSnapshot) -> Result<(), CliError> {
    if desired.kind == snapshot.kind {
        return Ok(());
    }
    Err(CliError::Validation {
        field: "kind".into(),
        reason: format!(
            "manifest describes a {} but the state tracks {} {}",
            desired.kind, snapshot.kind, snapshot.id
        ),
    })
}
