//! Local state file: the last-known snapshot of the resource a manifest
//! manages.
//!
//! One JSON file per manifest, written atomically (temp file + rename).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assetctl_core::ResourceSnapshot;

use crate::error::CliError;

const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub snapshot: ResourceSnapshot,
}

impl StateFile {
    pub fn new(snapshot: ResourceSnapshot) -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            snapshot,
        }
    }
}

/// `docs/manual.yaml` → `docs/manual.state.json`.
pub fn default_path(manifest: &Path) -> PathBuf {
    manifest.with_extension("state.json")
}

/// Read the state file. A missing file means nothing is tracked yet.
pub fn load(path: &Path) -> Result<Option<StateFile>, CliError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let state: StateFile = serde_json::from_str(&raw)?;
    if state.version != STATE_VERSION {
        return Err(CliError::Validation {
            field: "state".into(),
            reason: format!(
                "{} has state version {}, expected {STATE_VERSION}",
                path.display(),
                state.version
            ),
        });
    }
    Ok(Some(state))
}

/// Like [`load`], but a missing file is an error.
pub fn require(path: &Path) -> Result<StateFile, CliError> {
    load(path)?.ok_or_else(|| CliError::NoState {
        path: path.display().to_string(),
    })
}

pub fn save(path: &Path, state: &StateFile) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Delete the state file; already-missing is fine.
pub fn remove(path: &Path) -> Result<(), CliError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use assetctl_core::resource::AuditInfo;
    use assetctl_core::{FieldValue, ResourceKind};

    use super::*;

    fn snapshot() -> ResourceSnapshot {
        ResourceSnapshot {
            kind: ResourceKind::License,
            id: "lic-1".into(),
            object_version: 2,
            version_id: None,
            fields: [("quantity".to_owned(), FieldValue::Integer(5))]
                .into_iter()
                .collect(),
            audit: AuditInfo::default(),
            file: None,
        }
    }

    #[test]
    fn default_path_sits_next_to_manifest() {
        assert_eq!(
            default_path(Path::new("docs/manual.yaml")),
            PathBuf::from("docs/manual.state.json")
        );
    }

    #[test]
    fn save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lic.state.json");

        assert!(load(&path).unwrap().is_none());
        assert!(matches!(require(&path), Err(CliError::NoState { .. })));

        let state = StateFile::new(snapshot());
        save(&path, &state).unwrap();
        assert_eq!(load(&path).unwrap(), Some(state));

        remove(&path).unwrap();
        remove(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn rejects_unknown_state_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.state.json");
        let mut state = StateFile::new(snapshot());
        state.version = 99;
        std::fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        assert!(matches!(load(&path), Err(CliError::Validation { .. })));
    }
}
