// ── Reconciler ──
//
// Diffs desired configuration against the last-known snapshot and builds
// the minimal version-guarded patch:
//
//   Absent              → omitted
//   Clear, observed ∅   → omitted
//   Clear, observed v   → the field's clearing sentinel
//   Set(v), observed v  → omitted
//   Set(v), otherwise   → v
//
// "∅" is absent, `""` or `[]`. No locking happens here: if the snapshot is
// stale, the server's version check rejects the patch.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::error::CoreError;
use crate::field::{Field, FieldValue, is_empty};
use crate::resource::{Access, DesiredConfig, ResourceDescriptor, ResourceSnapshot};

/// Name reported when the tracked source file path changes.
pub const FILE_PATH_FIELD: &str = "file_path";

/// A partial update: changed fields plus the version stamp.
///
/// Serializes as one flat JSON object with exactly one `object_version` key.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    object_version: i64,
    changes: IndexMap<String, Value>,
    cleared: Vec<String>,
    replacements: Vec<String>,
}

impl Patch {
    pub fn object_version(&self) -> i64 {
        self.object_version
    }

    pub fn changes(&self) -> &IndexMap<String, Value> {
        &self.changes
    }

    /// Fields this patch clears with a sentinel.
    pub fn cleared(&self) -> &[String] {
        &self.cleared
    }

    /// Fields whose desired value differs but cannot change in place.
    pub fn replacements(&self) -> &[String] {
        &self.replacements
    }

    pub fn is_cleared(&self, name: &str) -> bool {
        self.cleared.iter().any(|c| c == name)
    }

    /// No field changes and nothing needing replacement.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.replacements.is_empty()
    }
}

impl Serialize for Patch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.changes.len() + 1))?;
        for (name, value) in &self.changes {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("object_version", &self.object_version)?;
        map.end()
    }
}

pub struct Reconciler<'a> {
    descriptor: &'a ResourceDescriptor,
}

impl<'a> Reconciler<'a> {
    pub fn new(descriptor: &'a ResourceDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn diff(
        &self,
        desired: &DesiredConfig,
        snapshot: &ResourceSnapshot,
    ) -> Result<Patch, CoreError> {
        if desired.kind != self.descriptor.kind || snapshot.kind != self.descriptor.kind {
            return Err(CoreError::validation(format!(
                "cannot diff {} configuration against {} state with the {} schema",
                desired.kind, snapshot.kind, self.descriptor.kind
            )));
        }

        let mut patch = Patch {
            object_version: snapshot.object_version,
            changes: IndexMap::new(),
            cleared: Vec::new(),
            replacements: Vec::new(),
        };

        for spec in self.descriptor.fields {
            if spec.access == Access::Computed {
                continue;
            }
            let observed = snapshot.field(spec.name);

            match desired.field(spec.name) {
                Field::Absent => {}
                Field::Clear => {
                    if is_empty(observed) {
                        continue;
                    }
                    if spec.access == Access::CreateOnly {
                        patch.replacements.push(spec.name.to_owned());
                    } else if let Some(sentinel) = spec.sentinel {
                        patch
                            .changes
                            .insert(spec.name.to_owned(), sentinel.to_json());
                        patch.cleared.push(spec.name.to_owned());
                    } else {
                        debug!(field = spec.name, "field cannot be cleared in place; skipping");
                    }
                }
                Field::Set(value) => {
                    if same(value, observed) {
                        continue;
                    }
                    if spec.access == Access::CreateOnly {
                        patch.replacements.push(spec.name.to_owned());
                    } else {
                        patch.changes.insert(spec.name.to_owned(), value.to_json());
                    }
                }
            }
        }

        let tracked = snapshot.file.as_ref().map(|f| f.path.as_path());
        if desired.source.as_deref() != tracked {
            patch.replacements.push(FILE_PATH_FIELD.to_owned());
        }

        Ok(patch)
    }
}

fn same(desired: &FieldValue, observed: Option<&FieldValue>) -> bool {
    match observed {
        Some(observed) => desired == observed,
        None => desired.is_empty(),
    }
}
