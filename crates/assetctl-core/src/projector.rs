// ── StateProjector ──
//
// Maps a server representation back into a tracked snapshot. Two fields
// need care: ones the server never echoes keep their locally tracked value,
// and ones the preceding patch cleared are forced absent so the snapshot
// does not resurrect a stale value.

use assetctl_api::types::AssetRecord;
use indexmap::IndexMap;

use crate::error::{CoreError, Phase};
use crate::field::{Field, FieldValue};
use crate::reconcile::Patch;
use crate::resource::{
    AuditInfo, DesiredConfig, FieldSpec, ResourceDescriptor, ResourceSnapshot, TrackedFile,
};

pub struct StateProjector<'a> {
    descriptor: &'a ResourceDescriptor,
}

impl<'a> StateProjector<'a> {
    pub fn new(descriptor: &'a ResourceDescriptor) -> Self {
        Self { descriptor }
    }

    /// Snapshot after a successful create.
    pub fn created(
        &self,
        record: &AssetRecord,
        version_id: Option<String>,
        desired: &DesiredConfig,
        file: Option<TrackedFile>,
    ) -> Result<ResourceSnapshot, CoreError> {
        let mut snapshot = self.project(
            Phase::Register,
            record,
            |spec| desired.field(spec.name).set().cloned(),
            &[],
        )?;
        snapshot.version_id = version_id;
        snapshot.file = file;
        Ok(snapshot)
    }

    /// Snapshot after a refresh read.
    pub fn read(
        &self,
        record: &AssetRecord,
        previous: &ResourceSnapshot,
    ) -> Result<ResourceSnapshot, CoreError> {
        let mut snapshot = self.project(
            Phase::Read,
            record,
            |spec| previous.field(spec.name).cloned(),
            &[],
        )?;
        snapshot.version_id.clone_from(&previous.version_id);
        snapshot.file.clone_from(&previous.file);
        Ok(snapshot)
    }

    /// Snapshot after an update applied `patch`.
    pub fn updated(
        &self,
        record: &AssetRecord,
        previous: &ResourceSnapshot,
        desired: &DesiredConfig,
        patch: &Patch,
    ) -> Result<ResourceSnapshot, CoreError> {
        let mut snapshot = self.project(
            Phase::Update,
            record,
            |spec| match desired.field(spec.name) {
                Field::Set(v) => Some(v.clone()),
                Field::Clear => None,
                Field::Absent => previous.field(spec.name).cloned(),
            },
            patch.cleared(),
        )?;
        snapshot.version_id.clone_from(&previous.version_id);
        snapshot.file.clone_from(&previous.file);
        Ok(snapshot)
    }

    fn project(
        &self,
        phase: Phase,
        record: &AssetRecord,
        carry: impl Fn(&FieldSpec) -> Option<FieldValue>,
        cleared: &[String],
    ) -> Result<ResourceSnapshot, CoreError> {
        let id = record
            .text(self.descriptor.id_field)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::MalformedResponse {
                phase,
                message: format!("response has no {}", self.descriptor.id_field),
            })?;

        let mut fields = IndexMap::new();
        for spec in self.descriptor.fields {
            let value = if !spec.echoed {
                carry(spec)
            } else if cleared.iter().any(|c| c == spec.name) {
                None
            } else {
                record.attributes.get(spec.name).and_then(FieldValue::from_json)
            };

            match value {
                Some(FieldValue::List(items)) if items.is_empty() => {}
                Some(value) => {
                    fields.insert(spec.name.to_owned(), value);
                }
                None => {}
            }
        }

        Ok(ResourceSnapshot {
            kind: self.descriptor.kind,
            id: id.to_owned(),
            object_version: record.object_version,
            version_id: None,
            fields,
            audit: AuditInfo {
                creation_user_id: record.creation_user_id.clone(),
                update_user_id: record.update_user_id.clone(),
                creation_timestamp: record.creation_timestamp.clone(),
                update_timestamp: record.update_timestamp.clone(),
            },
            file: None,
        })
    }
}
