use std::path::PathBuf;

use serde::Deserialize;

use super::{
    FieldSpec, FilePolicy, FinalizeRoute, ResourceDescriptor, ResourceKind, Sentinel, opt_text,
    text,
};
use crate::field::{Field, FieldValue};
use crate::resource::DesiredConfig;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Project,
    collection: "assets/v1/project",
    id_field: "project_id",
    fields: &[
        FieldSpec::required("name"),
        FieldSpec::create_only("vendor_id"),
        FieldSpec::create_only("ide_config_id"),
        FieldSpec::create_only("project_type"),
        FieldSpec::optional("group_id", Sentinel::EmptyString),
        FieldSpec::optional("description", Sentinel::EmptyString),
        FieldSpec::optional("secret_id", Sentinel::EmptyString),
        FieldSpec::optional("attached_licenses", Sentinel::EmptyList),
        FieldSpec::computed("last_version_number"),
    ],
    file: FilePolicy::Required,
    declares_file_size: true,
    finalize: FinalizeRoute::Versioned,
};

/// An engineering project bundle with optional attached licenses.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSpec {
    pub name: String,
    pub vendor_id: String,
    pub ide_config_id: String,
    pub file_path: PathBuf,
    #[serde(default)]
    pub project_type: Field<String>,
    #[serde(default)]
    pub group_id: Field<String>,
    #[serde(default)]
    pub description: Field<String>,
    #[serde(default)]
    pub secret_id: Field<String>,
    #[serde(default)]
    pub attached_licenses: Field<Vec<String>>,
}

impl ProjectSpec {
    pub fn into_desired(self) -> DesiredConfig {
        DesiredConfig::new(ResourceKind::Project)
            .with("name", text(self.name))
            .with("vendor_id", text(self.vendor_id))
            .with("ide_config_id", text(self.ide_config_id))
            .with("project_type", opt_text(self.project_type))
            .with("group_id", opt_text(self.group_id))
            .with("description", opt_text(self.description))
            .with("secret_id", opt_text(self.secret_id))
            .with(
                "attached_licenses",
                self.attached_licenses.map(FieldValue::List),
            )
            .with_source(self.file_path)
    }
}
