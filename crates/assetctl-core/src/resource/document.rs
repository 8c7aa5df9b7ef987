use std::path::PathBuf;

use serde::Deserialize;

use super::{
    FieldSpec, FilePolicy, FinalizeRoute, ResourceDescriptor, ResourceKind, Sentinel, opt_text,
    text,
};
use crate::field::Field;
use crate::resource::DesiredConfig;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Document,
    collection: "assets/v1/document",
    id_field: "document_id",
    fields: &[
        FieldSpec::required("name"),
        FieldSpec::create_only("document_type"),
        FieldSpec::optional("group_id", Sentinel::EmptyString),
        // The service accepts a commit message but never returns it.
        FieldSpec::optional("commit_message", Sentinel::EmptyString).not_echoed(),
        FieldSpec::computed("last_version_number"),
    ],
    file: FilePolicy::Required,
    declares_file_size: true,
    finalize: FinalizeRoute::Versioned,
};

/// A versioned document (manual, datasheet, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentSpec {
    pub name: String,
    pub document_type: String,
    pub file_path: PathBuf,
    #[serde(default)]
    pub group_id: Field<String>,
    #[serde(default)]
    pub commit_message: Field<String>,
}

impl DocumentSpec {
    pub fn into_desired(self) -> DesiredConfig {
        DesiredConfig::new(ResourceKind::Document)
            .with("name", text(self.name))
            .with("document_type", text(self.document_type))
            .with("group_id", opt_text(self.group_id))
            .with("commit_message", opt_text(self.commit_message))
            .with_source(self.file_path)
    }
}
