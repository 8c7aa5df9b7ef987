// ── Resource capability descriptors ──
//
// The three asset kinds share one transfer and one reconcile path. What
// differs between them is data: the collection path, the id field, the
// finalize route, and the per-field access class and clearing sentinel.
// Each kind module exports a static `ResourceDescriptor` plus the typed
// manifest spec that produces its `DesiredConfig`.

pub mod document;
pub mod license;
pub mod project;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString};

use crate::field::{Field, FieldValue};

pub use document::DocumentSpec;
pub use license::LicenseSpec;
pub use project::ProjectSpec;

// ── Kinds ────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Document,
    License,
    Project,
}

impl ResourceKind {
    pub fn descriptor(self) -> &'static ResourceDescriptor {
        match self {
            Self::Document => &document::DESCRIPTOR,
            Self::License => &license::DESCRIPTOR,
            Self::Project => &project::DESCRIPTOR,
        }
    }
}

// ── Field specs ──────────────────────────────────────────────────────

/// How a field participates in create and update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Always set; sent at registration and patched in place.
    Required,
    /// Tri-state; sent at registration when set, patched in place.
    Optional,
    /// Sent at registration; cannot change without recreating the resource.
    CreateOnly,
    /// Server-owned. Never sent.
    Computed,
}

/// Value sent in a patch to clear a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    EmptyString,
    Null,
    EmptyList,
}

impl Sentinel {
    pub fn to_json(self) -> Value {
        match self {
            Self::EmptyString => Value::String(String::new()),
            Self::Null => Value::Null,
            Self::EmptyList => Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub access: Access,
    /// `None` means the field cannot be cleared in place.
    pub sentinel: Option<Sentinel>,
    /// Whether the server returns this field on reads and updates.
    pub echoed: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str) -> Self {
        Self::new(name, Access::Required, None)
    }

    pub const fn optional(name: &'static str, sentinel: Sentinel) -> Self {
        Self::new(name, Access::Optional, Some(sentinel))
    }

    pub const fn create_only(name: &'static str) -> Self {
        Self::new(name, Access::CreateOnly, None)
    }

    pub const fn computed(name: &'static str) -> Self {
        Self::new(name, Access::Computed, None)
    }

    pub const fn not_echoed(mut self) -> Self {
        self.echoed = false;
        self
    }

    const fn new(name: &'static str, access: Access, sentinel: Option<Sentinel>) -> Self {
        Self {
            name,
            access,
            sentinel,
            echoed: true,
        }
    }
}

// ── Transfer policy ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePolicy {
    Required,
    /// Without a file, a one-part placeholder is registered under this name.
    Optional { placeholder_name: &'static str },
}

/// Shape of the completion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeRoute {
    /// `{collection}/{id}/version/{version_id}/complete_upload/{upload_id}`
    Versioned,
    /// `{collection}/{id}/file?upload_id={upload_id}`
    FileQuery,
}

#[derive(Debug)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    /// Collection path relative to the service root (`assets/v1/document`).
    pub collection: &'static str,
    pub id_field: &'static str,
    pub fields: &'static [FieldSpec],
    pub file: FilePolicy,
    /// Whether registration carries `file_size`.
    pub declares_file_size: bool,
    pub finalize: FinalizeRoute,
}

impl ResourceDescriptor {
    pub fn record_path(&self, id: &str) -> String {
        format!("{}/{id}", self.collection)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub creation_user_id: Option<String>,
    pub update_user_id: Option<String>,
    pub creation_timestamp: Option<String>,
    pub update_timestamp: Option<String>,
}

/// The local file a resource was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

/// Last-known server state of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub kind: ResourceKind,
    pub id: String,
    /// Version stamp echoed back on every update.
    pub object_version: i64,
    /// Version issued at registration for kinds with a versioned payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// Present, non-empty fields only.
    #[serde(default)]
    pub fields: IndexMap<String, FieldValue>,
    #[serde(default)]
    pub audit: AuditInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<TrackedFile>,
}

impl ResourceSnapshot {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

// ── Desired configuration ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredConfig {
    pub kind: ResourceKind,
    pub fields: IndexMap<&'static str, Field<FieldValue>>,
    /// Local file to upload.
    pub source: Option<PathBuf>,
}

impl DesiredConfig {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            fields: IndexMap::new(),
            source: None,
        }
    }

    pub fn with(mut self, name: &'static str, value: Field<FieldValue>) -> Self {
        self.fields.insert(name, value);
        self
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn field(&self, name: &str) -> Field<&FieldValue> {
        self.fields.get(name).map_or(Field::Absent, Field::as_ref)
    }

    /// Registration metadata: every set, non-computed field.
    pub fn registration_body(&self, descriptor: &ResourceDescriptor) -> Map<String, Value> {
        descriptor
            .fields
            .iter()
            .filter(|spec| spec.access != Access::Computed)
            .filter_map(|spec| match self.field(spec.name) {
                Field::Set(v) => Some((spec.name.to_owned(), v.to_json())),
                Field::Absent | Field::Clear => None,
            })
            .collect()
    }

    /// Resolve the source path against `base` and make it absolute.
    ///
    /// The result is the identity compared against the tracked file, so it
    /// must not depend on how the manifest path was spelled (`m.yaml`,
    /// `./m.yaml`) or on the working directory.
    pub fn resolve_source(&mut self, base: &Path) {
        if let Some(path) = self.source.take() {
            let joined = if path.is_relative() {
                base.join(path)
            } else {
                path
            };
            self.source = Some(std::path::absolute(&joined).unwrap_or(joined));
        }
    }
}

// ── Manifest ─────────────────────────────────────────────────────────

/// A declarative resource definition: `kind` plus a kind-specific `spec`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "spec", rename_all = "lowercase")]
pub enum Manifest {
    Document(DocumentSpec),
    License(LicenseSpec),
    Project(ProjectSpec),
}

impl Manifest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Document(_) => ResourceKind::Document,
            Self::License(_) => ResourceKind::License,
            Self::Project(_) => ResourceKind::Project,
        }
    }

    pub fn into_desired(self) -> DesiredConfig {
        match self {
            Self::Document(spec) => spec.into_desired(),
            Self::License(spec) => spec.into_desired(),
            Self::Project(spec) => spec.into_desired(),
        }
    }
}

fn text(value: String) -> Field<FieldValue> {
    Field::Set(FieldValue::Text(value))
}

fn opt_text(value: Field<String>) -> Field<FieldValue> {
    value.map(FieldValue::Text)
}
