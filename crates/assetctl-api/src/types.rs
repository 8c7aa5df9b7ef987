// Wire types for the asset service.
//
// Every asset kind shares the registration envelope and the audit fields.
// The kind-specific attributes (name, vendor_id, attached_licenses, ...) are
// kept as a flattened JSON map so a single client serves all kinds; the core
// crate's descriptors decide which keys matter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One pre-signed upload target issued at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// 1-based part number assigned by the server.
    pub part_number: u32,
    pub upload_url: String,
}

/// Server representation of an asset, as returned by create/read/update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Optimistic-concurrency version stamp.
    pub object_version: i64,
    #[serde(default)]
    pub creation_user_id: Option<String>,
    #[serde(default)]
    pub update_user_id: Option<String>,
    #[serde(default)]
    pub creation_timestamp: Option<String>,
    #[serde(default)]
    pub update_timestamp: Option<String>,
    /// Kind-specific fields, including the id field (`document_id`, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl AssetRecord {
    /// String attribute lookup; `null` and non-strings read as `None`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Response to a registration (resource-creation) call.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    /// One target per declared part, in part order.
    #[serde(default)]
    pub upload_urls: Vec<UploadTarget>,
    /// Transfer session identifier.
    #[serde(default)]
    pub upload_id: String,
    /// Version identifier for kinds whose finalize path is versioned.
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(flatten)]
    pub record: AssetRecord,
}

/// One `(part number, completion tag)` pair submitted at finalize time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

/// Finalize request body.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteUploadRequest {
    pub parts: Vec<CompletedPart>,
    pub file_name: String,
}
