use std::path::PathBuf;

use serde::Deserialize;

use super::{
    Access, FieldSpec, FilePolicy, FinalizeRoute, ResourceDescriptor, ResourceKind, Sentinel,
    opt_text, text,
};
use crate::field::{Field, FieldValue};
use crate::resource::DesiredConfig;

/// Registered when a license has no file attached.
pub const PLACEHOLDER_FILE_NAME: &str = "SDA_License.vhdx";

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::License,
    collection: "assets/v1/license",
    id_field: "license_id",
    fields: &[
        FieldSpec::create_only("vendor_id"),
        FieldSpec::create_only("serial_id"),
        FieldSpec::create_only("product"),
        FieldSpec::create_only("type"),
        FieldSpec::create_only("quantity"),
        // Patchable, but the service has no way to unset it.
        FieldSpec {
            name: "status",
            access: Access::Optional,
            sentinel: None,
            echoed: true,
        },
        FieldSpec::optional("group_id", Sentinel::Null),
        FieldSpec::optional("name", Sentinel::Null),
        FieldSpec::optional("ide_config_id", Sentinel::Null),
        FieldSpec::optional("expiration_timestamp", Sentinel::Null),
        FieldSpec::optional("family", Sentinel::Null),
        FieldSpec::optional("company_name", Sentinel::Null),
        FieldSpec::optional("product_key", Sentinel::Null),
        FieldSpec::optional("container_id", Sentinel::Null),
        FieldSpec::optional("firm_code", Sentinel::Null),
        FieldSpec::optional("license_server", Sentinel::Null),
    ],
    file: FilePolicy::Optional {
        placeholder_name: PLACEHOLDER_FILE_NAME,
    },
    declares_file_size: false,
    finalize: FinalizeRoute::FileQuery,
};

/// A software license, optionally backed by a license container file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicenseSpec {
    pub vendor_id: String,
    pub serial_id: String,
    pub product: String,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default, rename = "type")]
    pub license_type: Field<String>,
    #[serde(default)]
    pub status: Field<String>,
    #[serde(default)]
    pub quantity: Field<i64>,
    #[serde(default)]
    pub group_id: Field<String>,
    #[serde(default)]
    pub name: Field<String>,
    #[serde(default)]
    pub ide_config_id: Field<String>,
    #[serde(default)]
    pub expiration_timestamp: Field<String>,
    #[serde(default)]
    pub family: Field<String>,
    #[serde(default)]
    pub company_name: Field<String>,
    #[serde(default)]
    pub product_key: Field<String>,
    #[serde(default)]
    pub container_id: Field<String>,
    #[serde(default)]
    pub firm_code: Field<String>,
    #[serde(default)]
    pub license_server: Field<String>,
}

impl LicenseSpec {
    pub fn into_desired(self) -> DesiredConfig {
        let desired = DesiredConfig::new(ResourceKind::License)
            .with("vendor_id", text(self.vendor_id))
            .with("serial_id", text(self.serial_id))
            .with("product", text(self.product))
            .with("type", opt_text(self.license_type))
            .with("status", opt_text(self.status))
            .with("quantity", self.quantity.map(FieldValue::Integer))
            .with("group_id", opt_text(self.group_id))
            .with("name", opt_text(self.name))
            .with("ide_config_id", opt_text(self.ide_config_id))
            .with("expiration_timestamp", opt_text(self.expiration_timestamp))
            .with("family", opt_text(self.family))
            .with("company_name", opt_text(self.company_name))
            .with("product_key", opt_text(self.product_key))
            .with("container_id", opt_text(self.container_id))
            .with("firm_code", opt_text(self.firm_code))
            .with("license_server", opt_text(self.license_server));

        match self.file_path {
            Some(path) => desired.with_source(path),
            None => desired,
        }
    }
}
