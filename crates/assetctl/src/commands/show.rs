//! `show`: print the tracked snapshot, and the renderer other commands reuse.

use tabled::Tabled;

use assetctl_core::{FieldValue, ResourceSnapshot};

use crate::cli::{GlobalOpts, ManifestArgs};
use crate::error::CliError;
use crate::output;
use crate::state;

use super::util;

#[derive(Tabled)]
struct DetailRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl DetailRow {
    fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

pub fn display_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::List(items) => items.join(", "),
    }
}

fn detail(snapshot: &ResourceSnapshot) -> String {
    let mut rows = vec![
        DetailRow::new("kind", snapshot.kind.to_string()),
        DetailRow::new("id", snapshot.id.clone()),
        DetailRow::new("object_version", snapshot.object_version.to_string()),
    ];
    if let Some(version_id) = &snapshot.version_id {
        rows.push(DetailRow::new("version_id", version_id.clone()));
    }
    rows.extend(
        snapshot
            .fields
            .iter()
            .map(|(name, value)| DetailRow::new(name.clone(), display_value(value))),
    );
    if let Some(file) = &snapshot.file {
        rows.push(DetailRow::new(
            "file",
            format!(
                "{} ({})",
                file.path.display(),
                bytesize::ByteSize::b(file.size)
            ),
        ));
    }
    let audit = &snapshot.audit;
    for (name, value) in [
        ("created_by", &audit.creation_user_id),
        ("created_at", &audit.creation_timestamp),
        ("updated_by", &audit.update_user_id),
        ("updated_at", &audit.update_timestamp),
    ] {
        if let Some(value) = value {
            rows.push(DetailRow::new(name, value.clone()));
        }
    }
    output::render_table(&rows)
}

/// Render a snapshot in the selected output format.
pub fn print_snapshot(snapshot: &ResourceSnapshot, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, snapshot, detail, |s| s.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn handle(args: &ManifestArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let tracked = state::require(&util::state_path(args))?;
    print_snapshot(&tracked.snapshot, global)
}
