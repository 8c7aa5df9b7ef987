//! `plan`: show what `apply` would send. Never contacts the service.
//!
//! Without tracked state the plan is a create: the registration metadata
//! plus the part plan for the source file. With state it is the patch the
//! reconciler computes against the tracked snapshot.

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use assetctl_core::{DesiredConfig, Field, PART_SIZE, PreparedTransfer, Reconciler};

use crate::cli::{GlobalOpts, ManifestArgs};
use crate::error::CliError;
use crate::manifest;
use crate::output;
use crate::state;

use super::util;

#[derive(Debug, Serialize)]
struct PlanReport {
    action: &'static str,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<u64>,
    changes: Vec<PlanChange>,
}

#[derive(Debug, Serialize)]
struct PlanChange {
    action: &'static str,
    field: String,
    value: Value,
}

impl PlanChange {
    fn marker(&self) -> &'static str {
        match self.action {
            "add" => "+",
            "change" => "~",
            "clear" => "-",
            _ => "!",
        }
    }
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn display_json(value: &Value) -> String {
    match value {
        Value::String(s) if s.is_empty() => "\"\"".into(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn summary(report: &PlanReport) -> String {
    match report.action {
        "create" => format!(
            "Plan: create {} ({} part(s), {})",
            report.kind,
            report.parts.unwrap_or_default(),
            bytesize::ByteSize::b(report.bytes.unwrap_or_default())
        ),
        "none" => format!(
            "No changes. {} {} is up to date.",
            report.kind,
            report.id.as_deref().unwrap_or_default()
        ),
        _ => {
            let replace = report
                .changes
                .iter()
                .filter(|c| c.action == "replace")
                .count();
            let mut line = format!(
                "Plan: update {} {} at version {} ({} change(s))",
                report.kind,
                report.id.as_deref().unwrap_or_default(),
                report.object_version.unwrap_or_default(),
                report.changes.len() - replace
            );
            if replace > 0 {
                line.push_str(&format!(
                    "\n{replace} field(s) cannot change in place; destroy and re-apply to change them."
                ));
            }
            line
        }
    }
}

fn detail(report: &PlanReport, color: bool) -> String {
    if report.changes.is_empty() {
        return summary(report);
    }
    let rows: Vec<ChangeRow> = report
        .changes
        .iter()
        .map(|c| ChangeRow {
            marker: output::paint_action(c.marker(), color),
            field: c.field.clone(),
            value: display_json(&c.value),
        })
        .collect();
    format!("{}\n{}", output::render_table(&rows), summary(report))
}

async fn create_plan(desired: &DesiredConfig) -> Result<PlanReport, CliError> {
    let descriptor = desired.kind.descriptor();
    let transfer = PreparedTransfer::for_desired(desired, PART_SIZE).await?;

    let mut changes: Vec<PlanChange> = desired
        .registration_body(descriptor)
        .into_iter()
        .map(|(field, value)| PlanChange {
            action: "add",
            field,
            value,
        })
        .collect();
    changes.push(PlanChange {
        action: "add",
        field: "file_name".into(),
        value: Value::String(transfer.file_name().to_owned()),
    });

    Ok(PlanReport {
        action: "create",
        kind: desired.kind.to_string(),
        id: None,
        object_version: None,
        parts: Some(transfer.plan().part_count()),
        bytes: Some(transfer.plan().total_size()),
        changes,
    })
}

fn desired_value(desired: &DesiredConfig, field: &str) -> Value {
    if field == assetctl_core::reconcile::FILE_PATH_FIELD {
        return desired
            .source
            .as_ref()
            .map_or(Value::Null, |p| Value::String(p.display().to_string()));
    }
    match desired.field(field) {
        Field::Set(v) => v.to_json(),
        Field::Absent | Field::Clear => Value::Null,
    }
}

pub async fn handle(args: &ManifestArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let desired = manifest::load(&args.file)?;

    let report = match state::load(&util::state_path(args))? {
        None => create_plan(&desired).await?,
        Some(tracked) => {
            let snapshot = &tracked.snapshot;
            manifest::check_kind(&desired, snapshot)?;
            let patch = Reconciler::new(snapshot.kind.descriptor()).diff(&desired, snapshot)?;

            let mut changes: Vec<PlanChange> = patch
                .changes()
                .iter()
                .map(|(field, value)| PlanChange {
                    action: if patch.is_cleared(field) {
                        "clear"
                    } else {
                        "change"
                    },
                    field: field.clone(),
                    value: value.clone(),
                })
                .collect();
            changes.extend(patch.replacements().iter().map(|field| PlanChange {
                action: "replace",
                field: field.clone(),
                value: desired_value(&desired, field),
            }));

            PlanReport {
                action: if changes.is_empty() { "none" } else { "update" },
                kind: snapshot.kind.to_string(),
                id: Some(snapshot.id.clone()),
                object_version: Some(patch.object_version()),
                parts: None,
                bytes: None,
                changes,
            }
        }
    };

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &report,
        |r| detail(r, color),
        |r| {
            r.changes
                .iter()
                .map(|c| format!("{} {}", c.marker(), c.field))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
