//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Color a plan action marker (`+`, `~`, `-`, `!`).
pub fn paint_action(marker: &str, color: bool) -> String {
    if !color {
        return marker.to_owned();
    }
    match marker {
        "+" => marker.green().to_string(),
        "~" => marker.yellow().to_string(),
        "-" => marker.red().to_string(),
        _ => marker.magenta().bold().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a listing (the part plan of `chunks`) in the chosen format.
///
/// `plain_fn` gives the one-line form of each entry.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&plain_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since detail views are not tabular.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Part {
        part_number: usize,
        md5: &'static str,
    }

    #[derive(Tabled)]
    struct PartRow {
        #[tabled(rename = "Part")]
        part: usize,
    }

    const PARTS: [Part; 2] = [
        Part {
            part_number: 1,
            md5: "4vxxTEcn7pOV8yTNLn8zHw==",
        },
        Part {
            part_number: 2,
            md5: "XUFAKrxLKna5cZ2REBfFkg==",
        },
    ];

    fn render(format: OutputFormat) -> String {
        render_list(
            format,
            &PARTS,
            |p| PartRow {
                part: p.part_number,
            },
            |p| p.md5.to_owned(),
        )
        .unwrap()
    }

    #[test]
    fn plain_prints_one_checksum_per_part() {
        assert_eq!(
            render(OutputFormat::Plain),
            "4vxxTEcn7pOV8yTNLn8zHw==\nXUFAKrxLKna5cZ2REBfFkg=="
        );
    }

    #[test]
    fn compact_json_keeps_part_order() {
        let out = render(OutputFormat::JsonCompact);
        assert!(!out.contains('\n'));
        assert!(out.starts_with(r#"[{"part_number":1,"#));
    }

    #[test]
    fn yaml_lists_parts() {
        let out = render(OutputFormat::Yaml);
        assert!(out.contains("part_number: 2"));
    }

    #[test]
    fn markers_stay_plain_without_color() {
        assert_eq!(paint_action("+", false), "+");
        assert_ne!(paint_action("+", true), "+");
    }
}
