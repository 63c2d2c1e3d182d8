//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Render a DMX level, dimmed at zero and bold at full.
pub fn paint_level(level: u8, color: bool) -> String {
    if !color {
        return level.to_string();
    }
    match level {
        0 => level.dimmed().to_string(),
        255 => level.bold().to_string(),
        _ => level.cyan().to_string(),
    }
}

/// Render a yes/no flag.
pub fn paint_flag(on: bool, color: bool) -> String {
    match (on, color) {
        (true, true) => "yes".green().to_string(),
        (false, true) => "no".dimmed().to_string(),
        (true, false) => "yes".into(),
        (false, false) => "no".into(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views are a
/// key/value block rather than a `Tabled` row.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Plain => line_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Item {
        id: u16,
        level: u8,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Channel")]
        id: u16,
    }

    fn items() -> Vec<Item> {
        vec![Item { id: 1, level: 10 }, Item { id: 2, level: 0 }]
    }

    #[test]
    fn plain_is_one_line_per_item() {
        let out = render_list(
            &OutputFormat::Plain,
            &items(),
            |i| Row { id: i.id },
            |i| format!("{}={}", i.id, i.level),
        )
        .unwrap();
        assert_eq!(out, "1=10\n2=0");
    }

    #[test]
    fn compact_json_serializes_source_data() {
        let out = render_list(&OutputFormat::JsonCompact, &items(), |i| Row { id: i.id }, |_| String::new())
            .unwrap();
        assert_eq!(out, r#"[{"id":1,"level":10},{"id":2,"level":0}]"#);
    }

    #[test]
    fn table_uses_row_headers() {
        let out = render_list(&OutputFormat::Table, &items(), |i| Row { id: i.id }, |_| String::new())
            .unwrap();
        assert!(out.contains("Channel"));
        assert!(!out.contains("level"));
    }

    #[test]
    fn uncolored_levels_are_plain_numbers() {
        assert_eq!(paint_level(255, false), "255");
        assert_eq!(paint_flag(true, false), "yes");
    }
}
