//! Output formatting utilities for the query tools.
//!
//! Renders positional result rows as an ASCII table (Trino CLI style) or a
//! markdown table.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

use crate::models::ColumnMetadata;

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// ASCII table format
    Table,
    /// Markdown table format
    Markdown,
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

fn cell(row: &[JsonValue], idx: usize) -> &JsonValue {
    row.get(idx).unwrap_or(&JsonValue::Null)
}

pub fn format_as_table(
    columns: &[ColumnMetadata],
    rows: &[Vec<JsonValue>],
    truncated: bool,
    execution_time_ms: u64,
) -> String {
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.name.width()).collect();
    for row in rows {
        for (i, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(format_value(cell(row, i)).width());
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| pad_center(&col.name, *w))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in rows {
        let row_str: String = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = cell(row, i);
                let formatted = format_value(value);
                if matches!(value, JsonValue::Number(_)) {
                    pad_right_align(&formatted, *w)
                } else {
                    pad_left_align(&formatted, *w)
                }
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_text = if rows.len() == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "{} {}{} ({:.2} sec)\n",
        rows.len(),
        row_text,
        if truncated { " (truncated)" } else { "" },
        execution_time_ms as f64 / 1000.0
    ));

    output
}

pub fn format_as_markdown(
    columns: &[ColumnMetadata],
    rows: &[Vec<JsonValue>],
    truncated: bool,
) -> String {
    if columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();

    let header: String = columns
        .iter()
        .map(|c| format!("| {} ", escape_markdown(&c.name)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in rows {
        let row_str: String = (0..columns.len())
            .map(|i| format!("| {} ", escape_markdown(&format_value(cell(row, i)))))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&format!(
        "\n*{} rows{}*",
        rows.len(),
        if truncated { ", truncated" } else { "" }
    ));

    output
}

// std's width formatting counts chars, not display columns
fn pad_left_align(s: &str, width: usize) -> String {
    format!("| {}{} ", s, " ".repeat(width.saturating_sub(s.width())))
}

fn pad_right_align(s: &str, width: usize) -> String {
    format!("| {}{} ", " ".repeat(width.saturating_sub(s.width())), s)
}

fn pad_center(s: &str, width: usize) -> String {
    let total = width.saturating_sub(s.width());
    let left = total / 2;
    format!("| {}{}{} ", " ".repeat(left), s, " ".repeat(total - left))
}

fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
