//! Report rendering
//!
//! A report is the echoed query, then either a no-data notice or the rows as
//! a pretty JSON array, then a record count. The whole report is kept within
//! a character budget by dropping trailing rows whole and closing the array
//! with a marker object, so the JSON stays parseable.

use serde_json::{json, Map, Number, Value as JsonValue};

use crate::types::{Row, Value};

pub const NO_DATA_MESSAGE: &str = "No matching data found.";
pub const ROW_LIMIT_MESSAGE: &str = "omitted due to row limit";
pub const CHAR_LIMIT_MESSAGE: &str = "omitted due to character limit, refine your query";

fn header(query: &str) -> String {
    format!("Query: {}\n\n", query)
}

fn footer(count: usize) -> String {
    let noun = if count == 1 { "record" } else { "records" };
    format!("\n\n{} {} found", count, noun)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn render_value(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Int(i) => JsonValue::from(*i),
        Value::UInt(u) => JsonValue::from(*u),
        Value::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(f.to_string())),
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Binary(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => JsonValue::String(text.to_string()),
            Err(e) => JsonValue::String(format!("<binary decode error: {}>", e)),
        },
    }
}

fn render_row(row: &Row) -> JsonValue {
    let object: Map<String, JsonValue> = row
        .iter()
        .map(|(name, value)| (name.to_string(), render_value(value)))
        .collect();
    JsonValue::Object(object)
}

fn marker(message: &str) -> JsonValue {
    json!({ "message": message })
}

/// Pretty-print one array element at array indentation.
fn render_element(value: &JsonValue) -> String {
    // Serializing a `serde_json::Value` cannot fail.
    let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
    pretty
        .lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Same layout as `serde_json::to_string_pretty` on the whole array
fn render_array(elements: &[String]) -> String {
    if elements.is_empty() {
        return "[]".to_string();
    }
    format!("[\n{}\n]", elements.join(",\n"))
}

/// Render the report for one request, at most `max_chars` characters long.
pub fn format_report(query: &str, rows: &[Row], more_rows: bool, max_chars: usize) -> String {
    let header = header(query);

    if rows.is_empty() {
        return cap(format!("{}{}", header, NO_DATA_MESSAGE), max_chars);
    }

    let footer = footer(rows.len());
    let data: Vec<String> = rows
        .iter()
        .map(|row| render_element(&render_row(row)))
        .collect();
    let row_marker = more_rows.then(|| render_element(&marker(ROW_LIMIT_MESSAGE)));

    let mut elements = data.clone();
    elements.extend(row_marker.clone());
    let report = format!("{}{}{}", header, render_array(&elements), footer);
    if char_len(&report) <= max_chars {
        return report;
    }

    // Over budget: keep leading rows whole, then the markers.
    let mut tail = vec![render_element(&marker(CHAR_LIMIT_MESSAGE))];
    tail.extend(row_marker);

    let fixed = char_len(&header) + char_len(&footer) + char_len(&render_array(&tail));
    let mut budget = max_chars.saturating_sub(fixed);

    let mut kept = Vec::new();
    for element in data {
        // Each kept row also costs its ",\n" separator.
        let cost = char_len(&element) + 2;
        if cost > budget {
            break;
        }
        budget -= cost;
        kept.push(element);
    }

    tracing::debug!(
        kept = kept.len(),
        total = rows.len(),
        max_chars,
        "Report truncated to character limit"
    );

    kept.extend(tail);
    cap(
        format!("{}{}{}", header, render_array(&kept), footer),
        max_chars,
    )
}

/// Hard cut for budgets too small to hold even the markers.
fn cap(report: String, max_chars: usize) -> String {
    match report.char_indices().nth(max_chars) {
        Some((end, _)) => report[..end].to_string(),
        None => report,
    }
}
