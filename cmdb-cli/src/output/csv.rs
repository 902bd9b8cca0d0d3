//! CSV rendering.
//!
//! Result lists go through [`CsvOutput::format_with_columns`]; every other
//! document is a single object and becomes a header row plus one value row.

use super::{Column, OutputConfig};
use serde::Serialize;
use serde_json::Value;

/// CSV output formatter
pub struct CsvOutput;

impl CsvOutput {
    /// One header row of field names and one row of values.
    pub fn format<T: Serialize>(data: &T, _config: &OutputConfig) -> String {
        match serde_json::to_value(data) {
            Ok(Value::Object(fields)) => {
                let header: Vec<&str> = fields.keys().map(String::as_str).collect();
                let row: Vec<String> = fields.values().map(cell).collect();
                format!("{}\n{}", header.join(","), row.join(","))
            }
            Ok(other) => cell(&other),
            Err(_) => String::new(),
        }
    }

    /// Header of column names, then one line per item. The header is written
    /// even when there are no items.
    pub fn format_with_columns<T: Serialize>(
        data: &[T],
        columns: &[Column],
        _config: &OutputConfig,
    ) -> String {
        let mut lines = vec![columns
            .iter()
            .map(|c| escape(&c.name))
            .collect::<Vec<_>>()
            .join(",")];

        for item in data {
            let Ok(row) = serde_json::to_value(item) else {
                continue;
            };
            let cells: Vec<String> = columns
                .iter()
                .map(|c| row.get(&c.key).map(cell).unwrap_or_default())
                .collect();
            lines.push(cells.join(","));
        }

        lines.join("\n")
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => escape(s),
        Value::Array(items) => escape(
            &items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(";"),
        ),
        other => escape(&other.to_string()),
    }
}

/// Quote a field that contains a separator, quote or line break; embedded
/// quotes are doubled.
fn escape(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
