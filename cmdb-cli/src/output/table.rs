//! Table output formatting using the `tabled` crate
//!
//! Provides table formatting with:
//! - Column width management and truncation
//! - Terminal width awareness
//! - Alignment support

use super::{truncate, Alignment, Column, OutputConfig};
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Alignment as TabledAlignment, Modify, Width},
};

/// Table output formatter
pub struct TableOutput;

impl TableOutput {
    /// Format data as a table with the given columns
    pub fn format_with_columns<T: Serialize>(
        data: &[T],
        columns: &[Column],
        config: &OutputConfig,
    ) -> String {
        if data.is_empty() {
            return "(no results)".to_string();
        }

        let mut builder = Builder::default();

        // Add header row
        let headers: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        builder.push_record(headers);

        // Serialize each item and extract values by key
        for item in data {
            let json = serde_json::to_value(item).unwrap_or_default();
            let row: Vec<String> = columns
                .iter()
                .map(|col| {
                    let value = json.get(&col.key).cloned().unwrap_or_default();
                    Self::format_value(&value, col, config)
                })
                .collect();
            builder.push_record(row);
        }

        let mut table = builder.build();

        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }

        for (i, col) in columns.iter().enumerate() {
            let alignment = match col.align {
                Alignment::Left => TabledAlignment::left(),
                Alignment::Right => TabledAlignment::right(),
            };
            table.with(Modify::new(Columns::single(i)).with(alignment));
        }

        // Limit total table width
        if config.should_truncate() {
            table.with(Width::wrap(config.effective_width()));
        }

        table.to_string()
    }

    /// Format a single JSON value for display
    fn format_value(value: &serde_json::Value, col: &Column, config: &OutputConfig) -> String {
        let s = Self::value_to_string(value);

        if config.should_truncate() {
            if let Some(max_width) = col.max_width {
                return truncate(&s, max_width);
            }
        }
        s
    }

    /// Convert a JSON value to a display string
    fn value_to_string(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Null => "-".to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(arr) => format!("[{} items]", arr.len()),
            serde_json::Value::Object(obj) => format!("{{{} fields}}", obj.len()),
        }
    }

    /// Format a simple key-value table
    pub fn format_key_value(pairs: &[(&str, String)], config: &OutputConfig) -> String {
        let mut builder = Builder::default();

        for (key, value) in pairs {
            builder.push_record([*key, value.as_str()]);
        }

        let mut table = builder.build();

        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }

        table.with(Modify::new(Columns::first()).with(TabledAlignment::right()));

        if config.should_truncate() {
            table.with(Width::wrap(config.effective_width()));
        }

        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestItem {
        name: String,
        value: i32,
    }

    #[test]
    fn test_format_with_columns() {
        let data = vec![
            TestItem {
                name: "foo".to_string(),
                value: 42,
            },
            TestItem {
                name: "bar".to_string(),
                value: 100,
            },
        ];

        let columns = vec![
            Column::new("Name", "name"),
            Column::new("Value", "value").with_alignment(Alignment::Right),
        ];

        let config = OutputConfig::new(super::super::OutputFormat::Table).without_truncation();
        let output = TableOutput::format_with_columns(&data, &columns, &config);

        assert!(output.contains("Name"));
        assert!(output.contains("Value"));
        assert!(output.contains("foo"));
        assert!(output.contains("42"));
    }

    #[test]
    fn test_column_max_width_truncates() {
        let data = vec![TestItem {
            name: "a-very-long-hostname".to_string(),
            value: 1,
        }];
        let columns = vec![Column::new("Name", "name").with_max_width(8)];
        let config = OutputConfig::new(super::super::OutputFormat::Table).with_width(200);
        let output = TableOutput::format_with_columns(&data, &columns, &config);

        assert!(output.contains("a-ver..."));
        assert!(!output.contains("hostname"));
    }

    #[test]
    fn test_empty_data() {
        let data: Vec<TestItem> = vec![];
        let columns = vec![Column::new("Name", "name")];
        let config = OutputConfig::new(super::super::OutputFormat::Table);

        let output = TableOutput::format_with_columns(&data, &columns, &config);
        assert_eq!(output, "(no results)");
    }

    #[test]
    fn test_key_value_table() {
        let pairs = vec![("Name", "Test".to_string()), ("Status", "OK".to_string())];

        let config = OutputConfig::new(super::super::OutputFormat::Table);
        let output = TableOutput::format_key_value(&pairs, &config);

        assert!(output.contains("Name"));
        assert!(output.contains("Test"));
    }
}
