//! Output formatting for command results.
//!
//! Supports multiple output formats: table (human-readable), JSON, and toon.

use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::model::Row;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Token-efficient toon format
    Toon,
}

/// Trait for types that can be formatted for output
pub trait Outputable: Serialize {
    /// Format as a human-readable table
    fn to_table(&self) -> String;

    /// Format according to the specified output format
    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => self.to_table(),
            OutputFormat::Json => serde_json::to_string_pretty(self).unwrap_or_default(),
            OutputFormat::Toon => {
                let json_value = serde_json::to_value(self).unwrap_or_default();
                toon::encode(&json_value, None)
            }
        }
    }
}

fn cell(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => "NULL".to_string(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render rows as left-aligned columns under a header line.
///
/// Column order follows first appearance across the rows; a row without a
/// column shows `NULL` in that cell.
pub fn rows_table(rows: &[Row]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    if columns.is_empty() {
        return String::new();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| cell(row.get(*c))).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|line| line[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let rules: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut lines = vec![render(columns.clone())];
    lines.push(render(rules.iter().map(String::as_str).collect()));
    for line in &cells {
        lines.push(render(line.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::row;
    use serde_json::json;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        count: usize,
    }

    impl Outputable for Sample {
        fn to_table(&self) -> String {
            format!("{}: {}", self.name, self.count)
        }
    }

    #[test]
    fn test_format_table_uses_to_table() {
        let sample = Sample { name: "movies".into(), count: 2 };
        assert_eq!(sample.format(OutputFormat::Table), "movies: 2");
    }

    #[test]
    fn test_format_json_is_pretty() {
        let sample = Sample { name: "movies".into(), count: 2 };
        assert_eq!(
            sample.format(OutputFormat::Json),
            "{\n  \"name\": \"movies\",\n  \"count\": 2\n}"
        );
    }

    #[test]
    fn test_format_toon() {
        let sample = Sample { name: "movies".into(), count: 2 };
        let output = sample.format(OutputFormat::Toon);
        assert!(output.contains("name: movies"));
        assert!(output.contains("count: 2"));
    }

    #[test]
    fn test_rows_table_aligns_columns() {
        let rows = vec![
            row(json!({"movieID": 1, "title": "Alien"})),
            row(json!({"movieID": 20, "title": null})),
        ];
        let expected = "\
movieID  title
-------  -----
1        Alien
20       NULL";
        assert_eq!(rows_table(&rows), expected);
    }

    #[test]
    fn test_rows_table_missing_column() {
        let rows = vec![row(json!({"a": 1})), row(json!({"b": "x"}))];
        let expected = "\
a     b
----  ----
1     NULL
NULL  x";
        assert_eq!(rows_table(&rows), expected);
    }

    #[test]
    fn test_rows_table_empty() {
        assert_eq!(rows_table(&[]), "");
    }
}
