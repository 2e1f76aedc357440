//! Output formatting for schema command results.

use super::execute::SchemaResult;
use crate::output::Outputable;

impl Outputable for SchemaResult {
    fn to_table(&self) -> String {
        let mut lines = vec![format!("Schema ({})", self.backend), String::new()];

        if self.schema.is_empty() {
            lines.push("No tables found.".to_string());
            return lines.join("\n");
        }

        for (database, tables) in self.schema.databases() {
            lines.push(database.clone());
            for (table, columns) in tables {
                lines.push(format!("  {}", table));
                let width = columns.keys().map(|c| c.chars().count()).max().unwrap_or(0);
                for (column, info) in columns {
                    lines.push(format!("    {:<width$}  {}", column, info.column_type, width = width));
                }
            }
        }

        lines.join("\n")
    }
}
