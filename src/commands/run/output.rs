//! Output formatting for run command results.

use super::execute::RunResult;
use crate::output::{rows_table, Outputable};

impl Outputable for RunResult {
    fn to_table(&self) -> String {
        let noun = if self.count == 1 { "row" } else { "rows" };
        let mut lines = vec![format!(
            "{} {} on {}: {} {}",
            self.backend,
            self.command.as_str(),
            self.table,
            self.count,
            noun
        )];

        if !self.rows.is_empty() {
            lines.push(String::new());
            lines.push(rows_table(&self.rows));
        }

        lines.join("\n")
    }
}
