//! Output formatting for generate command results.

use super::execute::GenerateResult;
use crate::generators::GeneratedQuery;
use crate::output::Outputable;

impl Outputable for GenerateResult {
    fn to_table(&self) -> String {
        let mut lines = vec![format!(
            "-- {} {} on {}",
            self.backend,
            self.command.as_str(),
            self.table
        )];

        match &self.generated {
            GeneratedQuery::Sql(set) if self.placeholders => {
                for (statement, values) in set.iter() {
                    lines.push(statement.to_string());
                    if !values.is_empty() {
                        let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                        lines.push(format!("-- params: [{}]", rendered.join(", ")));
                    }
                }
            }
            generated => lines.push(generated.to_display_string()),
        }

        lines.join("\n")
    }
}
