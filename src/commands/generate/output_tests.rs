//! Output formatting tests for generate command.

#[cfg(test)]
mod tests {
    use super::super::execute::GenerateResult;
    use crate::generators::{BackendKind, GeneratedQuery, StatementSet};
    use crate::model::{QueryCommand, Value};
    use rstest::{fixture, rstest};

    // =========================================================================
    // Expected outputs
    // =========================================================================

    const INLINE_TABLE: &str = "\
-- sqlite select on movies
SELECT * FROM \"movies\" WHERE \"movies\".\"title\" = 'Alien';";

    const PLACEHOLDER_TABLE: &str = "\
-- mysql upsert on movies
REPLACE INTO `movies` (`title`) VALUES (?);
-- params: [\"Heat\"]
SELECT LAST_INSERT_ROWID();";

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn statements(pairs: Vec<(&str, Vec<Value>)>) -> StatementSet {
        let mut set = StatementSet::new();
        for (statement, values) in pairs {
            set.push(statement.to_string(), values);
        }
        set
    }

    #[fixture]
    fn inline_result() -> GenerateResult {
        GenerateResult {
            backend: BackendKind::Sqlite,
            command: QueryCommand::Select,
            table: "movies".to_string(),
            placeholders: false,
            generated: GeneratedQuery::Sql(statements(vec![(
                "SELECT * FROM \"movies\" WHERE \"movies\".\"title\" = 'Alien';",
                vec![],
            )])),
        }
    }

    #[fixture]
    fn placeholder_result() -> GenerateResult {
        GenerateResult {
            backend: BackendKind::MySql,
            command: QueryCommand::Upsert,
            table: "movies".to_string(),
            placeholders: true,
            generated: GeneratedQuery::Sql(statements(vec![
                ("REPLACE INTO `movies` (`title`) VALUES (?);", vec![Value::from("Heat")]),
                ("SELECT LAST_INSERT_ROWID();", vec![]),
            ])),
        }
    }

    // =========================================================================
    // Tests
    // =========================================================================

    crate::output_table_test! {
        test_name: test_to_table_inline,
        fixture: inline_result,
        fixture_type: GenerateResult,
        expected: INLINE_TABLE,
    }

    crate::output_table_test! {
        test_name: test_to_table_placeholders,
        fixture: placeholder_result,
        fixture_type: GenerateResult,
        expected: PLACEHOLDER_TABLE,
    }

    crate::output_json_test! {
        test_name: test_format_json,
        fixture: placeholder_result,
        fixture_type: GenerateResult,
        assertions: {
            "backend": "mysql",
            "command": "upsert",
            "placeholders": true,
            "generated": serde_json::json!({
                "statements": [
                    "REPLACE INTO `movies` (`title`) VALUES (?);",
                    "SELECT LAST_INSERT_ROWID();"
                ],
                "values": [["Heat"], []]
            }),
        },
    }

    crate::output_toon_test! {
        test_name: test_format_toon,
        fixture: inline_result,
        fixture_type: GenerateResult,
        contains: ["backend: sqlite", "table: movies"],
    }
}
