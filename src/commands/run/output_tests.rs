//! Output formatting tests for run command.

#[cfg(test)]
mod tests {
    use super::super::execute::RunResult;
    use crate::model::QueryCommand;
    use crate::test_utils::row;
    use rstest::{fixture, rstest};
    use serde_json::json;

    // =========================================================================
    // Expected outputs
    // =========================================================================

    const EMPTY_TABLE: &str = "SQLite delete on movies: 0 rows";

    const SELECT_TABLE: &str = "\
PostgreSQL select on movies: 2 rows

movieID  title
-------  -----
1        Alien
2        Heat";

    const SINGLE_TABLE: &str = "\
MySQL upsert on movies: 1 row

movieID  title
-------  -----
3        Ran";

    // =========================================================================
    // Fixtures
    // =========================================================================

    #[fixture]
    fn empty_result() -> RunResult {
        RunResult {
            backend: "SQLite".to_string(),
            command: QueryCommand::Delete,
            table: "movies".to_string(),
            count: 0,
            rows: vec![],
        }
    }

    #[fixture]
    fn select_result() -> RunResult {
        RunResult {
            backend: "PostgreSQL".to_string(),
            command: QueryCommand::Select,
            table: "movies".to_string(),
            count: 2,
            rows: vec![
                row(json!({"movieID": 1, "title": "Alien"})),
                row(json!({"movieID": 2, "title": "Heat"})),
            ],
        }
    }

    #[fixture]
    fn single_result() -> RunResult {
        RunResult {
            backend: "MySQL".to_string(),
            command: QueryCommand::Upsert,
            table: "movies".to_string(),
            count: 1,
            rows: vec![row(json!({"movieID": 3, "title": "Ran"}))],
        }
    }

    #[fixture]
    fn sparse_result() -> RunResult {
        RunResult {
            backend: "SQLite".to_string(),
            command: QueryCommand::Select,
            table: "movies".to_string(),
            count: 2,
            rows: vec![
                row(json!({"title": "Alien", "releaseDate": "1979-05-25"})),
                row(json!({"title": "Ran"})),
            ],
        }
    }

    // =========================================================================
    // Tests
    // =========================================================================

    crate::output_table_test! {
        test_name: test_to_table_empty,
        fixture: empty_result,
        fixture_type: RunResult,
        expected: EMPTY_TABLE,
    }

    crate::output_table_test! {
        test_name: test_to_table_select,
        fixture: select_result,
        fixture_type: RunResult,
        expected: SELECT_TABLE,
    }

    crate::output_table_test! {
        test_name: test_to_table_single_row,
        fixture: single_result,
        fixture_type: RunResult,
        expected: SINGLE_TABLE,
    }

    crate::output_table_contains_test! {
        test_name: test_to_table_missing_cell_is_null,
        fixture: sparse_result,
        fixture_type: RunResult,
        contains: ["releaseDate  title", "NULL         Ran"],
    }

    crate::output_json_test! {
        test_name: test_format_json,
        fixture: select_result,
        fixture_type: RunResult,
        assertions: {
            "backend": "PostgreSQL",
            "command": "select",
            "count": 2,
            "rows": json!([{"movieID": 1, "title": "Alien"}, {"movieID": 2, "title": "Heat"}]),
        },
    }

    crate::output_toon_test! {
        test_name: test_format_toon,
        fixture: select_result,
        fixture_type: RunResult,
        contains: ["backend: PostgreSQL", "count: 2", "rows[2]"],
    }
}
