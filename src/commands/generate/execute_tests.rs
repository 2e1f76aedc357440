//! Execute tests for generate command.

#[cfg(test)]
mod tests {
    use super::super::GenerateCmd;
    use crate::generators::{BackendKind, GeneratedQuery};
    use crate::model::{QueryCommand, Value};

    const TITLE_QUERY: &str = r#"{
        "table": {"name": "movies", "primary_keys": ["movieID"], "columns": ["title", "releaseDate"]},
        "filters": [{"column": "title", "op": "==", "value": "Alien"}],
        "take": 1
    }"#;

    // Backend falls back to the configured database (SQLite here)
    crate::execute_test! {
        test_name: test_generate_uses_configured_backend,
        query: TITLE_QUERY,
        cmd: |query| GenerateCmd { query, backend: None, placeholders: false },
        assertions: |result| {
            assert_eq!(result.backend, BackendKind::Sqlite);
            assert_eq!(result.command, QueryCommand::Select);
            assert_eq!(result.table, "movies");
            assert_eq!(
                result.generated.to_display_string(),
                r#"SELECT * FROM "movies" WHERE "movies"."title" = 'Alien' LIMIT 1;"#
            );
        },
    }

    crate::execute_test! {
        test_name: test_generate_mysql_placeholders,
        query: TITLE_QUERY,
        cmd: |query| GenerateCmd { query, backend: Some(BackendKind::MySql), placeholders: true },
        assertions: |result| {
            let set = result.generated.as_sql().unwrap();
            assert_eq!(set.statements, ["SELECT * FROM `movies` WHERE `movies`.`title` = ? LIMIT 1;"]);
            assert_eq!(set.values, [vec![Value::from("Alien")]]);
        },
    }

    crate::execute_test! {
        test_name: test_generate_postgres_placeholders,
        query: TITLE_QUERY,
        cmd: |query| GenerateCmd { query, backend: Some(BackendKind::Postgres), placeholders: true },
        assertions: |result| {
            let set = result.generated.as_sql().unwrap();
            assert_eq!(set.statements, [r#"SELECT * FROM "movies" WHERE "movies"."title" = $1 LIMIT 1;"#]);
        },
    }

    crate::execute_test! {
        test_name: test_generate_elastic,
        query: TITLE_QUERY,
        cmd: |query| GenerateCmd { query, backend: Some(BackendKind::Elastic), placeholders: false },
        assertions: |result| {
            match &result.generated {
                GeneratedQuery::Elastic(queries) => {
                    assert_eq!(queries.len(), 1);
                    assert_eq!(queries[0].index, "movies");
                    assert_eq!(queries[0].op, QueryCommand::Select);
                }
                other => panic!("Expected Elasticsearch output, got {:?}", other),
            }
        },
    }

    crate::execute_test! {
        test_name: test_generate_upsert_runs,
        query: r#"{
            "table": {"name": "movies", "primary_keys": ["movieID"], "columns": ["title"]},
            "command": "upsert",
            "rows": [{"title": "Heat"}, {"movieID": 7, "title": "Ran"}]
        }"#,
        cmd: |query| GenerateCmd { query, backend: Some(BackendKind::MySql), placeholders: true },
        assertions: |result| {
            assert_eq!(result.command, QueryCommand::Upsert);
            assert_eq!(result.generated.as_sql().unwrap().len(), 2);
        },
    }

    crate::execute_error_test! {
        test_name: test_generate_unknown_column,
        query: r#"{"table": {"name": "movies"}, "columns": ["rating"]}"#,
        cmd: |query| GenerateCmd { query, backend: None, placeholders: false },
        expected_error: "Unknown column 'rating' on table 'movies'",
    }

    crate::execute_error_test! {
        test_name: test_generate_elastic_rejects_aliases,
        query: r#"{"table": {"name": "movies", "columns": ["title"]}, "aliases": [{"name": "n", "column": "title"}]}"#,
        cmd: |query| GenerateCmd { query, backend: Some(BackendKind::Elastic), placeholders: false },
        expected_error: "aliases are not supported by Elasticsearch",
    }
}
