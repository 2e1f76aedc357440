//! Execute tests for schema command.

#[cfg(test)]
mod tests {
    use super::super::SchemaCmd;
    use crate::commands::Execute;
    use crate::db::DatabaseConfig;
    use crate::test_utils::seeded_sqlite_config;

    #[tokio::test]
    async fn test_schema_lists_movies() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_sqlite_config(dir.path()).await;

        let result = SchemaCmd { name: None }.execute(&config).await.unwrap();

        assert_eq!(result.backend, "SQLite");
        let databases = result.schema.database_names();
        assert_eq!(databases.len(), 1);
        assert_eq!(result.schema.table_names(databases[0]), ["movies"]);
        assert_eq!(
            result.schema.column_names(databases[0], "movies"),
            ["movieID", "releaseDate", "title"]
        );
        assert_eq!(result.schema.column_type(databases[0], "movies", "movieID"), Some("INTEGER"));
    }

    #[tokio::test]
    async fn test_schema_restricted_to_unknown_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_sqlite_config(dir.path()).await;

        let result = SchemaCmd { name: Some("shows".to_string()) }.execute(&config).await.unwrap();

        assert!(result.schema.is_empty());
    }

    #[tokio::test]
    async fn test_schema_restricted_to_known_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_sqlite_config(dir.path()).await;
        let name = match &config {
            DatabaseConfig::Sqlite { path } => path.display().to_string(),
            other => panic!("Expected SQLite config, got {:?}", other),
        };

        let result = SchemaCmd { name: Some(name.clone()) }.execute(&config).await.unwrap();

        assert_eq!(result.schema.database_names(), [name.as_str()]);
    }

    #[tokio::test]
    async fn test_schema_empty_memory_database() {
        let result = SchemaCmd { name: None }.execute(&DatabaseConfig::Memory).await.unwrap();
        assert!(result.schema.is_empty());
    }
}
