//! SQLite driver.
//!
//! File databases are opened through a small pool; in-memory databases use a
//! single pinned connection so every statement sees the same data.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, SqliteConnection};
use tracing::{debug, info, warn};

use super::backend::{assign_ids, ConnectionStatus, TastyDb, TransactionHandle};
use super::sql_statements;
use crate::error::Result;
use crate::generators::escape::quote_identifier;
use crate::generators::sql::{partition_runs, SqlDialect, SqliteDialect, LAST_INSERT_ROWID};
use crate::generators::{BackendKind, GeneratedQuery, ParameterMode, StatementSet};
use crate::model::{Row, Schema, Table, Value, DATE_FORMAT};

pub const MEMORY_NAME: &str = ":memory:";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

pub struct SqliteDb {
    pool: SqlitePool,
    /// Reported as the database name in schemas.
    name: String,
    dialect: SqliteDialect,
}

impl SqliteDb {
    /// Open (or create) a database file.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        info!(path = %path.display(), "opened SQLite database");
        Ok(Self {
            pool,
            name: path.display().to_string(),
            dialect: SqliteDialect,
        })
    }

    /// Create an in-memory SQLite database
    pub async fn memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool,
            name: MEMORY_NAME.to_string(),
            dialect: SqliteDialect,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run unparameterized SQL (DDL, pragmas, multi-statement scripts).
    pub async fn execute_raw(&self, sql: &str) -> Result<()> {
        debug!(sql, "executing raw SQL");
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn run_statements(conn: &mut SqliteConnection, statements: &StatementSet) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for (sql, values) in statements.iter() {
            debug!(sql, params = values.len(), "executing statement");
            let result = bind_values(sqlx::query(sql), values).fetch_all(&mut *conn).await?;
            rows.extend(result.iter().map(convert_row));
        }
        Ok(rows)
    }
}

fn bind_values<'q>(mut query: SqliteQuery<'q>, values: &'q [Value]) -> SqliteQuery<'q> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Str(s) => query.bind(s.as_str()),
            // stored as text so it compares equal to the inline form
            Value::Date(d) => query.bind(d.format(DATE_FORMAT).to_string()),
        };
    }
    query
}

/// Convert a SQLite row into a JSON row, trying the storage classes in turn.
fn convert_row(row: &SqliteRow) -> Row {
    let mut out = Row::new();

    for column in row.columns() {
        let name = column.name();

        let value = if let Ok(Some(value)) = row.try_get::<Option<String>, _>(name) {
            JsonValue::String(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<i64>, _>(name) {
            JsonValue::from(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<f64>, _>(name) {
            serde_json::Number::from_f64(value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)
        } else if let Ok(Some(value)) = row.try_get::<Option<Vec<u8>>, _>(name) {
            JsonValue::from(value)
        } else {
            JsonValue::Null
        };
        out.insert(name.to_string(), value);
    }

    out
}

#[async_trait]
impl TastyDb for SqliteDb {
    fn backend_name(&self) -> &'static str {
        "SQLite"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn execute(
        &self,
        generated: &GeneratedQuery,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        self.reject_handle(handle)?;
        let statements = sql_statements(self, generated)?;
        let mut conn = self.pool.acquire().await?;
        Self::run_statements(&mut *conn, statements).await
    }

    async fn upsert(
        &self,
        table: &Table,
        rows: Vec<Row>,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        self.reject_handle(handle)?;
        let mut conn = self.pool.acquire().await?;
        let mut ids = Vec::new();

        for run in partition_runs(table, &rows) {
            let statements = self.dialect.upsert_run(table, &run, ParameterMode::Placeholders)?;
            for (sql, values) in statements.iter() {
                debug!(sql, params = values.len(), "executing statement");
                if sql == LAST_INSERT_ROWID {
                    // REPLACE assigns consecutive rowids within one statement
                    let last: i64 = sqlx::query_scalar(sql).fetch_one(&mut *conn).await?;
                    let count = run.rows.len() as i64;
                    ids.extend((last - count + 1..=last).map(JsonValue::from));
                } else {
                    bind_values(sqlx::query(sql), values).execute(&mut *conn).await?;
                }
            }
        }

        Ok(assign_ids(table, rows, ids))
    }

    async fn schema(&self) -> Result<Schema> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut schema = Schema::new();
        for table in tables {
            let pragma = format!("PRAGMA table_info({})", quote_identifier(&table, '"'));
            for column in sqlx::query(&pragma).fetch_all(&self.pool).await? {
                let name: String = column.try_get("name")?;
                let column_type: String = column.try_get("type")?;
                schema.add_column(&self.name, &table, name, column_type);
            }
        }
        Ok(schema)
    }

    async fn is_connected(&self) -> ConnectionStatus {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => ConnectionStatus::Connected,
            Err(e) => {
                let status = ConnectionStatus::from_sqlx(&e);
                warn!(%status, "SQLite connection check failed");
                status
            }
        }
    }

    async fn destroy(&self) -> Result<()> {
        self.pool.close().await;
        info!(name = %self.name, "closed SQLite database");
        Ok(())
    }
}
