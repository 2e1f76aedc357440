//! MySQL driver.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, MySql, MySqlConnection, Row as _};
use tracing::{debug, info, warn};

use super::backend::{assign_ids, ConnectionStatus, TastyDb, TransactionHandle};
use super::sql_statements;
use crate::error::{Result, TastyError};
use crate::generators::sql::{partition_runs, MySqlDialect, SqlDialect};
use crate::generators::{BackendKind, GeneratedQuery, ParameterMode, StatementSet};
use crate::model::{Row, Schema, Table, Value, DATE_FORMAT};

const SCHEMA_QUERY: &str = "SELECT table_schema AS table_schema, table_name AS table_name, \
    column_name AS column_name, data_type AS data_type \
    FROM information_schema.columns \
    WHERE table_schema NOT IN ('information_schema', 'performance_schema', 'mysql', 'sys');";

type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;

pub struct MySqlDb {
    pool: MySqlPool,
    dialect: MySqlDialect,
}

impl MySqlDb {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| {
                let status = ConnectionStatus::from_sqlx(&e);
                warn!(%status, "MySQL connection failed");
                TastyError::Connection { status }
            })?;
        info!("connected to MySQL");
        Ok(Self {
            pool,
            dialect: MySqlDialect,
        })
    }

    async fn run_statements(conn: &mut MySqlConnection, statements: &StatementSet) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for (sql, values) in statements.iter() {
            debug!(sql, params = values.len(), "executing statement");
            let result = bind_values(sqlx::query(sql), values).fetch_all(&mut *conn).await?;
            rows.extend(result.iter().map(convert_row));
        }
        Ok(rows)
    }
}

fn bind_values<'q>(mut query: MySqlQuery<'q>, values: &'q [Value]) -> MySqlQuery<'q> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Str(s) => query.bind(s.as_str()),
            Value::Date(d) => query.bind(*d),
        };
    }
    query
}

fn convert_row(row: &MySqlRow) -> Row {
    let mut out = Row::new();

    for column in row.columns() {
        let name = column.name();

        let value = if let Ok(Some(value)) = row.try_get::<Option<String>, _>(name) {
            JsonValue::String(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<i64>, _>(name) {
            JsonValue::from(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<u64>, _>(name) {
            JsonValue::from(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<f64>, _>(name) {
            serde_json::Number::from_f64(value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)
        } else if let Ok(Some(value)) = row.try_get::<Option<NaiveDateTime>, _>(name) {
            JsonValue::String(value.format(DATE_FORMAT).to_string())
        } else if let Ok(Some(value)) = row.try_get::<Option<JsonValue>, _>(name) {
            value
        } else {
            JsonValue::Null
        };
        out.insert(name.to_string(), value);
    }

    out
}

#[async_trait]
impl TastyDb for MySqlDb {
    fn backend_name(&self) -> &'static str {
        "MySQL"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::MySql
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

    /// Rows that leave the single key to `AUTO_INCREMENT` receive
    /// consecutive ids starting at the statement's `LAST_INSERT_ID()`.
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
                let result = bind_values(sqlx::query(sql), values).execute(&mut *conn).await?;
                if table.has_single_key() && !run.has_primary_key(table) {
                    let first = result.last_insert_id();
                    ids.extend((0..run.rows.len() as u64).map(|i| JsonValue::from(first + i)));
                }
            }
        }

        Ok(assign_ids(table, rows, ids))
    }

    async fn schema(&self) -> Result<Schema> {
        let rows = sqlx::query(SCHEMA_QUERY).fetch_all(&self.pool).await?;
        let rows: Vec<Row> = rows.iter().map(convert_row).collect();
        Ok(Schema::from_sql_result_set(&rows))
    }

    async fn is_connected(&self) -> ConnectionStatus {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => ConnectionStatus::Connected,
            Err(e) => {
                let status = ConnectionStatus::from_sqlx(&e);
                warn!(%status, "MySQL connection check failed");
                status
            }
        }
    }

    async fn destroy(&self) -> Result<()> {
        self.pool.close().await;
        info!("closed MySQL pool");
        Ok(())
    }
}
