//! PostgreSQL driver with connection-pinned transactions.
//!
//! A transaction handle owns one pooled connection from `START TRANSACTION`
//! until `COMMIT` or `ROLLBACK`. Statements tagged with the handle run on
//! that connection; untagged statements borrow any pooled connection for
//! the duration of one batch.

mod conversion;

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Either, Executor, PgConnection, Postgres, Statement};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use self::conversion::{bind_values, cast_text_params, convert_row, inference_sql, inference_types, text_casts};
use super::backend::{assign_ids, ConnectionStatus, TastyDb, TransactionHandle};
use super::sql_statements;
use crate::error::{Result, TastyError};
use crate::generators::sql::{partition_runs, IsolationLevel, PostgresDialect, SqlDialect};
use crate::generators::{BackendKind, GeneratedQuery, ParameterMode, StatementSet};
use crate::model::{Row, Schema, Table, Value};

const SCHEMA_QUERY: &str = "SELECT table_schema::text AS table_schema, table_name::text AS table_name, \
    column_name::text AS column_name, data_type::text AS data_type \
    FROM information_schema.columns \
    WHERE table_schema NOT IN ('information_schema', 'pg_catalog');";

type PinnedConnection = Arc<AsyncMutex<PoolConnection<Postgres>>>;

pub struct PostgresDb {
    pool: PgPool,
    dialect: PostgresDialect,
    transactions: Mutex<HashMap<u64, PinnedConnection>>,
    next_handle: AtomicU64,
}

impl PostgresDb {
    /// Connect and verify the server is reachable.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| {
                let status = ConnectionStatus::from_sqlx(&e);
                warn!(%status, "PostgreSQL connection failed");
                TastyError::Connection { status }
            })?;
        info!("connected to PostgreSQL");
        Ok(Self::with_pool(pool))
    }

    /// Build a driver whose pool connects on first use.
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect_lazy(url)?;
        Ok(Self::with_pool(pool))
    }

    fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            dialect: PostgresDialect,
            transactions: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(0),
        }
    }

    /// Number of transactions currently holding a connection.
    pub fn open_transactions(&self) -> usize {
        self.transactions().map(|map| map.len()).unwrap_or(0)
    }

    fn transactions(&self) -> Result<MutexGuard<'_, HashMap<u64, PinnedConnection>>> {
        self.transactions
            .lock()
            .map_err(|_| TastyError::transaction("transaction table lock poisoned"))
    }

    fn pinned(&self, handle: TransactionHandle) -> Result<PinnedConnection> {
        self.transactions()?
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| TastyError::transaction(format!("unknown transaction handle {}", handle)))
    }

    fn release(&self, handle: TransactionHandle) -> Result<PinnedConnection> {
        self.transactions()?
            .remove(&handle.0)
            .ok_or_else(|| TastyError::transaction(format!("unknown transaction handle {}", handle)))
    }

    /// Cast string parameters to the types the server infers for them.
    async fn typed_sql<'a>(conn: &mut PgConnection, sql: &'a str, values: &[Value]) -> Result<Cow<'a, str>> {
        if !values.iter().any(|v| matches!(v, Value::Str(_))) {
            return Ok(Cow::Borrowed(sql));
        }
        let inference = inference_sql(sql, values);
        let declared = inference_types(values);
        let statement = (&mut *conn).prepare_with(&inference, &declared).await?;
        let casts = match statement.parameters() {
            Some(Either::Left(types)) => text_casts(types, values),
            _ => return Ok(Cow::Borrowed(sql)),
        };
        if casts.is_empty() {
            return Ok(Cow::Borrowed(sql));
        }
        debug!(?casts, "casting string parameters");
        Ok(Cow::Owned(cast_text_params(sql, &casts)))
    }

    async fn run_statements(conn: &mut PgConnection, statements: &StatementSet) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for (sql, values) in statements.iter() {
            debug!(sql, params = values.len(), "executing statement");
            let sql = Self::typed_sql(conn, sql, values).await?;
            let result = bind_values(sqlx::query(&sql), values)
                .persistent(false)
                .fetch_all(&mut *conn)
                .await?;
            rows.extend(result.iter().map(convert_row));
        }
        Ok(rows)
    }

    /// Run every upsert run, returning the `insertid` of rows that left the
    /// single key to the server.
    async fn upsert_runs(&self, conn: &mut PgConnection, table: &Table, rows: &[Row]) -> Result<Vec<JsonValue>> {
        let mut ids = Vec::new();
        for run in partition_runs(table, rows) {
            let statements = self.dialect.upsert_run(table, &run, ParameterMode::Placeholders)?;
            let returned = Self::run_statements(conn, &statements).await?;
            if table.has_single_key() && !run.has_primary_key(table) {
                ids.extend(
                    returned
                        .into_iter()
                        .map(|mut row| row.remove("insertid").unwrap_or(JsonValue::Null)),
                );
            }
        }
        Ok(ids)
    }

    async fn finish_transaction(&self, handle: TransactionHandle, statements: StatementSet) -> Result<()> {
        let pinned = self.release(handle)?;
        let mut conn = pinned.lock().await;
        for (sql, _) in statements.iter() {
            debug!(sql, %handle, "finishing transaction");
            (&mut **conn).execute(sqlx::raw_sql(sql)).await?;
        }
        info!(%handle, "transaction finished");
        Ok(())
    }
}

#[async_trait]
impl TastyDb for PostgresDb {
    fn backend_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn execute(
        &self,
        generated: &GeneratedQuery,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        let statements = sql_statements(self, generated)?;
        match handle {
            Some(handle) => {
                let pinned = self.pinned(handle)?;
                let mut conn = pinned.lock().await;
                Self::run_statements(&mut conn, statements).await
            }
            None => {
                let mut conn = self.pool.acquire().await?;
                Self::run_statements(&mut conn, statements).await
            }
        }
    }

    async fn upsert(
        &self,
        table: &Table,
        rows: Vec<Row>,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        let ids = match handle {
            Some(handle) => {
                let pinned = self.pinned(handle)?;
                let mut conn = pinned.lock().await;
                self.upsert_runs(&mut conn, table, &rows).await?
            }
            None => {
                let mut conn = self.pool.acquire().await?;
                self.upsert_runs(&mut conn, table, &rows).await?
            }
        };
        Ok(assign_ids(table, rows, ids))
    }

    async fn schema(&self) -> Result<Schema> {
        let rows = sqlx::query(SCHEMA_QUERY).fetch_all(&self.pool).await?;
        let rows: Vec<Row> = rows.iter().map(convert_row).collect();
        Ok(Schema::from_sql_result_set(&rows))
    }

    async fn start_transaction(&self, isolation: IsolationLevel, read_only: bool) -> Result<TransactionHandle> {
        let mut conn = self.pool.acquire().await?;
        let statements = self.dialect.start_transaction(isolation, read_only);
        for (sql, _) in statements.iter() {
            debug!(sql, "starting transaction");
            (&mut *conn).execute(sqlx::raw_sql(sql)).await?;
        }

        let handle = TransactionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.transactions()?.insert(handle.0, Arc::new(AsyncMutex::new(conn)));
        info!(%handle, ?isolation, read_only, "transaction started");
        Ok(handle)
    }

    async fn commit_transaction(&self, handle: TransactionHandle) -> Result<()> {
        self.finish_transaction(handle, self.dialect.commit()).await
    }

    async fn rollback_transaction(&self, handle: TransactionHandle) -> Result<()> {
        self.finish_transaction(handle, self.dialect.rollback()).await
    }

    async fn is_connected(&self) -> ConnectionStatus {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => ConnectionStatus::Connected,
            Err(e) => {
                let status = ConnectionStatus::from_sqlx(&e);
                warn!(%status, "PostgreSQL connection check failed");
                status
            }
        }
    }

    /// Close the pool. Open transactions are dropped with their connections.
    async fn destroy(&self) -> Result<()> {
        let abandoned = {
            let mut map = self.transactions()?;
            let count = map.len();
            map.clear();
            count
        };
        if abandoned > 0 {
            warn!(abandoned, "closing PostgreSQL pool with open transactions");
        }
        self.pool.close().await;
        info!("closed PostgreSQL pool");
        Ok(())
    }
}
