//! Driver trait shared by every storage backend.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{Result, TastyError};
use crate::generators::sql::IsolationLevel;
use crate::generators::{get_generator, BackendKind, GeneratedQuery, ParameterMode};
use crate::model::{Query, Row, Schema, Table};

/// Opaque token for an in-flight transaction bound to one pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TransactionHandle(pub u64);

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    AuthFailed,
    TimedOut,
    Failed(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Classify a driver error from a connection attempt.
    ///
    /// SQLSTATE class 28 (invalid authorization) is reported as an
    /// authentication failure by both PostgreSQL and MySQL.
    pub fn from_sqlx(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => ConnectionStatus::TimedOut,
            sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => ConnectionStatus::TimedOut,
            sqlx::Error::Database(db) if db.code().is_some_and(|code| code.starts_with("28")) => {
                ConnectionStatus::AuthFailed
            }
            other => ConnectionStatus::Failed(other.to_string()),
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::AuthFailed => write!(f, "authentication failed"),
            ConnectionStatus::TimedOut => write!(f, "timed out"),
            ConnectionStatus::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

/// A storage backend that can run generated queries.
///
/// Capabilities a backend lacks (updates and mappings outside
/// Elasticsearch, transactions outside PostgreSQL) return
/// [`TastyError::Unsupported`] through the default methods.
#[async_trait]
pub trait TastyDb: Send + Sync {
    /// Get the backend name for logging/debugging.
    fn backend_name(&self) -> &'static str;

    fn kind(&self) -> BackendKind;

    /// Generate the executable form of a query (placeholders for SQL).
    fn generate(&self, query: &Query) -> Result<GeneratedQuery> {
        get_generator(self.kind()).generate(query, ParameterMode::Placeholders)
    }

    /// Human-readable form of a query with literals inlined.
    fn generate_string(&self, query: &Query) -> Result<String> {
        get_generator(self.kind()).generate_string(query)
    }

    /// Run generated statements in order, concatenating their rows.
    async fn execute(
        &self,
        generated: &GeneratedQuery,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>>;

    /// Insert or replace rows, returning them with server-assigned keys filled in.
    async fn upsert(
        &self,
        table: &Table,
        rows: Vec<Row>,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>>;

    /// Partially update existing documents.
    async fn update(
        &self,
        _table: &Table,
        _rows: Vec<Row>,
        _handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        Err(self.unsupported("update"))
    }

    /// Create or replace the index mapping for a table.
    async fn put_mapping(&self, _table: &Table) -> Result<JsonValue> {
        Err(self.unsupported("put_mapping"))
    }

    async fn schema(&self) -> Result<Schema>;

    async fn start_transaction(
        &self,
        _isolation: IsolationLevel,
        _read_only: bool,
    ) -> Result<TransactionHandle> {
        Err(self.unsupported("start_transaction"))
    }

    async fn commit_transaction(&self, _handle: TransactionHandle) -> Result<()> {
        Err(self.unsupported("commit_transaction"))
    }

    async fn rollback_transaction(&self, _handle: TransactionHandle) -> Result<()> {
        Err(self.unsupported("rollback_transaction"))
    }

    async fn is_connected(&self) -> ConnectionStatus;

    /// Close the underlying pool or client.
    async fn destroy(&self) -> Result<()>;

    fn unsupported(&self, operation: &'static str) -> TastyError {
        TastyError::Unsupported {
            operation,
            backend: self.backend_name(),
        }
    }

    /// Fail when a transaction handle is passed to a backend without transactions.
    fn reject_handle(&self, handle: Option<TransactionHandle>) -> Result<()> {
        match handle {
            Some(_) => Err(self.unsupported("transactions")),
            None => Ok(()),
        }
    }
}

/// Write server-assigned ids back into rows that omitted the single primary key.
///
/// `ids` holds one id per row that needed one, in row order. Tables with a
/// composite key are returned unchanged.
pub fn assign_ids(table: &Table, mut rows: Vec<Row>, ids: Vec<JsonValue>) -> Vec<Row> {
    if !table.has_single_key() {
        return rows;
    }
    let key = &table.primary_keys()[0];
    let mut ids = ids.into_iter();
    for row in rows.iter_mut().filter(|row| !row.contains_key(key)) {
        match ids.next() {
            Some(id) => {
                row.insert(key.clone(), id);
            }
            None => break,
        }
    }
    rows
}
