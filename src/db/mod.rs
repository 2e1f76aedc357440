//! Backend drivers that execute generated queries.
//!
//! Every backend implements [`TastyDb`]:
//! - [`MySqlDb`], [`SqliteDb`] and [`PostgresDb`] run SQL statement batches
//!   through `sqlx` pools, binding parameters in placeholder order
//! - [`ElasticDb`] sends search envelopes and document writes over HTTP
//!
//! Statements in one batch run strictly in order on a single connection.
//! A failure aborts the rest of the batch; earlier statements stay applied.
//!
//! # Transactions
//!
//! Only PostgreSQL supports transactions. A [`TransactionHandle`] pins one
//! pooled connection until it is committed or rolled back; other backends
//! reject handles with [`TastyError::Unsupported`].

mod backend;
mod config;
mod elastic;
mod mysql;
mod postgres;
mod sqlite;

pub use backend::{assign_ids, ConnectionStatus, TastyDb, TransactionHandle};
pub use config::{DatabaseConfig, ServerConfig, MYSQL_DEFAULT_PORT, POSTGRES_DEFAULT_PORT};
pub use elastic::{bulk_body, ElasticDb, WriteAction, MAX_SINGLE_WRITES};
pub use mysql::MySqlDb;
pub use postgres::PostgresDb;
pub use sqlite::{SqliteDb, MEMORY_NAME};

use crate::error::{Result, TastyError};
use crate::generators::{GeneratedQuery, StatementSet};

/// The SQL statements of a generated query, or an error for search envelopes.
pub(crate) fn sql_statements<'a>(db: &dyn TastyDb, generated: &'a GeneratedQuery) -> Result<&'a StatementSet> {
    generated.as_sql().ok_or_else(|| TastyError::Unsupported {
        operation: "Elasticsearch queries",
        backend: db.backend_name(),
    })
}
