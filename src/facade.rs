//! High-level entry point over one backend.
//!
//! [`Tasty`] turns row-shaped requests (select these columns where these
//! values match, delete everything, run this closure in a transaction) into
//! queries and hands them to the backend driver.

use std::future::Future;

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::db::{TastyDb, TransactionHandle};
use crate::error::{Result, TastyError};
use crate::generators::sql::IsolationLevel;
use crate::model::{column, Node, Query, Row, Schema, Table, Value};

/// Rows removed by [`Tasty::delete`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    /// Every row of the table.
    All,
    /// Rows whose columns equal every table column present in the row.
    Matching(Row),
}

/// How a transaction handler wants its transaction to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEnd {
    Commit,
    Rollback,
}

pub struct Tasty {
    db: Box<dyn TastyDb>,
}

impl Tasty {
    pub fn new(db: Box<dyn TastyDb>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &dyn TastyDb {
        self.db.as_ref()
    }

    /// Generate and run a query.
    pub async fn execute(&self, query: &Query, handle: Option<TransactionHandle>) -> Result<Vec<Row>> {
        let generated = self.db.generate(query)?;
        self.db.execute(&generated, handle).await
    }

    /// Select `columns` (every table column when empty), keeping rows that
    /// match `filter`.
    pub async fn select(
        &self,
        table: &Table,
        columns: &[&str],
        filter: Option<&Row>,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        let selected = if columns.is_empty() {
            table
                .columns()
                .iter()
                .map(|name| column(table, name))
                .collect::<Result<Vec<Node>>>()?
        } else {
            columns
                .iter()
                .map(|name| column(table, name))
                .collect::<Result<Vec<Node>>>()?
        };

        let mut builder = Query::builder(table).select(selected);
        if let Some(node) = filter.and_then(|row| filter_row(table, row)) {
            builder = builder.filter(node);
        }
        self.execute(&builder.build(), handle).await
    }

    pub async fn upsert(&self, table: &Table, rows: Vec<Row>, handle: Option<TransactionHandle>) -> Result<Vec<Row>> {
        self.db.upsert(table, rows, handle).await
    }

    pub async fn update(&self, table: &Table, rows: Vec<Row>, handle: Option<TransactionHandle>) -> Result<Vec<Row>> {
        self.db.update(table, rows, handle).await
    }

    /// Delete every row, or the rows matching a filter row.
    ///
    /// A filter row carrying none of the table's columns is rejected rather
    /// than widened to the whole table.
    pub async fn delete(
        &self,
        table: &Table,
        target: DeleteTarget,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        let mut builder = Query::builder(table).delete();
        if let DeleteTarget::Matching(row) = &target {
            let node = filter_row(table, row).ok_or_else(|| {
                TastyError::generation(format!("delete filter has no columns of table {}", table.name()))
            })?;
            builder = builder.filter(node);
        }
        self.execute(&builder.build(), handle).await
    }

    /// Run `handler` inside a transaction.
    ///
    /// The handler receives the transaction handle and returns its result
    /// along with how the transaction should end. If the handler fails, the
    /// transaction is rolled back and the handler's error is returned.
    pub async fn execute_transaction<T, F, Fut>(
        &self,
        isolation: IsolationLevel,
        read_only: bool,
        handler: F,
    ) -> Result<T>
    where
        F: FnOnce(TransactionHandle) -> Fut,
        Fut: Future<Output = Result<(T, TransactionEnd)>>,
    {
        let handle = self.db.start_transaction(isolation, read_only).await?;

        match handler(handle).await {
            Ok((value, TransactionEnd::Commit)) => {
                self.db.commit_transaction(handle).await?;
                Ok(value)
            }
            Ok((value, TransactionEnd::Rollback)) => {
                self.db.rollback_transaction(handle).await?;
                Ok(value)
            }
            Err(err) => {
                warn!(%handle, error = %err, "transaction handler failed, rolling back");
                if let Err(rollback_err) = self.db.rollback_transaction(handle).await {
                    warn!(%handle, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    pub async fn schema(&self) -> Result<Schema> {
        self.db.schema().await
    }

    pub async fn destroy(&self) -> Result<()> {
        info!(backend = self.db.backend_name(), "destroying");
        self.db.destroy().await
    }
}

/// AND of `column == value` for every table column present in `row`, in
/// table column order. `None` when the row names no table column.
pub fn filter_row(table: &Table, row: &Row) -> Option<Node> {
    table
        .columns()
        .iter()
        .filter_map(|name| {
            let value: &JsonValue = row.get(name)?;
            let accessor = table.column(name)?;
            Some(accessor.equals(Node::literal(Value::from_json(value))))
        })
        .reduce(|acc, next| acc.and(next))
}
