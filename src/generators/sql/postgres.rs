//! PostgreSQL dialect and transaction statements.

use serde::{Deserialize, Serialize};

use super::{ensure_columns, SqlDialect, StatementWriter, UpsertRun};
use crate::error::Result;
use crate::generators::escape::{escape_string_doubling, quote_identifier};
use crate::generators::{BackendKind, ParameterMode, StatementSet};
use crate::model::{QueryCommand, Table, Value};

/// Transaction isolation level. `Default` leaves the server setting alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(self) -> Option<&'static str> {
        match self {
            IsolationLevel::Default => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn start_transaction(&self, isolation: IsolationLevel, read_only: bool) -> StatementSet {
        let mut set = StatementSet::new();
        let access = if read_only { "READ ONLY" } else { "READ WRITE" };
        set.push(format!("START TRANSACTION {};", access), Vec::new());
        if let Some(level) = isolation.as_sql() {
            set.push(format!("SET TRANSACTION ISOLATION LEVEL {};", level), Vec::new());
        }
        set
    }

    pub fn commit(&self) -> StatementSet {
        let mut set = StatementSet::new();
        set.push("COMMIT;".to_string(), Vec::new());
        set
    }

    pub fn rollback(&self) -> StatementSet {
        let mut set = StatementSet::new();
        set.push("ROLLBACK;".to_string(), Vec::new());
        set
    }
}

impl SqlDialect for PostgresDialect {
    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_identifier(name, '"')
    }

    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", escape_string_doubling(s, '\''))
    }

    fn boolean(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    fn command_keyword(&self, command: QueryCommand) -> &'static str {
        match command {
            QueryCommand::Select => "SELECT",
            QueryCommand::Upsert => "INSERT",
            QueryCommand::Delete => "DELETE",
        }
    }

    /// `INSERT ... ON CONFLICT ... DO UPDATE ... RETURNING` for one run.
    ///
    /// The conflict clause is added only when the run carries the first
    /// primary key. A single-row run updates from its own parameters and is
    /// pinned to that row's key; a multi-row run updates from `EXCLUDED`.
    fn upsert_run(&self, table: &Table, run: &UpsertRun<'_>, mode: ParameterMode) -> Result<StatementSet> {
        ensure_columns(table, run)?;
        let mut writer = StatementWriter::new(self, mode);
        let table_name = writer.identifier(table.name());
        let columns: Vec<String> = run.columns.iter().map(|c| writer.identifier(c)).collect();

        let rendered: Vec<Vec<String>> = run
            .rows
            .iter()
            .map(|row| {
                run.columns
                    .iter()
                    .map(|c| writer.json_literal(row.get(*c)))
                    .collect()
            })
            .collect();
        let tuples: Vec<String> = rendered
            .iter()
            .map(|values| format!("({})", values.join(",")))
            .collect();

        let mut sql = format!(
            "{} INTO {} ({}) VALUES {}",
            self.command_keyword(QueryCommand::Upsert),
            table_name,
            columns.join(","),
            tuples.join(",")
        );

        if run.has_primary_key(table) {
            let keys: Vec<String> = table.primary_keys().iter().map(|k| writer.identifier(k)).collect();
            let single_row = run.rows.len() == 1;
            let assigned: Vec<String> = if single_row {
                rendered[0].clone()
            } else {
                columns.iter().map(|c| format!("EXCLUDED.{}", c)).collect()
            };

            sql.push_str(&format!(" ON CONFLICT ({}) DO UPDATE SET ", keys.join(",")));
            if columns.len() == 1 {
                sql.push_str(&format!("{} = {}", columns[0], assigned[0]));
            } else {
                sql.push_str(&format!("({}) = ({})", columns.join(","), assigned.join(",")));
            }

            if single_row {
                let row = run.rows[0];
                let qualified: Vec<String> = keys.iter().map(|k| format!("{}.{}", table_name, k)).collect();
                let literals: Vec<String> = table
                    .primary_keys()
                    .iter()
                    .map(|k| self.literal(&row.get(k).map(Value::from_json).unwrap_or(Value::Null)))
                    .collect();
                sql.push_str(&format!(
                    " WHERE ({}) = ({})",
                    qualified.join(","),
                    literals.join(",")
                ));
            }
        }

        if let Some(first_key) = table.primary_keys().first() {
            sql.push_str(&format!(" RETURNING {} AS insertid", writer.identifier(first_key)));
        }

        let (statement, values) = writer.finish(sql);
        let mut set = StatementSet::new();
        set.push(statement, values);
        Ok(set)
    }
}
