//! SQLite dialect.
//!
//! Shares MySQL's literal escaping and `REPLACE INTO` upserts, but quotes
//! identifiers with double quotes. Runs that leave the single primary key
//! to the database are followed by a `last_insert_rowid()` select so the
//! driver can read the assigned ids on the same connection.

use super::mysql::replace_statement;
use super::{SqlDialect, UpsertRun};
use crate::error::Result;
use crate::generators::escape::{escape_string_for_quote, quote_identifier};
use crate::generators::{BackendKind, ParameterMode, StatementSet};
use crate::model::{QueryCommand, Table};

pub const LAST_INSERT_ROWID: &str = "SELECT last_insert_rowid() AS id;";

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_identifier(name, '"')
    }

    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", escape_string_for_quote(s, '\''))
    }

    fn boolean(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn command_keyword(&self, command: QueryCommand) -> &'static str {
        match command {
            QueryCommand::Select => "SELECT",
            QueryCommand::Upsert => "REPLACE",
            QueryCommand::Delete => "DELETE",
        }
    }

    fn upsert_run(&self, table: &Table, run: &UpsertRun<'_>, mode: ParameterMode) -> Result<StatementSet> {
        let (statement, values) = replace_statement(self, table, run, mode)?;
        let mut set = StatementSet::new();
        set.push(statement, values);
        if table.has_single_key() && !run.has_primary_key(table) {
            set.push(LAST_INSERT_ROWID.to_string(), Vec::new());
        }
        Ok(set)
    }
}
