//! MySQL dialect.

use super::{ensure_columns, values_tuples, SqlDialect, StatementWriter, UpsertRun};
use crate::error::Result;
use crate::generators::escape::{escape_string_for_quote, quote_identifier};
use crate::generators::{BackendKind, ParameterMode, StatementSet};
use crate::model::{QueryCommand, Table, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn backend(&self) -> BackendKind {
        BackendKind::MySql
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_identifier(name, '`')
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
        Ok(set)
    }
}

/// `REPLACE INTO t (a, b) VALUES (..), (..);` for one run.
pub(super) fn replace_statement(
    dialect: &dyn SqlDialect,
    table: &Table,
    run: &UpsertRun<'_>,
    mode: ParameterMode,
) -> Result<(String, Vec<Value>)> {
    ensure_columns(table, run)?;
    let mut writer = StatementWriter::new(dialect, mode);

    let columns: Vec<String> = run.columns.iter().map(|c| writer.identifier(c)).collect();
    let tuples = values_tuples(&mut writer, run, ", ");

    let sql = format!(
        "{} INTO {} ({}) VALUES {}",
        dialect.command_keyword(QueryCommand::Upsert),
        writer.identifier(table.name()),
        columns.join(", "),
        tuples.join(", ")
    );
    Ok(writer.finish(sql))
}
