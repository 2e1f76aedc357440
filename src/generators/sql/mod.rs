//! SQL generation shared by the MySQL, SQLite and PostgreSQL dialects.
//!
//! The renderer walks the expression tree once per statement. Each node is
//! emitted according to its [`Fix`]: literals and references stand alone,
//! prefix and postfix operators wrap a single child, and infix operators
//! join two. Dialects only decide quoting, placeholder syntax, literal
//! spelling and the shape of upsert statements.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::{IsolationLevel, PostgresDialect};
pub use sqlite::{SqliteDialect, LAST_INSERT_ROWID};

use crate::error::{Result, TastyError};
use crate::model::{DATE_FORMAT, Fix, Node, NodeKind, Operator, Query, QueryCommand, Row, SortOrder, Table, Value};

use super::{BackendKind, GeneratedQuery, Generator, ParameterMode, StatementSet};

/// Syntax differences between SQL engines.
pub trait SqlDialect: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Placeholder for the parameter at 1-based `position`.
    fn placeholder(&self, position: usize) -> String;

    fn quote_identifier(&self, name: &str) -> String;

    /// Quoted string literal.
    fn quote_string(&self, s: &str) -> String;

    fn boolean(&self, value: bool) -> &'static str;

    /// Keyword that opens a statement for the command.
    fn command_keyword(&self, command: QueryCommand) -> &'static str;

    /// Render the statements for one upsert run.
    fn upsert_run(&self, table: &Table, run: &UpsertRun<'_>, mode: ParameterMode) -> Result<StatementSet>;

    /// Inline SQL spelling of a literal.
    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.boolean(*b).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => self.quote_string(s),
            Value::Date(d) => self.quote_string(&d.format(DATE_FORMAT).to_string()),
        }
    }
}

/// Accumulates one statement's text and parameters.
pub struct StatementWriter<'a> {
    dialect: &'a dyn SqlDialect,
    mode: ParameterMode,
    params: Vec<Value>,
}

impl<'a> StatementWriter<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, mode: ParameterMode) -> Self {
        Self {
            dialect,
            mode,
            params: Vec::new(),
        }
    }

    /// Emit a literal, either as the next placeholder or inline.
    pub fn literal(&mut self, value: &Value) -> String {
        match self.mode {
            ParameterMode::Placeholders => {
                self.params.push(value.clone());
                self.dialect.placeholder(self.params.len())
            }
            ParameterMode::Inline => self.dialect.literal(value),
        }
    }

    pub fn json_literal(&mut self, value: Option<&serde_json::Value>) -> String {
        let value = value.map(Value::from_json).unwrap_or(Value::Null);
        self.literal(&value)
    }

    pub fn identifier(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    pub fn expression(&mut self, node: &Node) -> Result<String> {
        node.check_arity()?;
        let children = node.children();

        match node.kind() {
            NodeKind::Literal(value) => Ok(self.literal(value)),
            NodeKind::Reference(name) => Ok(self.identifier(name)),
            NodeKind::Command(command) => Ok(self.dialect.command_keyword(*command).to_string()),
            NodeKind::Op(op) => match op.fix() {
                Fix::InfixWithoutSpaces => {
                    let lhs = self.expression(&children[0])?;
                    let rhs = self.expression(&children[1])?;
                    Ok(format!("{}{}{}", lhs, op.sql(), rhs))
                }
                Fix::Infix => {
                    let lhs = self.operand(*op, &children[0])?;
                    let rhs = self.operand(*op, &children[1])?;
                    Ok(format!("{} {} {}", lhs, op.sql(), rhs))
                }
                Fix::Prefix => {
                    let child = self.operand(*op, &children[0])?;
                    Ok(format!("{} {}", op.sql(), child))
                }
                Fix::Postfix => {
                    let child = self.operand(*op, &children[0])?;
                    Ok(format!("{} {}", child, op.sql()))
                }
                Fix::Nullary => Err(TastyError::generation(format!(
                    "operator {} cannot be nullary",
                    op.token()
                ))),
            },
        }
    }

    /// Render a child of `parent`, parenthesized when precedence requires it.
    fn operand(&mut self, parent: Operator, child: &Node) -> Result<String> {
        let rendered = self.expression(child)?;
        if needs_parens(parent, child) {
            Ok(format!("({})", rendered))
        } else {
            Ok(rendered)
        }
    }

    /// Terminate the statement and hand back its parameters.
    pub fn finish(self, sql: String) -> (String, Vec<Value>) {
        (format!("{};", sql), self.params)
    }
}

fn needs_parens(parent: Operator, child: &Node) -> bool {
    let Some(child_op) = child.operator() else {
        return false;
    };
    if child_op.fix() != Fix::Infix {
        return false;
    }
    match parent.fix() {
        Fix::Prefix | Fix::Postfix => true,
        _ => matches!(child_op, Operator::And | Operator::Or) && child_op != parent,
    }
}

/// A maximal run of consecutive upsert rows sharing one set of defined columns.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertRun<'a> {
    /// Defined columns in table column order.
    pub columns: Vec<&'a str>,
    pub rows: Vec<&'a Row>,
}

impl UpsertRun<'_> {
    /// True when every row carries the first primary key.
    pub fn has_primary_key(&self, table: &Table) -> bool {
        table
            .primary_keys()
            .first()
            .is_some_and(|pk| self.columns.contains(&pk.as_str()))
    }
}

/// Split rows into maximal runs with an identical set of present table columns.
///
/// Presence is key existence, not value truthiness. Input order is kept, so
/// a batch whose key set alternates yields one run per change.
pub fn partition_runs<'a>(table: &'a Table, rows: &'a [Row]) -> Vec<UpsertRun<'a>> {
    let mut runs: Vec<UpsertRun<'a>> = Vec::new();

    for row in rows {
        let columns: Vec<&str> = table
            .columns()
            .iter()
            .map(String::as_str)
            .filter(|c| row.contains_key(*c))
            .collect();

        if let Some(run) = runs.last_mut().filter(|run| run.columns == columns) {
            run.rows.push(row);
            continue;
        }
        runs.push(UpsertRun {
            columns,
            rows: vec![row],
        });
    }
    runs
}

/// Render a select or delete statement.
pub fn render_query(dialect: &dyn SqlDialect, query: &Query, mode: ParameterMode) -> Result<StatementSet> {
    let mut writer = StatementWriter::new(dialect, mode);
    let table = writer.identifier(query.table().name());

    let mut sql = match query.command() {
        QueryCommand::Select => {
            let projection = if query.is_selecting_all() {
                "*".to_string()
            } else {
                let mut items = Vec::with_capacity(query.selected().len() + query.aliases().len());
                for column in query.selected() {
                    items.push(writer.expression(column)?);
                }
                for (name, expression) in query.aliases() {
                    let rendered = writer.expression(expression)?;
                    items.push(format!("{} AS {}", rendered, writer.identifier(name)));
                }
                items.join(", ")
            };
            format!("{} {} FROM {}", dialect.command_keyword(QueryCommand::Select), projection, table)
        }
        QueryCommand::Delete => format!("{} FROM {}", dialect.command_keyword(QueryCommand::Delete), table),
        QueryCommand::Upsert => {
            return Err(TastyError::generation("upsert queries are rendered per run"));
        }
    };

    if !query.filters().is_empty() {
        let mut filters = Vec::with_capacity(query.filters().len());
        for filter in query.filters() {
            filters.push(writer.operand(Operator::And, filter)?);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&filters.join(" AND "));
    }

    if query.command() == QueryCommand::Select {
        if !query.sorts().is_empty() {
            let mut sorts = Vec::with_capacity(query.sorts().len());
            for sort in query.sorts() {
                let rendered = writer.expression(&sort.node)?;
                let order = match sort.order {
                    SortOrder::Asc => Operator::Asc,
                    SortOrder::Desc => Operator::Desc,
                };
                sorts.push(format!("{} {}", rendered, order.sql()));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&sorts.join(", "));
        }
        if query.take() != 0 {
            sql.push_str(&format!(" LIMIT {}", query.take()));
        }
        if query.skip() != 0 {
            sql.push_str(&format!(" OFFSET {}", query.skip()));
        }
    }

    let (statement, params) = writer.finish(sql);
    let mut set = StatementSet::new();
    set.push(statement, params);
    Ok(set)
}

/// Render every run of an upsert query.
pub fn render_upsert(dialect: &dyn SqlDialect, query: &Query, mode: ParameterMode) -> Result<StatementSet> {
    let mut set = StatementSet::new();
    for run in partition_runs(query.table(), query.upserts()) {
        set.append(dialect.upsert_run(query.table(), &run, mode)?);
    }
    Ok(set)
}

/// Reject runs whose rows carry none of the table's columns.
pub(crate) fn ensure_columns(table: &Table, run: &UpsertRun<'_>) -> Result<()> {
    if run.columns.is_empty() {
        return Err(TastyError::generation(format!(
            "upsert row has no columns of table {}",
            table.name()
        )));
    }
    Ok(())
}

/// `(v1, v2), (v3, v4)` for the run's rows, in column order.
pub(crate) fn values_tuples(writer: &mut StatementWriter<'_>, run: &UpsertRun<'_>, separator: &str) -> Vec<String> {
    run.rows
        .iter()
        .map(|row| {
            let values: Vec<String> = run
                .columns
                .iter()
                .map(|c| writer.json_literal(row.get(*c)))
                .collect();
            format!("({})", values.join(separator))
        })
        .collect()
}

/// Generator for any [`SqlDialect`].
#[derive(Debug, Clone, Default)]
pub struct SqlGenerator<D> {
    dialect: D,
}

impl<D: SqlDialect> SqlGenerator<D> {
    pub fn new(dialect: D) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn generate_statements(&self, query: &Query, mode: ParameterMode) -> Result<StatementSet> {
        match query.command() {
            QueryCommand::Select | QueryCommand::Delete => render_query(&self.dialect, query, mode),
            QueryCommand::Upsert => render_upsert(&self.dialect, query, mode),
        }
    }
}

impl<D: SqlDialect> Generator for SqlGenerator<D> {
    fn backend(&self) -> BackendKind {
        self.dialect.backend()
    }

    fn generate(&self, query: &Query, mode: ParameterMode) -> Result<GeneratedQuery> {
        Ok(GeneratedQuery::Sql(self.generate_statements(query, mode)?))
    }
}

pub type MySqlGenerator = SqlGenerator<MySqlDialect>;
pub type SqliteGenerator = SqlGenerator<SqliteDialect>;
pub type PostgresGenerator = SqlGenerator<PostgresDialect>;
