//! Query objects and their builder.

use super::node::{Node, QueryCommand};
use super::table::Table;
use super::value::Row;
use crate::error::{Result, TastyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(TastyError::generation(format!("unrecognized sort order: {}", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub node: Node,
    pub order: SortOrder,
}

/// An immutable query against one table.
///
/// Built with [`Query::builder`]; generators only ever borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: Table,
    command: QueryCommand,
    aliases: Vec<(String, Node)>,
    filters: Vec<Node>,
    sorts: Vec<Sort>,
    selected: Vec<Node>,
    upserts: Vec<Row>,
    take: usize,
    skip: usize,
}

impl Query {
    pub fn builder(table: &Table) -> QueryBuilder {
        QueryBuilder {
            query: Query {
                table: table.clone(),
                command: QueryCommand::Select,
                aliases: Vec::new(),
                filters: Vec::new(),
                sorts: Vec::new(),
                selected: Vec::new(),
                upserts: Vec::new(),
                take: 0,
                skip: 0,
            },
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn command(&self) -> QueryCommand {
        self.command
    }

    pub fn aliases(&self) -> &[(String, Node)] {
        &self.aliases
    }

    pub fn filters(&self) -> &[Node] {
        &self.filters
    }

    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn selected(&self) -> &[Node] {
        &self.selected
    }

    pub fn upserts(&self) -> &[Row] {
        &self.upserts
    }

    /// Row limit; 0 means unset.
    pub fn take(&self) -> usize {
        self.take
    }

    /// Row offset; 0 means unset.
    pub fn skip(&self) -> usize {
        self.skip
    }

    /// True for a select with no explicit columns and no aliases.
    pub fn is_selecting_all(&self) -> bool {
        self.command == QueryCommand::Select && self.selected.is_empty() && self.aliases.is_empty()
    }
}

/// Consuming builder for [`Query`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Restrict the projection to the given expressions.
    pub fn select<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.query.command = QueryCommand::Select;
        self.query.selected.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn alias(mut self, name: impl Into<String>, expression: impl Into<Node>) -> Self {
        self.query.aliases.push((name.into(), expression.into()));
        self
    }

    /// Add a filter; multiple filters are AND-combined.
    pub fn filter(mut self, expression: impl Into<Node>) -> Self {
        self.query.filters.push(expression.into());
        self
    }

    pub fn sort(mut self, expression: impl Into<Node>, order: SortOrder) -> Self {
        self.query.sorts.push(Sort {
            node: expression.into(),
            order,
        });
        self
    }

    pub fn take(mut self, count: usize) -> Self {
        self.query.take = count;
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.query.skip = count;
        self
    }

    /// Turn the query into an upsert of `rows`, appended to any earlier payload.
    pub fn upsert(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.query.command = QueryCommand::Upsert;
        self.query.upserts.extend(rows);
        self
    }

    pub fn delete(mut self) -> Self {
        self.query.command = QueryCommand::Delete;
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}
