//! JSON query documents read by the `generate` and `run` commands.
//!
//! A document names its table inline and describes one query:
//!
//! ```json
//! {
//!   "table": {"name": "movies", "primary_keys": ["movieID"], "columns": ["title"]},
//!   "command": "select",
//!   "columns": ["title"],
//!   "filters": [{"all": [
//!     {"column": "title", "op": "!=", "value": "Alien"},
//!     {"not": {"column": "releaseDate", "op": "is_null"}}
//!   ]}],
//!   "sorts": [{"column": "title", "order": "desc"}],
//!   "take": 10
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{Result, TastyError};
use crate::model::{column, Node, Query, QueryCommand, Row, SortOrder, Table, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct TableSpec {
    pub name: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub mapping: Option<JsonValue>,
}

impl TableSpec {
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(
            self.name.clone(),
            self.primary_keys.clone(),
            self.columns.clone(),
        );
        if let Some(database) = &self.database {
            table = table.with_database(database.clone());
        }
        if let Some(delimiter) = &self.delimiter {
            table = table.with_delimiter(delimiter.clone());
        }
        if let Some(mapping) = &self.mapping {
            table = table.with_mapping(mapping.clone());
        }
        table
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "is_null")]
    IsNull,
    #[serde(rename = "is_not_null")]
    IsNotNull,
}

/// A filter expression: a column comparison or a boolean combination.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    All {
        all: Vec<FilterSpec>,
    },
    Any {
        any: Vec<FilterSpec>,
    },
    Not {
        not: Box<FilterSpec>,
    },
    Compare {
        column: String,
        op: FilterOp,
        #[serde(default)]
        value: JsonValue,
    },
}

impl FilterSpec {
    pub fn to_node(&self, table: &Table) -> Result<Node> {
        match self {
            FilterSpec::All { all } => fold(table, all, "all", |a, b| a.and(b)),
            FilterSpec::Any { any } => fold(table, any, "any", |a, b| a.or(b)),
            FilterSpec::Not { not } => Ok(not.to_node(table)?.not()),
            FilterSpec::Compare { column: name, op, value } => {
                let lhs = column(table, name)?;
                let rhs = Value::from_json(value);
                Ok(match op {
                    FilterOp::Eq => lhs.equals(rhs),
                    FilterOp::Ne => lhs.does_not_equal(rhs),
                    FilterOp::Lt => lhs.less_than(rhs),
                    FilterOp::Le => lhs.less_than_or_equal(rhs),
                    FilterOp::Gt => lhs.greater_than(rhs),
                    FilterOp::Ge => lhs.greater_than_or_equal(rhs),
                    FilterOp::IsNull => lhs.is_null(),
                    FilterOp::IsNotNull => lhs.is_not_null(),
                })
            }
        }
    }
}

fn fold(
    table: &Table,
    specs: &[FilterSpec],
    name: &str,
    combine: fn(&Node, Node) -> Node,
) -> Result<Node> {
    let mut nodes = specs.iter().map(|spec| spec.to_node(table));
    let first = nodes
        .next()
        .ok_or_else(|| TastyError::generation(format!("empty '{}' filter", name)))??;
    nodes.try_fold(first, |acc, node| Ok(combine(&acc, node?)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default = "default_order")]
    pub order: String,
}

fn default_order() -> String {
    SortOrder::Asc.as_str().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AliasSpec {
    pub name: String,
    pub column: String,
}

fn default_command() -> String {
    QueryCommand::Select.as_str().to_string()
}

/// A query described as JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDocument {
    pub table: TableSpec,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<AliasSpec>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub sorts: Vec<SortSpec>,
    #[serde(default)]
    pub take: usize,
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl QueryDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            TastyError::config(format!("invalid query document {}: {}", path.display(), e))
        })
    }

    /// Resolve column names against the table and build the query.
    pub fn to_query(&self) -> Result<Query> {
        let table = self.table.to_table();
        let command = QueryCommand::parse(&self.command)?;

        let mut builder = Query::builder(&table);
        if !self.columns.is_empty() {
            let selected = self
                .columns
                .iter()
                .map(|name| column(&table, name))
                .collect::<Result<Vec<_>>>()?;
            builder = builder.select(selected);
        }
        for alias in &self.aliases {
            builder = builder.alias(alias.name.clone(), column(&table, &alias.column)?);
        }
        for filter in &self.filters {
            builder = builder.filter(filter.to_node(&table)?);
        }
        for sort in &self.sorts {
            builder = builder.sort(column(&table, &sort.column)?, SortOrder::parse(&sort.order)?);
        }
        builder = builder.take(self.take).skip(self.skip);

        builder = match command {
            QueryCommand::Select => builder,
            QueryCommand::Upsert => builder.upsert(self.rows.clone()),
            QueryCommand::Delete => builder.delete(),
        };
        Ok(builder.build())
    }
}
