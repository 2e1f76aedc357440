//! Backend-specific query generation.
//!
//! A [`Generator`] renders a [`Query`] into the native form of one backend:
//! SQL statements with parallel parameter arrays for MySQL, SQLite and
//! PostgreSQL, or search/payload envelopes for Elasticsearch.
//!
//! # Example
//!
//! ```ignore
//! let generator = get_generator(BackendKind::Postgres);
//! let generated = generator.generate(&query, ParameterMode::Placeholders)?;
//! println!("{}", generated.to_display_string());
//! ```

pub mod elastic;
pub mod escape;
pub mod sql;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Query, Value};

pub use elastic::{ElasticGenerator, ElasticQuery, SearchBody, SearchRequest};
pub use sql::{MySqlGenerator, PostgresGenerator, SqliteGenerator};

/// Storage engines a query can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[value(name = "mysql")]
    MySql,
    Sqlite,
    Postgres,
    Elastic,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::MySql => "mysql",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Postgres => "postgres",
            BackendKind::Elastic => "elastic",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How literal leaves are emitted into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterMode {
    /// Positional parameters (`?` or `$n`) with values collected separately.
    #[default]
    Placeholders,
    /// Escaped literals rendered in place, for display.
    Inline,
}

/// Ordered SQL statements with one parameter array per statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatementSet {
    pub statements: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

impl StatementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: String, values: Vec<Value>) {
        self.statements.push(statement);
        self.values.push(values);
    }

    pub fn append(&mut self, mut other: StatementSet) {
        self.statements.append(&mut other.statements);
        self.values.append(&mut other.values);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements paired with their parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.statements
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    pub fn to_display_string(&self) -> String {
        self.statements.join("\n")
    }
}

/// Output of a generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeneratedQuery {
    Sql(StatementSet),
    Elastic(Vec<ElasticQuery>),
}

impl GeneratedQuery {
    /// Newline-joined SQL, or the Elasticsearch envelopes as a JSON array.
    pub fn to_display_string(&self) -> String {
        match self {
            GeneratedQuery::Sql(set) => set.to_display_string(),
            GeneratedQuery::Elastic(queries) => {
                serde_json::to_string_pretty(queries).unwrap_or_default()
            }
        }
    }

    pub fn as_sql(&self) -> Option<&StatementSet> {
        match self {
            GeneratedQuery::Sql(set) => Some(set),
            GeneratedQuery::Elastic(_) => None,
        }
    }

    pub fn as_elastic(&self) -> Option<&[ElasticQuery]> {
        match self {
            GeneratedQuery::Sql(_) => None,
            GeneratedQuery::Elastic(queries) => Some(queries),
        }
    }
}

/// Renders queries for one backend.
pub trait Generator: Send + Sync {
    fn backend(&self) -> BackendKind;

    fn generate(&self, query: &Query, mode: ParameterMode) -> Result<GeneratedQuery>;

    /// Display form with literals inlined.
    fn generate_string(&self, query: &Query) -> Result<String> {
        Ok(self.generate(query, ParameterMode::Inline)?.to_display_string())
    }
}

/// Get the generator for a backend.
pub fn get_generator(backend: BackendKind) -> Box<dyn Generator> {
    match backend {
        BackendKind::MySql => Box::new(MySqlGenerator::default()),
        BackendKind::Sqlite => Box::new(SqliteGenerator::default()),
        BackendKind::Postgres => Box::new(PostgresGenerator::default()),
        BackendKind::Elastic => Box::new(ElasticGenerator),
    }
}
