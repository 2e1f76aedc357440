//! Table metadata and column accessors.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use super::node::Node;
use super::value::Row;
use crate::error::{Result, TastyError};

pub const DEFAULT_DELIMITER: &str = "-";

/// A named table (or Elasticsearch type) with its key and column layout.
///
/// The column list is sorted, deduplicated and always contains the primary
/// keys. Each column gets a `table.column` member node, exposed through
/// [`Table::column`].
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    database: String,
    primary_keys: Vec<String>,
    columns: Vec<String>,
    delimiter: String,
    mapping: Option<JsonValue>,
    accessors: BTreeMap<String, Node>,
}

impl Table {
    pub fn new<P, C>(name: impl Into<String>, primary_keys: P, columns: C) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let name = name.into();
        let primary_keys: Vec<String> = primary_keys.into_iter().map(Into::into).collect();

        let mut all: Vec<String> = columns.into_iter().map(Into::into).collect();
        all.extend(primary_keys.iter().cloned());
        all.sort();
        all.dedup();

        let accessors = all
            .iter()
            .map(|c| (c.clone(), Node::member(name.clone(), c.clone())))
            .collect();

        Self {
            database: name.clone(),
            name,
            primary_keys,
            columns: all,
            delimiter: DEFAULT_DELIMITER.to_string(),
            mapping: None,
            accessors,
        }
    }

    /// Set the database (SQL) or index (Elasticsearch) holding this table.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Attach an Elasticsearch mapping used by `put_mapping`.
    pub fn with_mapping(mut self, mapping: JsonValue) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn mapping(&self) -> Option<&JsonValue> {
        self.mapping.as_ref()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.accessors.contains_key(name)
    }

    /// Member-access node for a column, if the table has it.
    pub fn column(&self, name: &str) -> Option<&Node> {
        self.accessors.get(name)
    }

    /// True when the table has exactly one key, so a server-assigned id can
    /// be written back into upserted rows.
    pub fn has_single_key(&self) -> bool {
        self.primary_keys.len() == 1
    }

    /// Join the row's primary-key values with the delimiter.
    ///
    /// Returns `None` when the row carries none of the keys.
    pub fn make_id(&self, row: &Row) -> Option<String> {
        let parts: Vec<String> = self
            .primary_keys
            .iter()
            .filter_map(|pk| row.get(pk))
            .filter(|v| !v.is_null())
            .map(|v| match v {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(&self.delimiter))
        }
    }
}

/// Look up a column accessor, failing for columns the table does not have.
pub fn column(table: &Table, name: &str) -> Result<Node> {
    table
        .column(name)
        .cloned()
        .ok_or_else(|| TastyError::UnknownColumn {
            table: table.name().to_string(),
            column: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn row(value: JsonValue) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[rstest]
    fn test_columns_include_keys_sorted() {
        let table = Table::new("data", ["movieid"], ["title", "releasedate", "title"]);
        assert_eq!(table.columns(), ["movieid", "releasedate", "title"]);
        assert_eq!(table.database(), "data");
    }

    #[rstest]
    fn test_accessor_is_member_node() {
        let table = Table::new("movies", ["movieID"], ["title"]);
        assert_eq!(table.column("title"), Some(&Node::member("movies", "title")));
        assert!(table.column("rating").is_none());
    }

    #[rstest]
    fn test_column_helper_errors_on_unknown() {
        let table = Table::new("movies", ["movieID"], ["title"]);
        let err = column(&table, "rating").unwrap_err();
        assert_eq!(err.to_string(), "Unknown column 'rating' on table 'movies'");
    }

    #[rstest]
    #[case(json!({"a": 1, "b": "x"}), Some("1-x"))]
    #[case(json!({"a": 1}), Some("1"))]
    #[case(json!({"c": 3}), None)]
    fn test_make_id(#[case] input: JsonValue, #[case] expected: Option<&str>) {
        let table = Table::new("pairs", ["a", "b"], ["c"]);
        assert_eq!(table.make_id(&row(input)).as_deref(), expected);
    }

    #[rstest]
    fn test_make_id_custom_delimiter() {
        let table = Table::new("pairs", ["a", "b"], Vec::<String>::new()).with_delimiter("::");
        assert_eq!(
            table.make_id(&row(json!({"a": "x", "b": "y"}))).as_deref(),
            Some("x::y")
        );
    }
}
