//! Normalized database schema tree.
//!
//! Both SQL `information_schema` rows and Elasticsearch mapping responses
//! are folded into the same `database -> table -> column -> {type}` shape,
//! so two sources describing the same data serialize identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use super::value::Row;

/// Name used for the table of a typeless Elasticsearch mapping.
pub const TYPELESS_TABLE: &str = "_doc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    #[serde(rename = "type")]
    pub column_type: String,
}

pub type Columns = BTreeMap<String, ColumnInfo>;
pub type Tables = BTreeMap<String, Columns>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    databases: BTreeMap<String, Tables>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(
        &mut self,
        database: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        column_type: impl Into<String>,
    ) {
        self.databases
            .entry(database.into())
            .or_default()
            .entry(table.into())
            .or_default()
            .insert(
                column.into(),
                ColumnInfo {
                    column_type: column_type.into(),
                },
            );
    }

    /// Build from rows carrying `table_schema`, `table_name`, `column_name`
    /// and `data_type`. Rows missing any of them are skipped.
    pub fn from_sql_result_set(rows: &[Row]) -> Self {
        let mut schema = Self::new();
        for row in rows {
            let field = |name: &str| row.get(name).and_then(JsonValue::as_str);
            match (
                field("table_schema"),
                field("table_name"),
                field("column_name"),
                field("data_type"),
            ) {
                (Some(db), Some(table), Some(column), Some(data_type)) => {
                    schema.add_column(db, table, column, data_type);
                }
                _ => warn!(?row, "Skipping schema row with missing fields"),
            }
        }
        schema
    }

    /// Build from an Elasticsearch `GET /_mapping` response.
    ///
    /// Accepts both `index -> mappings -> type -> properties` and the
    /// typeless `index -> mappings -> properties` layout.
    pub fn from_elastic_tree(tree: &JsonValue) -> Self {
        let mut schema = Self::new();
        let Some(indices) = tree.as_object() else {
            return schema;
        };

        for (index, body) in indices {
            // every index shows up, even with no mapped types yet
            schema.databases.entry(index.clone()).or_default();
            let Some(mappings) = body.get("mappings").and_then(JsonValue::as_object) else {
                continue;
            };

            if let Some(properties) = mappings.get("properties").and_then(JsonValue::as_object) {
                schema.add_properties(index, TYPELESS_TABLE, properties);
                continue;
            }

            for (type_name, type_body) in mappings {
                let properties = type_body
                    .get("properties")
                    .and_then(JsonValue::as_object);
                match properties {
                    Some(properties) => schema.add_properties(index, type_name, properties),
                    None => {
                        schema
                            .databases
                            .entry(index.clone())
                            .or_default()
                            .entry(type_name.clone())
                            .or_default();
                    }
                }
            }
        }
        schema
    }

    fn add_properties(
        &mut self,
        index: &str,
        table: &str,
        properties: &serde_json::Map<String, JsonValue>,
    ) {
        let columns = self
            .databases
            .entry(index.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default();

        for (column, spec) in properties {
            let column_type = spec
                .get("type")
                .and_then(JsonValue::as_str)
                .unwrap_or("object");
            columns.insert(
                column.clone(),
                ColumnInfo {
                    column_type: column_type.to_string(),
                },
            );
        }
    }

    pub fn database_names(&self) -> Vec<&str> {
        self.databases.keys().map(String::as_str).collect()
    }

    pub fn table_names(&self, database: &str) -> Vec<&str> {
        self.databases
            .get(database)
            .map(|tables| tables.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn column_names(&self, database: &str, table: &str) -> Vec<&str> {
        self.databases
            .get(database)
            .and_then(|tables| tables.get(table))
            .map(|columns| columns.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn column_type(&self, database: &str, table: &str, column: &str) -> Option<&str> {
        self.databases
            .get(database)?
            .get(table)?
            .get(column)
            .map(|info| info.column_type.as_str())
    }

    pub fn databases(&self) -> &BTreeMap<String, Tables> {
        &self.databases
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}
