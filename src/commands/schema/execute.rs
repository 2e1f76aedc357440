use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use super::SchemaCmd;
use crate::commands::Execute;
use crate::db::DatabaseConfig;
use crate::error::Result;
use crate::facade::Tasty;
use crate::model::Schema;

/// Result of the schema command execution
#[derive(Debug, Default, Serialize)]
pub struct SchemaResult {
    pub backend: String,
    pub schema: Schema,
}

/// Keep only `name`'s subtree.
fn restrict(schema: Schema, name: &str) -> Schema {
    let mut restricted = Schema::new();
    if let Some(tables) = schema.databases().get(name) {
        for (table, columns) in tables {
            for (column, info) in columns {
                restricted.add_column(name, table.as_str(), column.as_str(), info.column_type.as_str());
            }
        }
    }
    restricted
}

#[async_trait]
impl Execute for SchemaCmd {
    type Output = SchemaResult;

    async fn execute(self, config: &DatabaseConfig) -> Result<Self::Output> {
        let tasty = Tasty::new(config.connect().await?);
        let outcome = tasty.schema().await;
        if let Err(e) = tasty.destroy().await {
            warn!(error = %e, "failed to close database");
        }

        let schema = match &self.name {
            Some(name) => restrict(outcome?, name),
            None => outcome?,
        };

        Ok(SchemaResult {
            backend: tasty.db().backend_name().to_string(),
            schema,
        })
    }
}
