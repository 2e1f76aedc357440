use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use super::RunCmd;
use crate::commands::{Execute, QueryDocument};
use crate::db::DatabaseConfig;
use crate::error::Result;
use crate::facade::Tasty;
use crate::model::{QueryCommand, Row};

/// Result of the run command execution
#[derive(Debug, Default, Serialize)]
pub struct RunResult {
    pub backend: String,
    pub command: QueryCommand,
    pub table: String,
    pub count: usize,
    pub rows: Vec<Row>,
}

#[async_trait]
impl Execute for RunCmd {
    type Output = RunResult;

    async fn execute(self, config: &DatabaseConfig) -> Result<Self::Output> {
        let query = QueryDocument::load(&self.query)?.to_query()?;
        let tasty = Tasty::new(config.connect().await?);

        // Upserts go through the driver so generated keys come back.
        let outcome = match query.command() {
            QueryCommand::Upsert => {
                tasty
                    .upsert(query.table(), query.upserts().to_vec(), None)
                    .await
            }
            QueryCommand::Select | QueryCommand::Delete => tasty.execute(&query, None).await,
        };

        if let Err(e) = tasty.destroy().await {
            warn!(error = %e, "failed to close database");
        }
        let rows = outcome?;
        info!(count = rows.len(), command = query.command().as_str(), "query finished");

        Ok(RunResult {
            backend: tasty.db().backend_name().to_string(),
            command: query.command(),
            table: query.table().name().to_string(),
            count: rows.len(),
            rows,
        })
    }
}
