use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::GenerateCmd;
use crate::commands::{Execute, QueryDocument};
use crate::db::DatabaseConfig;
use crate::error::Result;
use crate::generators::{get_generator, BackendKind, GeneratedQuery, ParameterMode};
use crate::model::QueryCommand;

/// Result of the generate command execution
#[derive(Debug, Serialize)]
pub struct GenerateResult {
    pub backend: BackendKind,
    pub command: QueryCommand,
    pub table: String,
    pub placeholders: bool,
    pub generated: GeneratedQuery,
}

#[async_trait]
impl Execute for GenerateCmd {
    type Output = GenerateResult;

    async fn execute(self, config: &DatabaseConfig) -> Result<Self::Output> {
        let backend = self.backend.unwrap_or_else(|| config.kind());
        let query = QueryDocument::load(&self.query)?.to_query()?;
        let mode = if self.placeholders {
            ParameterMode::Placeholders
        } else {
            ParameterMode::Inline
        };

        debug!(%backend, ?mode, path = %self.query.display(), "generating query");
        let generated = get_generator(backend).generate(&query, mode)?;

        Ok(GenerateResult {
            backend,
            command: query.command(),
            table: query.table().name().to_string(),
            placeholders: self.placeholders,
            generated,
        })
    }
}
