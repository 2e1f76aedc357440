use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use super::StatusCmd;
use crate::commands::Execute;
use crate::db::{ConnectionStatus, DatabaseConfig};
use crate::error::{Result, TastyError};
use crate::generators::BackendKind;

/// Result of the status command execution
#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub backend: BackendKind,
    #[serde(flatten)]
    pub status: ConnectionStatus,
}

#[async_trait]
impl Execute for StatusCmd {
    type Output = StatusResult;

    async fn execute(self, config: &DatabaseConfig) -> Result<Self::Output> {
        let status = match config.connect().await {
            Ok(db) => {
                let status = db.is_connected().await;
                if let Err(e) = db.destroy().await {
                    warn!(error = %e, "failed to close database");
                }
                status
            }
            Err(TastyError::Connection { status }) => status,
            Err(e @ TastyError::Config { .. }) => return Err(e),
            Err(e) => ConnectionStatus::Failed(e.to_string()),
        };

        Ok(StatusResult {
            backend: config.kind(),
            status,
        })
    }
}
