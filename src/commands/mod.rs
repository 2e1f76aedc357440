//! Command definitions and implementations.
//!
//! Each command is defined in its own module with:
//! - The command struct with clap attributes for CLI parsing
//! - An `Execute` impl producing a serializable result
//! - An `Outputable` impl rendering that result as a table

mod document;
mod generate;
mod run;
mod schema;
mod status;

pub use document::{FilterOp, FilterSpec, QueryDocument, TableSpec};
pub use generate::GenerateCmd;
pub use run::RunCmd;
pub use schema::SchemaCmd;
pub use status::StatusCmd;

use async_trait::async_trait;
use clap::Subcommand;
use std::error::Error;

use crate::db::DatabaseConfig;
use crate::error::Result;
use crate::output::{OutputFormat, Outputable};

/// Trait for executing commands with command-specific result types.
///
/// Commands receive the resolved configuration and decide themselves
/// whether they need a live connection.
#[async_trait]
pub trait Execute {
    type Output: Outputable;

    async fn execute(self, config: &DatabaseConfig) -> Result<Self::Output>;
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a query document as SQL or Elasticsearch requests
    Generate(GenerateCmd),

    /// Run a query document against the configured database
    Run(RunCmd),

    /// Show the normalized schema of the configured database
    Schema(SchemaCmd),

    /// Check whether the configured database is reachable
    Status(StatusCmd),

    /// Catch-all for unknown commands
    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

impl Command {
    /// Execute the command and return formatted output
    pub async fn run(self, config: &DatabaseConfig, format: OutputFormat) -> std::result::Result<String, Box<dyn Error>> {
        match self {
            Command::Generate(cmd) => {
                let result = cmd.execute(config).await?;
                Ok(result.format(format))
            }
            Command::Run(cmd) => {
                let result = cmd.execute(config).await?;
                Ok(result.format(format))
            }
            Command::Schema(cmd) => {
                let result = cmd.execute(config).await?;
                Ok(result.format(format))
            }
            Command::Status(cmd) => {
                let result = cmd.execute(config).await?;
                Ok(result.format(format))
            }
            Command::Unknown(args) => {
                Err(format!("Unknown command: {}", args.first().unwrap_or(&String::new())).into())
            }
        }
    }
}
