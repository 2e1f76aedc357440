mod cli_tests;
mod execute;
mod execute_tests;
mod output;
mod output_tests;

use std::path::PathBuf;

use clap::Args;

use crate::generators::BackendKind;

pub use execute::GenerateResult;

/// Render a query document without running it
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  tasty generate -q movies.json                      # Render for the configured backend
  tasty generate -q movies.json -b postgres          # Render PostgreSQL with inline literals
  tasty generate -q movies.json -b mysql -p          # Show ? placeholders and their values
  tasty generate -q movies.json -b elastic -o json   # Elasticsearch request envelopes
")]
pub struct GenerateCmd {
    /// Path to a JSON query document
    #[arg(short, long)]
    pub query: PathBuf,

    /// Backend to generate for (defaults to the configured database)
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Emit positional placeholders instead of inline literals
    #[arg(short, long, default_value_t = false)]
    pub placeholders: bool,
}
