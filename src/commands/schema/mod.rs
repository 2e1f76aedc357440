mod cli_tests;
mod execute;
mod execute_tests;
mod output;

use clap::Args;

pub use execute::SchemaResult;

/// Show the normalized database -> table -> column -> type tree
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  tasty schema                                       # Every database the connection can see
  tasty schema -n movies                             # Only the 'movies' database or index
  tasty schema -d http://localhost:9200 -o json      # Elasticsearch mappings as JSON
")]
pub struct SchemaCmd {
    /// Only show this database (Elasticsearch: index)
    #[arg(short, long)]
    pub name: Option<String>,
}
