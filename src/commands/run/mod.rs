mod cli_tests;
mod execute;
mod output;
mod output_tests;

use std::path::PathBuf;

use clap::Args;

pub use execute::RunResult;

/// Run a query document against the configured database
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  tasty run -q movies.json                           # Select from the configured database
  tasty run -q new_movies.json -o json               # Upsert and print rows with assigned ids
  tasty run -q movies.json -d postgres://localhost/movies
")]
pub struct RunCmd {
    /// Path to a JSON query document
    #[arg(short, long)]
    pub query: PathBuf,
}
