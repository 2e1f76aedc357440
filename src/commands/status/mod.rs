mod execute;
mod output;

use clap::Args;

pub use execute::StatusResult;

/// Check whether the configured database is reachable
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  tasty status                                       # Check the configured database
  tasty status -d postgres://tasty@localhost/movies  # Check a specific server
")]
pub struct StatusCmd {}
