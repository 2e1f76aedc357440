//! CLI argument definitions.
//!
//! This module contains the top-level CLI structure and shared types.
//! Individual command definitions are in the `commands` module.

use clap::Parser;

use crate::commands::Command;
use crate::db::DatabaseConfig;
use crate::error::Result;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Database URL, overriding the config file and environment
    ///
    /// If not specified, the database is resolved from:
    ///   1. .tasty.json in the current directory
    ///   2. TASTY_DATABASE_URL, then DATABASE_URL
    ///   3. ./tasty.sqlite
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Resolve the database configuration, preferring an explicit URL.
pub fn resolve_database(explicit_url: Option<&str>) -> Result<DatabaseConfig> {
    match explicit_url {
        Some(url) => DatabaseConfig::from_url(url),
        None => DatabaseConfig::resolve(),
    }
}
