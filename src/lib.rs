//! tasty library - portable query layer
//!
//! Builds backend-agnostic query trees, renders them for MySQL, SQLite,
//! PostgreSQL and Elasticsearch, and runs them through async drivers.

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod facade;
pub mod generators;
pub mod model;
pub mod output;

pub use error::{Result, TastyError};
pub use facade::{filter_row, DeleteTarget, Tasty, TransactionEnd};

#[macro_use]
pub mod test_macros;

#[cfg(test)]
pub mod test_utils;
