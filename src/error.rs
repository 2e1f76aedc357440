//! Error types shared by generators, drivers and the facade.

use thiserror::Error;

use crate::db::ConnectionStatus;

pub type Result<T> = std::result::Result<T, TastyError>;

/// Errors raised while generating or executing queries.
#[derive(Error, Debug)]
pub enum TastyError {
    /// The query could not be rendered for the target backend.
    #[error("Query generation failed: {message}")]
    Generation { message: String },

    /// The backend does not implement the requested operation.
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Connection failed: {status}")]
    Connection { status: ConnectionStatus },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Elasticsearch request failed with status {status}: {body}")]
    Elastic { status: u16, body: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TastyError {
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
