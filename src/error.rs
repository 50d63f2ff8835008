//! Error types for the inspector.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening the database or running checks.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The database file could not be opened.
    #[error("cannot open database {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A referenced table does not exist.
    #[error("no such table: {0}")]
    MissingTable(String),

    /// A referenced column does not exist.
    #[error("no such column: {0}")]
    MissingColumn(String),

    /// Any other SQLite failure.
    #[error("query failed")]
    Query(#[source] rusqlite::Error),

    /// Configuration could not be extracted.
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// The report could not be serialised.
    #[error("cannot render report: {0}")]
    Render(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for InspectError {
    fn from(err: rusqlite::Error) -> Self {
        let message = match &err {
            rusqlite::Error::SqliteFailure(_, Some(message)) => Some(message.as_str()),
            rusqlite::Error::SqlInputError { msg, .. } => Some(msg.as_str()),
            _ => None,
        };
        if let Some(message) = message {
            if let Some(table) = message.strip_prefix("no such table: ") {
                return Self::MissingTable(table.to_string());
            }
            if let Some(column) = message.strip_prefix("no such column: ") {
                return Self::MissingColumn(column.to_string());
            }
        }
        Self::Query(err)
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;
