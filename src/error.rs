use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("config file not found: {0}")]
    ConfigMissing(PathBuf),

    #[error("failed to parse config file {path}: line {line}: {detail}")]
    ConfigParse {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {label} failed: {source}")]
    Connect {
        label: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("query on {table} failed: {source}")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to write {path}: {detail}")]
    Write { path: PathBuf, detail: String },

    #[error("notification failed: {0}")]
    Notify(String),
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;
