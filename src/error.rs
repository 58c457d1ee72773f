use crate::Identity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Sqlite Error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("Unknown carrier: {0}")]
    UnknownCarrier(Identity),

    #[error("Invalid timestamp '{0}': {1}")]
    InvalidTimestamp(String, chrono::ParseError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Presence store lock poisoned")]
    Poisoned,
}
