use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("write rejected at {path}: {reason}")]
    Rejected { path: String, reason: String },

    #[error("store lock poisoned")]
    LockPoisoned,
}
