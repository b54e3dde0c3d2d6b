use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error("unknown collection: {0:?}")]
    UnknownCollection(String),

    #[error("invalid data at {path}: {reason}")]
    InvalidData { path: String, reason: String },
}
