use findprice_core::validation::FieldErrors;
use findprice_core::{CategoryKind, CoreError, Key};
use findprice_storage::StorageError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("no product form is open")]
    SessionClosed,

    #[error("no category is selected")]
    NothingSelected,

    #[error("a category edit is in progress")]
    EditInProgress,

    #[error("no category is being edited")]
    NotEditing,

    #[error("nothing is awaiting delete confirmation")]
    NothingPending,

    #[error("no product with key {0}")]
    UnknownProduct(Key),

    #[error("the new {0} entry is not open")]
    InlineEntryClosed(CategoryKind),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl EngineError {
    /// Local input problems the user can correct in place.
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    /// Failures reported by the store while writing or deleting.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}
