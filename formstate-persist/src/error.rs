//! Persistence errors

use formstate::error::FormError;
use thiserror::Error;

/// Errors from loading or saving persisted form values.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The wrapped form rejected an operation.
    #[error(transparent)]
    Form(#[from] FormError),

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] async_sqlite::Error),

    /// Form values could not be encoded.
    #[error("Failed to serialize form values: {0}")]
    Serialize(#[from] serde_json::Error),
}
