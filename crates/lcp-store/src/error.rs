use lcp_state::StateError;
use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No row or object with the given key.
    #[error("not found: {0}")]
    NotFound(String),

    /// Query, connection or row decoding failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested transition was rejected.
    #[error(transparent)]
    State(#[from] StateError),

    /// The operator disabled this device action.
    #[error("{0} is not allowed by the status policy")]
    ActionDisabled(&'static str),

    /// Object storage I/O failure.
    #[error("storage I/O error: {0}")]
    Storage(#[from] std::io::Error),
}

impl StoreError {
    /// A stored value that cannot be turned back into a domain value.
    pub(crate) fn decode(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Database(sqlx::Error::Decode(Box::new(err)))
    }
}
