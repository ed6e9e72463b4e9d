//! Errors raised by storage collaborators.

use thiserror::Error;

/// Failure reported by an implementation of one of the storage traits.
///
/// The core never retries on these; they are surfaced to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The underlying read or write failed.
    #[error("Storage error: {0}")]
    Database(String),
}

impl StoreError {
    /// Wraps any displayable backend error.
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}
