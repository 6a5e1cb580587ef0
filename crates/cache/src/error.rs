//! Cache Error Types
//!
//! Absence (an unknown book, field or item) is never an error in this
//! crate: lookups answer with a default instead. What is left is
//! initialization failures and programmer errors.

use derive_more::{Display, Error};
use shelf_storage::error::Error as StorageError;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A field name that was never registered. Field names come from code,
    /// not user input, so this points at a configuration bug.
    #[display("unknown field: {_0}")]
    UnknownField(#[error(not(source))] String),
    /// The backend failed to provide its tables during initialization.
    /// `retryable` mirrors the storage error: tables that were already
    /// handed over are gone for good.
    #[display("storage backend error")]
    Backend { retryable: bool },
    /// A composite column's template does not compile
    #[display("invalid template for column: {_0}")]
    Template(#[error(not(source))] String),
    #[display("cache is already initialized")]
    AlreadyInitialized,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { retryable: true })
    }

    /// Wraps a storage error, keeping its frame as a child in the error tree.
    #[track_caller]
    pub(crate) fn backend(err: StorageError) -> Error {
        let retryable = err.is_retryable();
        err.raise(Self::Backend { retryable })
    }
}
