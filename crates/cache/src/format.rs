//! Format file resolution and the format metadata memo.

use dashmap::DashMap;
use derive_more::{Display, Error};
use shelf_model::{BookId, FormatMetadata};

pub(crate) const PATH_FIELD: &str = "path";
pub(crate) const FORMATS_FIELD: &str = "formats";

/// Where a book's format file is stored, as the backend addresses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// The book's folder, relative to the library root
    pub path: String,
    /// Stored file name of the format, without extension
    pub filename: String,
}

/// Why a format file could not be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum LocateError {
    /// The field needed for the lookup is not registered
    #[display("field not registered: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// The book has no value in the field
    #[display("no value in field: {_0}")]
    NoValue(#[error(not(source))] &'static str),
    /// The field holds a value of the wrong shape
    #[display("unexpected value in field: {_0}")]
    InvalidValue(#[error(not(source))] &'static str),
}

/// Memoized format attributes, keyed by book id and uppercase format code.
///
/// Entries are only removed on request. Racing writers for one key store
/// the same value, so the last write winning is harmless.
#[derive(Debug, Default)]
pub(crate) struct FormatMemo {
    entries: DashMap<(BookId, String), FormatMetadata>,
}

impl FormatMemo {
    pub(crate) fn get(&self, book_id: BookId, fmt: &str) -> Option<FormatMetadata> {
        self.entries.get(&(book_id, fmt.to_string())).map(|entry| entry.value().clone())
    }

    pub(crate) fn insert(&self, book_id: BookId, fmt: String, metadata: FormatMetadata) {
        self.entries.insert((book_id, fmt), metadata);
    }

    pub(crate) fn invalidate(&self, book_id: BookId, fmt: &str) -> bool {
        self.entries.remove(&(book_id, fmt.to_uppercase())).is_some()
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
