//! Unlocked operations.
//!
//! [`ReadOps`] and [`WriteOps`] own a guard of the cache's read/write lock,
//! so holding one *is* holding the lock. Every query they expose runs
//! without further locking, which lets the composer issue dozens of field
//! lookups under a single acquisition. Neither type leaves this crate: the
//! public [`Cache`](crate::Cache) methods take the lock, build one, and
//! delegate.

mod compose;

use crate::error::Result;
use crate::fields::{Column, Field};
use crate::format::{FORMATS_FIELD, FormatMemo, LocateError, Location, PATH_FIELD};
use crate::registry::Registry;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use shelf_config::Preferences;
use shelf_model::{AuthorData, BookId, FormatMetadata, ItemId, Metadata, Value};
use shelf_storage::Backend;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub(crate) struct ReadOps<'a> {
    registry: RwLockReadGuard<'a, Registry>,
    backend: &'a dyn Backend,
    memo: &'a FormatMemo,
    preferences: &'a Preferences,
}

impl<'a> ReadOps<'a> {
    pub(crate) fn new(
        registry: RwLockReadGuard<'a, Registry>,
        backend: &'a dyn Backend,
        memo: &'a FormatMemo,
        preferences: &'a Preferences,
    ) -> Self {
        Self {
            registry,
            backend,
            memo,
            preferences,
        }
    }

    pub(crate) fn field_for(&self, name: &str, book_id: BookId, default: Option<Value>) -> Option<Value> {
        match self.registry.get(name) {
            None => default,
            Some(Field::Composite(_)) => match self.registry.has_book(book_id) {
                true => self.metadata(book_id, false).get(name).or(default),
                false => default,
            },
            Some(field) => field.column().for_book(book_id).or(default),
        }
    }

    /// Renders composite column `name` into `record` and returns the
    /// rendered value. Anything but a registered composite column leaves
    /// `record` untouched and answers `default`.
    pub(crate) fn composite_for(
        &self,
        name: &str,
        book_id: BookId,
        record: &mut Metadata,
        default: Option<Value>,
    ) -> Option<Value> {
        let Some(field) = self.registry.composite(name) else {
            return default;
        };
        let value = Value::Text(field.render(self.registry.engine(), record));
        if !record.user_metadata.contains_key(name) {
            record.set_user_metadata(name, field.meta().clone());
        }
        record.set(name, Some(value.clone()), None);
        tracing::trace!(book_id, column = name, "Rendered composite column");
        Some(value)
    }

    pub(crate) fn field_ids_for(&self, name: &str, book_id: BookId) -> Vec<ItemId> {
        self.registry.field_ids_for(name, book_id)
    }

    pub(crate) fn books_for_field(&self, name: &str, item_id: ItemId) -> Vec<BookId> {
        self.registry.books_for_field(name, item_id)
    }

    pub(crate) fn all_book_ids(&self) -> BTreeSet<BookId> {
        self.registry.all_book_ids()
    }

    pub(crate) fn all_field_ids(&self, name: &str) -> Result<BTreeSet<ItemId>> {
        self.registry.all_field_ids(name)
    }

    pub(crate) fn author_data(&self, author_id: ItemId) -> Option<AuthorData> {
        self.registry.author_data(author_id).cloned()
    }

    /// The book's folder, relative to the library root.
    pub(crate) fn book_path(&self, book_id: BookId) -> std::result::Result<String, LocateError> {
        let field = self.registry.get(PATH_FIELD).ok_or(LocateError::MissingField(PATH_FIELD))?;
        match field.column().for_book(book_id) {
            Some(Value::Text(path)) => Ok(path),
            Some(_) => Err(LocateError::InvalidValue(PATH_FIELD)),
            None => Err(LocateError::NoValue(PATH_FIELD)),
        }
    }

    /// Locates a stored format file. `fmt` is matched case-insensitively.
    pub(crate) fn format_location(&self, book_id: BookId, fmt: &str) -> std::result::Result<Location, LocateError> {
        let path = self.book_path(book_id)?;
        let formats = match self.registry.get(FORMATS_FIELD) {
            Some(Field::Formats(formats)) => formats,
            Some(_) => return Err(LocateError::InvalidValue(FORMATS_FIELD)),
            None => return Err(LocateError::MissingField(FORMATS_FIELD)),
        };
        let filename = formats
            .filename(book_id, &fmt.to_uppercase())
            .ok_or(LocateError::NoValue(FORMATS_FIELD))?;
        Ok(Location {
            path,
            filename: filename.to_string(),
        })
    }

    pub(crate) fn format_abspath(&self, book_id: BookId, fmt: &str) -> Option<PathBuf> {
        let location = self.format_location(book_id, fmt).ok()?;
        self.backend.format_abspath(book_id, &fmt.to_uppercase(), &location.filename, &location.path)
    }

    /// Format file attributes, memoized per book and format.
    ///
    /// With `allow_cache` unset the memo is bypassed (and then refreshed).
    /// `None` covers a format that cannot be located as well as a failed
    /// backend call; neither writes to the memo.
    pub(crate) fn format_metadata(&self, book_id: BookId, fmt: &str, allow_cache: bool) -> Option<FormatMetadata> {
        let fmt = fmt.trim().to_uppercase();
        if fmt.is_empty() {
            return None;
        }
        if allow_cache && let Some(cached) = self.memo.get(book_id, &fmt) {
            tracing::debug!(book_id, fmt = %fmt, "Format metadata cache hit");
            return Some(cached);
        }
        tracing::debug!(book_id, fmt = %fmt, allow_cache, "Format metadata cache miss");
        let location = match self.format_location(book_id, &fmt) {
            Ok(location) => location,
            Err(reason) => {
                tracing::debug!(book_id, fmt = %fmt, %reason, "Format not located");
                return None;
            },
        };
        match self.backend.format_metadata(book_id, &fmt, &location.filename, &location.path) {
            Ok(metadata) => {
                self.memo.insert(book_id, fmt, metadata.clone());
                Some(metadata)
            },
            Err(error) => {
                tracing::debug!(book_id, fmt = %fmt, ?error, "Backend could not read format metadata");
                None
            },
        }
    }
}

pub(crate) struct WriteOps<'a> {
    registry: RwLockWriteGuard<'a, Registry>,
}

impl<'a> WriteOps<'a> {
    pub(crate) fn new(registry: RwLockWriteGuard<'a, Registry>) -> Self {
        Self { registry }
    }

    /// Replaces every book's "on device" marker. Books missing from
    /// `markers` lose theirs.
    pub(crate) fn set_ondevice(&mut self, markers: BTreeMap<BookId, String>) {
        self.registry.set_ondevice(markers);
    }
}
