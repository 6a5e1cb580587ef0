use super::Column;
use shelf_model::{BookId, ColumnMeta, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The `identifiers` field: per book, identifier type to value
/// (`isbn` to `9780552131063`).
pub(crate) struct IdentifiersField {
    meta: ColumnMeta,
    books: BTreeMap<BookId, BTreeMap<String, String>>,
}

impl IdentifiersField {
    pub(crate) fn new(meta: ColumnMeta, books: BTreeMap<BookId, BTreeMap<String, String>>) -> Self {
        Self { meta, books }
    }
}

impl Column for IdentifiersField {
    fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    fn for_book(&self, book_id: BookId) -> Option<Value> {
        self.books.get(&book_id).filter(|ids| !ids.is_empty()).cloned().map(Value::Map)
    }

    fn book_ids(&self) -> BTreeSet<BookId> {
        self.books.keys().copied().collect()
    }
}
