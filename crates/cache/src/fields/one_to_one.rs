use super::Column;
use shelf_model::{BookId, ColumnMeta, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A field with at most one value per book (`title`, `path`, `uuid`, ...).
pub(crate) struct OneToOneField {
    meta: ColumnMeta,
    values: BTreeMap<BookId, Value>,
}

impl OneToOneField {
    pub(crate) fn new(meta: ColumnMeta, values: BTreeMap<BookId, Value>) -> Self {
        Self { meta, values }
    }
}

impl Column for OneToOneField {
    fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    fn for_book(&self, book_id: BookId) -> Option<Value> {
        self.values.get(&book_id).cloned()
    }

    fn book_ids(&self) -> BTreeSet<BookId> {
        self.values.keys().copied().collect()
    }
}
