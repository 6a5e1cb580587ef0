use super::Column;
use shelf_model::{BookId, ColumnMeta, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The `formats` field: which format files a book has, and the stored file
/// name (without extension) of each.
pub(crate) struct FormatsField {
    meta: ColumnMeta,
    books: BTreeMap<BookId, BTreeMap<String, String>>,
}

impl FormatsField {
    pub(crate) fn new(meta: ColumnMeta, books: BTreeMap<BookId, BTreeMap<String, String>>) -> Self {
        Self { meta, books }
    }

    /// Stored file name for one format. `fmt` must already be uppercase.
    pub(crate) fn filename(&self, book_id: BookId, fmt: &str) -> Option<&str> {
        self.books.get(&book_id)?.get(fmt).map(String::as_str)
    }
}

impl Column for FormatsField {
    fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    fn for_book(&self, book_id: BookId) -> Option<Value> {
        let formats = self.books.get(&book_id).filter(|f| !f.is_empty())?;
        Some(Value::List(formats.keys().cloned().collect()))
    }

    fn book_ids(&self) -> BTreeSet<BookId> {
        self.books.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_model::Datatype;

    #[test]
    fn test_formats() {
        let field = FormatsField::new(
            ColumnMeta::standard("formats", Datatype::Text).multiple(),
            BTreeMap::from([
                (1, BTreeMap::from([("PDF".to_string(), "Foo".to_string()), ("EPUB".to_string(), "Foo".to_string())])),
                (2, BTreeMap::new()),
            ]),
        );
        assert_eq!(field.for_book(1), Some(Value::List(vec!["EPUB".to_string(), "PDF".to_string()])));
        assert_eq!(field.for_book(2), None);
        assert_eq!(field.filename(1, "EPUB"), Some("Foo"));
        assert_eq!(field.filename(1, "MOBI"), None);
        assert_eq!(field.filename(3, "EPUB"), None);
    }
}
