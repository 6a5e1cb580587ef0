//! Table handles produced by a backend.
//!
//! A table is the backend's in-memory copy of one stored column. The cache
//! consumes each table exactly once, at initialization, and wraps it in a
//! field object that answers per-book queries.

use shelf_model::{AuthorData, BookId, ColumnMeta, ItemId, Value};
use std::collections::BTreeMap;

/// One stored column: its schema plus its data.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub meta: ColumnMeta,
    pub data: TableData,
}

/// The storage shapes a column can take.
#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    /// At most one value per book (`title`, `path`, `timestamp`, ...).
    OneToOne(BTreeMap<BookId, Value>),
    /// Distinct values shared between books (`tags`, `series`,
    /// `publisher`). Each book maps to its ordered item ids.
    Items {
        items: BTreeMap<ItemId, String>,
        books: BTreeMap<BookId, Vec<ItemId>>,
    },
    /// Like [`Items`](Self::Items), but every item carries a sort key and
    /// a link.
    Authors {
        authors: BTreeMap<ItemId, AuthorData>,
        books: BTreeMap<BookId, Vec<ItemId>>,
    },
    /// Per book, format code (uppercase) to the stored file name without
    /// extension.
    Formats(BTreeMap<BookId, BTreeMap<String, String>>),
    /// Per book, identifier type to identifier value.
    Identifiers(BTreeMap<BookId, BTreeMap<String, String>>),
    /// Computed at read time from the column's template. Nothing is stored.
    Composite,
}

impl Table {
    pub fn new(meta: ColumnMeta, data: TableData) -> Self {
        Self { meta, data }
    }

    pub fn one_to_one(meta: ColumnMeta, values: impl IntoIterator<Item = (BookId, Value)>) -> Self {
        Self::new(meta, TableData::OneToOne(values.into_iter().collect()))
    }

    /// Builds an item table from `(item id, value)` pairs and
    /// `(book id, item ids)` links.
    pub fn items(
        meta: ColumnMeta,
        items: impl IntoIterator<Item = (ItemId, impl Into<String>)>,
        books: impl IntoIterator<Item = (BookId, Vec<ItemId>)>,
    ) -> Self {
        Self::new(
            meta,
            TableData::Items {
                items: items.into_iter().map(|(id, v)| (id, v.into())).collect(),
                books: books.into_iter().collect(),
            },
        )
    }

    pub fn authors(
        meta: ColumnMeta,
        authors: impl IntoIterator<Item = (ItemId, AuthorData)>,
        books: impl IntoIterator<Item = (BookId, Vec<ItemId>)>,
    ) -> Self {
        Self::new(
            meta,
            TableData::Authors {
                authors: authors.into_iter().collect(),
                books: books.into_iter().collect(),
            },
        )
    }

    /// Builds a formats table. Format codes are uppercased.
    pub fn formats(
        meta: ColumnMeta,
        books: impl IntoIterator<Item = (BookId, Vec<(impl AsRef<str>, impl Into<String>)>)>,
    ) -> Self {
        let books = books
            .into_iter()
            .map(|(book, formats)| {
                let formats = formats
                    .into_iter()
                    .map(|(fmt, name)| (fmt.as_ref().to_uppercase(), name.into()))
                    .collect();
                (book, formats)
            })
            .collect();
        Self::new(meta, TableData::Formats(books))
    }

    pub fn identifiers(meta: ColumnMeta, books: impl IntoIterator<Item = (BookId, BTreeMap<String, String>)>) -> Self {
        Self::new(meta, TableData::Identifiers(books.into_iter().collect()))
    }

    pub fn composite(meta: ColumnMeta) -> Self {
        Self::new(meta, TableData::Composite)
    }
}
