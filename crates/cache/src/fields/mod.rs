//! Field objects: one per stored column, answering per-book queries.
//!
//! Each kind of column storage has its own field type. They share the
//! [`Column`] query surface, and [`Field`] dispatches to the right one.

mod composite;
mod formats;
mod identifiers;
mod items;
mod one_to_one;
mod ondevice;

pub(crate) use self::composite::{CompositeField, Engine, engine};
pub(crate) use self::formats::FormatsField;
pub(crate) use self::identifiers::IdentifiersField;
pub(crate) use self::items::{AuthorsField, ItemsField};
pub(crate) use self::one_to_one::OneToOneField;
pub(crate) use self::ondevice::{ONDEVICE, OnDeviceField};
use crate::error::Result;
use shelf_model::{BookId, ColumnMeta, ItemId, Value};
use shelf_storage::{Table, TableData};
use std::collections::BTreeSet;

/// Queries every field answers.
///
/// Item-less fields (one value per book) have no item ids, so the id-based
/// queries default to empty.
pub(crate) trait Column {
    fn meta(&self) -> &ColumnMeta;

    /// The book's value, or `None` if the book has none.
    fn for_book(&self, book_id: BookId) -> Option<Value>;

    /// Ids of the items the book holds, in stored order.
    fn ids_for_book(&self, _book_id: BookId) -> Vec<ItemId> {
        Vec::new()
    }

    /// Books holding the item.
    fn books_for(&self, _item_id: ItemId) -> Vec<BookId> {
        Vec::new()
    }

    /// Every distinct item id in the field.
    fn all_ids(&self) -> BTreeSet<ItemId> {
        BTreeSet::new()
    }

    /// Every book with a value in this field.
    fn book_ids(&self) -> BTreeSet<BookId> {
        BTreeSet::new()
    }
}

pub(crate) enum Field {
    OneToOne(OneToOneField),
    Items(ItemsField),
    Authors(AuthorsField),
    Formats(FormatsField),
    Identifiers(IdentifiersField),
    OnDevice(OnDeviceField),
    Composite(CompositeField),
}

impl Field {
    /// Wraps a backend table. Composite templates are compiled against
    /// `engine` here, so a broken template fails initialization.
    pub(crate) fn from_table(table: Table, engine: &Engine) -> Result<Self> {
        let Table { meta, data } = table;
        Ok(match data {
            TableData::OneToOne(values) => Self::OneToOne(OneToOneField::new(meta, values)),
            TableData::Items { items, books } => Self::Items(ItemsField::new(meta, items, books)),
            TableData::Authors { authors, books } => Self::Authors(AuthorsField::new(meta, authors, books)),
            TableData::Formats(books) => Self::Formats(FormatsField::new(meta, books)),
            TableData::Identifiers(books) => Self::Identifiers(IdentifiersField::new(meta, books)),
            TableData::Composite => Self::Composite(CompositeField::new(meta, engine)?),
        })
    }

    pub(crate) fn column(&self) -> &dyn Column {
        match self {
            Self::OneToOne(f) => f,
            Self::Items(f) => f,
            Self::Authors(f) => f,
            Self::Formats(f) => f,
            Self::Identifiers(f) => f,
            Self::OnDevice(f) => f,
            Self::Composite(f) => f,
        }
    }

    pub(crate) fn meta(&self) -> &ColumnMeta {
        self.column().meta()
    }

    pub(crate) fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}
