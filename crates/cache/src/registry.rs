//! The field registry: every field the cache knows, by name.

use crate::error::{ErrorKind, Result};
use crate::fields::{CompositeField, Engine, Field, ONDEVICE, OnDeviceField, engine};
use shelf_model::{AuthorData, BookId, ItemId, Value};
use shelf_storage::Table;
use std::collections::{BTreeMap, BTreeSet};

/// Field whose books define the set of books in the library.
const BOOK_ID_FIELD: &str = "uuid";

pub(crate) struct Registry {
    fields: BTreeMap<String, Field>,
    engine: Engine,
    initialized: bool,
}

impl Default for Registry {
    /// An empty registry, as seen before initialization.
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            engine: engine(),
            initialized: false,
        }
    }
}

impl Registry {
    /// Builds one field per backend table plus the synthetic `ondevice`
    /// field.
    pub(crate) fn from_tables(tables: impl IntoIterator<Item = (String, Table)>) -> Result<Self> {
        let mut registry = Self::default();
        for (name, table) in tables {
            if name == ONDEVICE {
                tracing::warn!(field = %name, "Ignoring backend table that shadows a synthetic field");
                continue;
            }
            let field = Field::from_table(table, &registry.engine)?;
            registry.fields.insert(name, field);
        }
        registry.fields.insert(ONDEVICE.to_string(), Field::OnDevice(OnDeviceField::default()));
        registry.initialized = true;
        Ok(registry)
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Stored value of a non-composite field.
    pub(crate) fn value(&self, name: &str, book_id: BookId) -> Option<Value> {
        self.get(name)?.column().for_book(book_id)
    }

    pub(crate) fn has_book(&self, book_id: BookId) -> bool {
        self.value(BOOK_ID_FIELD, book_id).is_some()
    }

    pub(crate) fn field_ids_for(&self, name: &str, book_id: BookId) -> Vec<ItemId> {
        self.get(name).map(|f| f.column().ids_for_book(book_id)).unwrap_or_default()
    }

    pub(crate) fn books_for_field(&self, name: &str, item_id: ItemId) -> Vec<BookId> {
        self.get(name).map(|f| f.column().books_for(item_id)).unwrap_or_default()
    }

    pub(crate) fn all_book_ids(&self) -> BTreeSet<BookId> {
        self.get(BOOK_ID_FIELD).map(|f| f.column().book_ids()).unwrap_or_default()
    }

    pub(crate) fn all_field_ids(&self, name: &str) -> Result<BTreeSet<ItemId>> {
        match self.get(name) {
            Some(field) => Ok(field.column().all_ids()),
            None => exn::bail!(ErrorKind::UnknownField(name.to_string())),
        }
    }

    pub(crate) fn author_data(&self, author_id: ItemId) -> Option<&AuthorData> {
        match self.get("authors")? {
            Field::Authors(authors) => authors.author_data(author_id),
            _ => None,
        }
    }

    pub(crate) fn composite(&self, name: &str) -> Option<&CompositeField> {
        match self.get(name)? {
            Field::Composite(field) => Some(field),
            _ => None,
        }
    }

    /// Custom columns in key order.
    pub(crate) fn custom_columns(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().filter(|(_, f)| f.meta().is_custom).map(|(k, f)| (k.as_str(), f))
    }

    pub(crate) fn set_ondevice(&mut self, markers: BTreeMap<BookId, String>) {
        if let Some(Field::OnDevice(field)) = self.fields.get_mut(ONDEVICE) {
            field.set_markers(markers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_model::{ColumnMeta, Datatype};

    fn tables() -> Vec<(String, Table)> {
        vec![
            (
                "uuid".to_string(),
                Table::one_to_one(
                    ColumnMeta::standard("uuid", Datatype::Text),
                    [(1, Value::from("u-1")), (2, Value::from("u-2"))],
                ),
            ),
            (
                "tags".to_string(),
                Table::items(
                    ColumnMeta::standard("tags", Datatype::Text).multiple(),
                    [(10, "Fantasy")],
                    [(1, vec![10])],
                ),
            ),
            ("#b".to_string(), Table::composite(ColumnMeta::composite("b", "B", "{{ title }}"))),
            (
                "#a".to_string(),
                Table::one_to_one(ColumnMeta::custom("a", "A", Datatype::Int), [(1, Value::Integer(3))]),
            ),
        ]
    }

    #[test]
    fn test_empty_before_init() {
        let registry = Registry::default();
        assert!(!registry.is_initialized());
        assert_eq!(registry.len(), 0);
        assert!(registry.all_book_ids().is_empty());
        assert_eq!(registry.value("title", 1), None);
    }

    #[test]
    fn test_registers_tables_and_ondevice() {
        let registry = Registry::from_tables(tables()).unwrap();
        assert!(registry.is_initialized());
        assert_eq!(registry.len(), 5);
        assert!(registry.get(ONDEVICE).is_some());
        assert_eq!(registry.all_book_ids(), BTreeSet::from([1, 2]));
        assert!(registry.has_book(2));
        assert!(!registry.has_book(3));
    }

    #[test]
    fn test_custom_columns_in_key_order() {
        let registry = Registry::from_tables(tables()).unwrap();
        let keys: Vec<_> = registry.custom_columns().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["#a", "#b"]);
        assert!(registry.composite("#b").is_some());
        assert!(registry.composite("#a").is_none());
    }

    #[test]
    fn test_all_field_ids_requires_registered_field() {
        let registry = Registry::from_tables(tables()).unwrap();
        assert_eq!(registry.all_field_ids("tags").unwrap(), BTreeSet::from([10]));
        let err = registry.all_field_ids("nonsense").unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownField(name) if name == "nonsense"));
    }

    #[test]
    fn test_synthetic_field_is_not_shadowed() {
        let mut tables = tables();
        tables.push((
            ONDEVICE.to_string(),
            Table::one_to_one(ColumnMeta::standard(ONDEVICE, Datatype::Text), [(1, Value::from("x"))]),
        ));
        let mut registry = Registry::from_tables(tables).unwrap();
        assert_eq!(registry.value(ONDEVICE, 1), None);
        registry.set_ondevice(BTreeMap::from([(1, "Main".to_string())]));
        assert_eq!(registry.value(ONDEVICE, 1), Some(Value::from("Main")));
    }

    #[test]
    fn test_broken_template_fails() {
        let tables = vec![("#c".to_string(), Table::composite(ColumnMeta::composite("c", "C", "{% if %}")))];
        let err = Registry::from_tables(tables).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Template(_)));
    }
}
