use super::Column;
use shelf_model::{AuthorData, BookId, ColumnMeta, ItemId, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Builds the item to books index from the book to items links.
fn invert(books: &BTreeMap<BookId, Vec<ItemId>>) -> BTreeMap<ItemId, Vec<BookId>> {
    let mut index: BTreeMap<ItemId, Vec<BookId>> = BTreeMap::new();
    for (&book_id, item_ids) in books {
        for &item_id in item_ids {
            index.entry(item_id).or_default().push(book_id);
        }
    }
    index
}

/// A field whose values are shared items (`tags`, `series`, `publisher`).
///
/// Single-valued item fields answer with the book's first item as text;
/// multi-valued ones with the list of item values in link order.
pub(crate) struct ItemsField {
    meta: ColumnMeta,
    items: BTreeMap<ItemId, String>,
    books: BTreeMap<BookId, Vec<ItemId>>,
    index: BTreeMap<ItemId, Vec<BookId>>,
}

impl ItemsField {
    pub(crate) fn new(meta: ColumnMeta, items: BTreeMap<ItemId, String>, books: BTreeMap<BookId, Vec<ItemId>>) -> Self {
        let index = invert(&books);
        Self { meta, items, books, index }
    }
}

impl Column for ItemsField {
    fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    fn for_book(&self, book_id: BookId) -> Option<Value> {
        let mut values = self.books.get(&book_id)?.iter().filter_map(|id| self.items.get(id)).cloned();
        match self.meta.is_multiple {
            true => {
                let list: Vec<String> = values.collect();
                (!list.is_empty()).then_some(Value::List(list))
            },
            false => values.next().map(Value::Text),
        }
    }

    fn ids_for_book(&self, book_id: BookId) -> Vec<ItemId> {
        self.books.get(&book_id).cloned().unwrap_or_default()
    }

    fn books_for(&self, item_id: ItemId) -> Vec<BookId> {
        self.index.get(&item_id).cloned().unwrap_or_default()
    }

    fn all_ids(&self) -> BTreeSet<ItemId> {
        self.items.keys().copied().collect()
    }

    fn book_ids(&self) -> BTreeSet<BookId> {
        self.books.keys().copied().collect()
    }
}

/// The `authors` field. Items carry a sort key and a link alongside the
/// name.
pub(crate) struct AuthorsField {
    meta: ColumnMeta,
    authors: BTreeMap<ItemId, AuthorData>,
    books: BTreeMap<BookId, Vec<ItemId>>,
    index: BTreeMap<ItemId, Vec<BookId>>,
}

impl AuthorsField {
    pub(crate) fn new(
        meta: ColumnMeta,
        authors: BTreeMap<ItemId, AuthorData>,
        books: BTreeMap<BookId, Vec<ItemId>>,
    ) -> Self {
        let index = invert(&books);
        Self { meta, authors, books, index }
    }

    pub(crate) fn author_data(&self, author_id: ItemId) -> Option<&AuthorData> {
        self.authors.get(&author_id)
    }
}

impl Column for AuthorsField {
    fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    fn for_book(&self, book_id: BookId) -> Option<Value> {
        let names: Vec<String> = self
            .books
            .get(&book_id)?
            .iter()
            .filter_map(|id| self.authors.get(id))
            .map(|a| a.name.clone())
            .collect();
        (!names.is_empty()).then_some(Value::List(names))
    }

    fn ids_for_book(&self, book_id: BookId) -> Vec<ItemId> {
        self.books.get(&book_id).cloned().unwrap_or_default()
    }

    fn books_for(&self, item_id: ItemId) -> Vec<BookId> {
        self.index.get(&item_id).cloned().unwrap_or_default()
    }

    fn all_ids(&self) -> BTreeSet<ItemId> {
        self.authors.keys().copied().collect()
    }

    fn book_ids(&self) -> BTreeSet<BookId> {
        self.books.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use shelf_model::Datatype;

    #[fixture]
    fn tags() -> ItemsField {
        ItemsField::new(
            ColumnMeta::standard("tags", Datatype::Text).multiple(),
            BTreeMap::from([(10, "Fantasy".to_string()), (11, "Epic".to_string())]),
            BTreeMap::from([(1, vec![11, 10]), (2, vec![10]), (3, vec![])]),
        )
    }

    #[rstest]
    fn test_multiple_values_keep_link_order(tags: ItemsField) {
        assert_eq!(
            tags.for_book(1),
            Some(Value::List(vec!["Epic".to_string(), "Fantasy".to_string()]))
        );
        assert_eq!(tags.for_book(3), None);
        assert_eq!(tags.for_book(99), None);
    }

    #[rstest]
    fn test_item_queries(tags: ItemsField) {
        assert_eq!(tags.ids_for_book(1), vec![11, 10]);
        assert_eq!(tags.books_for(10), vec![1, 2]);
        assert!(tags.books_for(12).is_empty());
        assert_eq!(tags.all_ids(), BTreeSet::from([10, 11]));
    }

    #[test]
    fn test_single_value_is_text() {
        let series = ItemsField::new(
            ColumnMeta::standard("series", Datatype::Series),
            BTreeMap::from([(5, "Discworld".to_string())]),
            BTreeMap::from([(1, vec![5])]),
        );
        assert_eq!(series.for_book(1), Some(Value::from("Discworld")));
    }

    #[test]
    fn test_author_data() {
        let authors = AuthorsField::new(
            ColumnMeta::standard("authors", Datatype::Text).multiple(),
            BTreeMap::from([(1, AuthorData::new("Alice", "Alice, A.", ""))]),
            BTreeMap::from([(1, vec![1])]),
        );
        assert_eq!(authors.for_book(1), Some(Value::List(vec!["Alice".to_string()])));
        assert_eq!(authors.author_data(1).map(|a| a.sort.as_str()), Some("Alice, A."));
        assert!(authors.author_data(2).is_none());
        assert_eq!(authors.books_for(1), vec![1]);
    }
}
