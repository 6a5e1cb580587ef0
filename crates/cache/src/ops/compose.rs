//! Assembling a [`Metadata`] record from individually stored fields.

use super::ReadOps;
use shelf_model::{BookId, Metadata, UNKNOWN, Value};
use std::collections::BTreeMap;
use time::OffsetDateTime;

impl ReadOps<'_> {
    fn text(&self, name: &str, book_id: BookId) -> Option<String> {
        self.field_for(name, book_id, None).and_then(|v| v.as_str().map(str::to_string))
    }

    fn list(&self, name: &str, book_id: BookId) -> Vec<String> {
        self.field_for(name, book_id, None)
            .and_then(|v| v.as_list().map(<[String]>::to_vec))
            .unwrap_or_default()
    }

    fn datetime(&self, name: &str, book_id: BookId, now: OffsetDateTime) -> OffsetDateTime {
        self.field_for(name, book_id, None).and_then(|v| v.as_datetime()).unwrap_or(now)
    }

    /// Composes the full record for one book.
    ///
    /// Runs entirely under the read lock already held by `self`. Missing
    /// values fall back to per-field defaults, so an unknown book yields a
    /// placeholder record rather than an error. Covers are not loaded here.
    pub(crate) fn metadata(&self, book_id: BookId, user_categories: bool) -> Metadata {
        let now = OffsetDateTime::now_utc();
        let mut mi = Metadata::unknown(now);

        // Authors. A repeated name keeps the sort key and link of its last
        // occurrence.
        let authors: Vec<_> = self
            .field_ids_for("authors", book_id)
            .into_iter()
            .filter_map(|id| self.author_data(id))
            .collect();
        mi.authors = authors.iter().map(|a| a.name.clone()).collect();
        for author in authors {
            mi.author_sort_map.insert(author.name.clone(), author.sort);
            mi.author_link_map.insert(author.name, author.link);
        }

        mi.title = self.text("title", book_id).unwrap_or_else(|| UNKNOWN.to_string());
        mi.author_sort = self.text("author_sort", book_id).unwrap_or_else(|| UNKNOWN.to_string());
        mi.comments = self.text("comments", book_id);
        mi.publisher = self.text("publisher", book_id);
        mi.timestamp = self.datetime("timestamp", book_id, now);
        mi.pubdate = self.datetime("pubdate", book_id, now);
        mi.uuid = self.text("uuid", book_id).unwrap_or_default();
        mi.title_sort = self.text("sort", book_id).unwrap_or_else(|| UNKNOWN.to_string());
        mi.book_size = self
            .field_for("size", book_id, None)
            .and_then(|v| v.as_i64())
            .and_then(|size| u64::try_from(size).ok())
            .unwrap_or(0);
        mi.ondevice_col = self.text("ondevice", book_id).unwrap_or_default();
        mi.last_modified = self.datetime("last_modified", book_id, now);

        let formats = self.list("formats", book_id);
        if !formats.is_empty() {
            for fmt in &formats {
                if let Some(attributes) = self.format_metadata(book_id, fmt, true) {
                    mi.format_metadata.insert(fmt.clone(), attributes);
                }
            }
            mi.formats = Some(formats.join(","));
        }

        let has_cover = self.field_for("cover", book_id, None).and_then(|v| v.as_bool()).unwrap_or(false);
        mi.has_cover = if has_cover { "Yes".to_string() } else { String::new() };
        mi.tags = self.list("tags", book_id);
        mi.series = self.text("series", book_id);
        if mi.series.is_some() {
            mi.series_index = Some(
                self.field_for("series_index", book_id, None)
                    .and_then(|v| v.as_f64())
                    .unwrap_or(1.0),
            );
        }
        mi.rating = self.field_for("rating", book_id, None).and_then(|v| v.as_i64());
        mi.identifiers = self
            .field_for("identifiers", book_id, None)
            .and_then(|v| v.as_map().cloned())
            .unwrap_or_default();

        mi.id = Some(book_id);
        mi.application_id = Some(book_id);

        // Composites read the record, so they go only once every ordinary
        // custom column is in place.
        let mut composites = Vec::new();
        for (key, field) in self.registry.custom_columns() {
            mi.set_user_metadata(key, field.meta().clone());
            if field.is_composite() {
                composites.push(key);
            } else {
                let value = field.column().for_book(book_id);
                let extra = self.field_for(&format!("{key}_index"), book_id, None);
                mi.set(key, value, extra);
            }
        }
        for key in composites {
            self.composite_for(key, book_id, &mut mi, None);
        }

        if user_categories {
            mi.user_categories = self.user_categories(&mi);
        }
        mi
    }

    /// Which members of each user category the record matches, as
    /// `(member name, field)` pairs. Members naming an unregistered field
    /// are skipped.
    fn user_categories(&self, mi: &Metadata) -> BTreeMap<String, Vec<(String, String)>> {
        self.preferences
            .user_categories
            .iter()
            .map(|(category, members)| {
                let matches = members
                    .iter()
                    .filter(|m| self.registry.get(&m.field).is_some())
                    .filter(|m| mi.get(&m.field).is_some_and(|v: Value| v.matches_name(&m.name)))
                    .map(|m| (m.name.clone(), m.field.clone()))
                    .collect();
                (category.clone(), matches)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::Cache;
    use crate::MetadataOptions;
    use shelf_config::Preferences;
    use shelf_model::{AuthorData, CategoryMember, ColumnMeta, Datatype, UNKNOWN, Value};
    use shelf_storage::Table;
    use shelf_storage::backend::MockBackend;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn standard(label: &str, datatype: Datatype) -> ColumnMeta {
        ColumnMeta::standard(label, datatype)
    }

    fn backend() -> MockBackend {
        let published = OffsetDateTime::from_unix_timestamp(1_000_000_000).unwrap();
        let isbn = BTreeMap::from([("isbn".to_string(), "123".to_string())]);
        MockBackend::default()
            .with_table(
                "uuid",
                Table::one_to_one(standard("uuid", Datatype::Text), [(1, "u-1".into()), (2, "u-2".into())]),
            )
            .with_table(
                "title",
                Table::one_to_one(standard("title", Datatype::Text), [(1, "Foo".into()), (2, "Bar".into())]),
            )
            .with_table(
                "path",
                Table::one_to_one(
                    standard("path", Datatype::Text),
                    [(1, "Alice/Foo (1)".into()), (2, "Bob/Bar (2)".into())],
                ),
            )
            .with_table(
                "pubdate",
                Table::one_to_one(standard("pubdate", Datatype::DateTime), [(2, published.into())]),
            )
            .with_table(
                "authors",
                Table::authors(
                    standard("authors", Datatype::Text).multiple(),
                    [
                        (1, AuthorData::new("Alice", "Alice, A.", "")),
                        (2, AuthorData::new("Bob", "Bob, B.", "https://bob.example")),
                    ],
                    [(1, vec![1]), (2, vec![2, 1])],
                ),
            )
            .with_table(
                "tags",
                Table::items(
                    standard("tags", Datatype::Text).multiple(),
                    [(10, "Fantasy"), (11, "Epic")],
                    [(2, vec![11, 10])],
                ),
            )
            .with_table(
                "series",
                Table::items(standard("series", Datatype::Series), [(20, "Saga")], [(2, vec![20])]),
            )
            .with_table(
                "series_index",
                Table::one_to_one(standard("series_index", Datatype::Float), [(2, 2.0.into())]),
            )
            .with_table(
                "formats",
                Table::formats(
                    standard("formats", Datatype::Text).multiple(),
                    [(2, vec![("epub", "Bar - Bob"), ("pdf", "Bar - Bob")])],
                ),
            )
            .with_table("identifiers", Table::identifiers(standard("identifiers", Datatype::Text), [(2, isbn)]))
            .with_table("cover", Table::one_to_one(standard("cover", Datatype::Bool), [(2, true.into())]))
            .with_table(
                "#summary",
                Table::composite(ColumnMeta::composite(
                    "summary",
                    "Summary",
                    "{{ join(tags, \"/\") }}|{{ custom.shelf }}",
                )),
            )
            .with_table(
                "#shelf",
                Table::one_to_one(ColumnMeta::custom("shelf", "Shelf", Datatype::Text), [(2, "Top".into())]),
            )
            .with_table(
                "#reading",
                Table::items(
                    ColumnMeta::custom("reading", "Reading", Datatype::Series),
                    [(30, "Holiday")],
                    [(2, vec![30])],
                ),
            )
            .with_table(
                "#reading_index",
                Table::one_to_one(
                    ColumnMeta::custom("reading", "Reading", Datatype::Series).index_sibling(),
                    [(2, 4.0.into())],
                ),
            )
            .with_format(2, "EPUB", 1000)
    }

    fn cache(preferences: Preferences) -> Cache {
        let cache = Cache::new(Arc::new(backend()), preferences);
        cache.init().unwrap();
        cache
    }

    #[test]
    fn test_minimal_book() {
        let mi = cache(Preferences::default()).get_metadata(1, MetadataOptions::default());
        assert_eq!(mi.title, "Foo");
        assert_eq!(mi.authors, vec!["Alice".to_string()]);
        assert_eq!(mi.author_sort_map, BTreeMap::from([("Alice".to_string(), "Alice, A.".to_string())]));
        assert_eq!(mi.formats, None);
        assert!(mi.format_metadata.is_empty());
        assert_eq!(mi.has_cover, "");
        assert_eq!(mi.series, None);
        assert_eq!(mi.series_index, None);
        assert_eq!(mi.title_sort, UNKNOWN);
        assert_eq!(mi.author_sort, UNKNOWN);
        assert_eq!(mi.id, Some(1));
        assert_eq!(mi.application_id, Some(1));
    }

    #[test]
    fn test_full_book() {
        let mi = cache(Preferences::default()).get_metadata(2, MetadataOptions::default());
        assert_eq!(mi.authors, vec!["Bob".to_string(), "Alice".to_string()]);
        assert_eq!(mi.author_link_map["Bob"], "https://bob.example");
        assert_eq!(mi.tags, vec!["Epic".to_string(), "Fantasy".to_string()]);
        assert_eq!(mi.series.as_deref(), Some("Saga"));
        assert_eq!(mi.series_index, Some(2.0));
        assert_eq!(mi.has_cover, "Yes");
        assert_eq!(mi.pubdate, OffsetDateTime::from_unix_timestamp(1_000_000_000).unwrap());
        assert_eq!(mi.identifiers["isbn"], "123");
        assert_eq!(mi.formats.as_deref(), Some("EPUB,PDF"));
        // The PDF's attributes cannot be read, so only the EPUB has any.
        assert_eq!(mi.format_metadata.keys().collect::<Vec<_>>(), vec!["EPUB"]);
        assert_eq!(mi.format_metadata["EPUB"].size, 1000);
    }

    #[test]
    fn test_custom_columns() {
        let mi = cache(Preferences::default()).get_metadata(2, MetadataOptions::default());
        assert_eq!(mi.get("#shelf"), Some(Value::from("Top")));
        assert_eq!(mi.get("#reading"), Some(Value::from("Holiday")));
        assert_eq!(mi.get("#reading_index"), Some(Value::Float(4.0)));
        assert_eq!(mi.get("#summary"), Some(Value::from("Epic/Fantasy|Top")));

        // Every custom column is registered even without a value.
        let mi = cache(Preferences::default()).get_metadata(1, MetadataOptions::default());
        assert!(mi.user_metadata.contains_key("#shelf"));
        assert_eq!(mi.get("#shelf"), None);
        assert_eq!(mi.get("#summary"), Some(Value::from("|")));
    }

    #[test]
    fn test_composite_reads_column_that_sorts_after_it() {
        // `#a` comes first in key order, so it can only see `#z` if
        // composites render after every plain column is set.
        let backend = MockBackend::default()
            .with_table("uuid", Table::one_to_one(standard("uuid", Datatype::Text), [(1, "u-1".into())]))
            .with_table("#a", Table::composite(ColumnMeta::composite("a", "A", "{{ custom.z }}")))
            .with_table(
                "#z",
                Table::one_to_one(ColumnMeta::custom("z", "Z", Datatype::Text), [(1, "late".into())]),
            );
        let cache = Cache::new(Arc::new(backend), Preferences::default());
        cache.init().unwrap();

        let mi = cache.get_metadata(1, MetadataOptions::default());
        assert_eq!(mi.get("#a"), Some(Value::from("late")));
        assert_eq!(cache.field_for("#a", 1, None), Some(Value::from("late")));
    }

    #[test]
    fn test_series_index_defaults_only_with_series() {
        let backend = MockBackend::default()
            .with_table("uuid", Table::one_to_one(standard("uuid", Datatype::Text), [(1, "u-1".into())]))
            .with_table(
                "series",
                Table::items(standard("series", Datatype::Series), [(20, "Saga")], [(1, vec![20])]),
            );
        let cache = Cache::new(Arc::new(backend), Preferences::default());
        cache.init().unwrap();
        assert_eq!(cache.get_metadata(1, MetadataOptions::default()).series_index, Some(1.0));
    }

    #[test]
    fn test_user_categories() {
        let mut preferences = Preferences::default();
        preferences.user_categories = BTreeMap::from([
            (
                "Favourites".to_string(),
                vec![
                    CategoryMember::new("Alice", "authors"),
                    CategoryMember::new("Epic", "tags"),
                    CategoryMember::new("Top", "#shelf"),
                    CategoryMember::new("Saga", "no_such_field"),
                ],
            ),
            ("Empty".to_string(), vec![CategoryMember::new("Nobody", "authors")]),
        ]);
        let cache = cache(preferences);

        let mi = cache.get_metadata(2, MetadataOptions::default());
        assert_eq!(
            mi.user_categories["Favourites"],
            vec![
                ("Alice".to_string(), "authors".to_string()),
                ("Epic".to_string(), "tags".to_string()),
                ("Top".to_string(), "#shelf".to_string()),
            ]
        );
        assert!(mi.user_categories["Empty"].is_empty());

        let mi = cache.get_metadata(2, MetadataOptions::default().without_user_categories());
        assert!(mi.user_categories.is_empty());
    }

    #[test]
    fn test_unknown_book_is_placeholder() {
        let mi = cache(Preferences::default()).get_metadata(99, MetadataOptions::default());
        assert_eq!(mi.title, UNKNOWN);
        assert!(mi.authors.is_empty());
        assert_eq!(mi.id, Some(99));
    }
}
