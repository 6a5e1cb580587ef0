use crate::{BookId, ColumnMeta, FormatMetadata, UNKNOWN, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::OffsetDateTime;

/// Value of one custom column on a [`Metadata`] record.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomValue {
    pub meta: ColumnMeta,
    pub value: Option<Value>,
    /// Auxiliary value, such as the index of a series-typed column.
    pub extra: Option<Value>,
}

/// Point-in-time snapshot of one book, composed from many independently
/// stored fields.
///
/// Records are rebuilt on every request and never cached; mutating one has
/// no effect on the library.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Internal book id
    pub id: Option<BookId>,
    /// Identity exposed to callers outside the cache
    pub application_id: Option<BookId>,
    pub title: String,
    pub title_sort: String,
    pub authors: Vec<String>,
    pub author_sort: String,
    /// Author name to sort key
    pub author_sort_map: BTreeMap<String, String>,
    /// Author name to link
    pub author_link_map: BTreeMap<String, String>,
    pub comments: Option<String>,
    pub publisher: Option<String>,
    pub timestamp: OffsetDateTime,
    pub pubdate: OffsetDateTime,
    pub last_modified: OffsetDateTime,
    pub uuid: String,
    pub book_size: u64,
    pub ondevice_col: String,
    /// Comma-joined format codes; `None` when the book has no formats.
    pub formats: Option<String>,
    pub format_metadata: BTreeMap<String, FormatMetadata>,
    /// `"Yes"` when a cover exists, empty otherwise.
    pub has_cover: String,
    pub tags: Vec<String>,
    pub series: Option<String>,
    /// Only ever set alongside [`series`](Self::series).
    pub series_index: Option<f64>,
    pub rating: Option<i64>,
    pub identifiers: BTreeMap<String, String>,
    /// Custom columns by key (`#label`)
    pub user_metadata: BTreeMap<String, CustomValue>,
    /// User category name to matching `(value, field)` pairs
    pub user_categories: BTreeMap<String, Vec<(String, String)>>,
    /// Path of a temporary file holding the cover, when requested.
    pub cover: Option<PathBuf>,
    /// Image format label and raw cover bytes, when requested.
    pub cover_data: Option<(String, Vec<u8>)>,
}
impl Metadata {
    /// An empty record with placeholder text, all dates set to `now`.
    pub fn unknown(now: OffsetDateTime) -> Self {
        Self {
            id: None,
            application_id: None,
            title: UNKNOWN.to_string(),
            title_sort: UNKNOWN.to_string(),
            authors: vec![UNKNOWN.to_string()],
            author_sort: UNKNOWN.to_string(),
            author_sort_map: BTreeMap::new(),
            author_link_map: BTreeMap::new(),
            comments: None,
            publisher: None,
            timestamp: now,
            pubdate: now,
            last_modified: now,
            uuid: String::new(),
            book_size: 0,
            ondevice_col: String::new(),
            formats: None,
            format_metadata: BTreeMap::new(),
            has_cover: String::new(),
            tags: Vec::new(),
            series: None,
            series_index: None,
            rating: None,
            identifiers: BTreeMap::new(),
            user_metadata: BTreeMap::new(),
            user_categories: BTreeMap::new(),
            cover: None,
            cover_data: None,
        }
    }

    /// Registers the schema of a custom column, clearing any value it had.
    pub fn set_user_metadata(&mut self, key: impl Into<String>, meta: ColumnMeta) {
        self.user_metadata.insert(key.into(), CustomValue { meta, value: None, extra: None });
    }

    /// Sets the value of a registered custom column.
    ///
    /// Returns `false` (and changes nothing) if no schema was registered for
    /// `key` first.
    pub fn set(&mut self, key: &str, value: Option<Value>, extra: Option<Value>) -> bool {
        match self.user_metadata.get_mut(key) {
            Some(custom) => {
                custom.value = value;
                custom.extra = extra;
                true
            },
            None => false,
        }
    }

    /// Looks up a field of this record by its registry name.
    ///
    /// Custom columns are reached by `#label`, and `#label_index` reaches
    /// their extra value. Unset values and unknown keys are `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        if key.starts_with('#') {
            if let Some(custom) = self.user_metadata.get(key) {
                return custom.value.clone();
            }
            let parent = key.strip_suffix("_index")?;
            return self.user_metadata.get(parent).and_then(|c| c.extra.clone());
        }
        Some(match key {
            "id" => Value::Integer(i64::try_from(self.id?).ok()?),
            "title" => Value::Text(self.title.clone()),
            "sort" | "title_sort" => Value::Text(self.title_sort.clone()),
            "authors" => Value::List(self.authors.clone()),
            "author_sort" => Value::Text(self.author_sort.clone()),
            "comments" => Value::Text(self.comments.clone()?),
            "publisher" => Value::Text(self.publisher.clone()?),
            "timestamp" => Value::DateTime(self.timestamp),
            "pubdate" => Value::DateTime(self.pubdate),
            "last_modified" => Value::DateTime(self.last_modified),
            "uuid" => Value::Text(self.uuid.clone()),
            "size" => Value::Integer(i64::try_from(self.book_size).ok()?),
            "ondevice" => Value::Text(self.ondevice_col.clone()),
            "formats" => Value::Text(self.formats.clone()?),
            "cover" => Value::Bool(!self.has_cover.is_empty()),
            "tags" => Value::List(self.tags.clone()),
            "series" => Value::Text(self.series.clone()?),
            "series_index" => Value::Float(self.series_index?),
            "rating" => Value::Integer(self.rating?),
            "identifiers" => Value::Map(self.identifiers.clone()),
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Datatype;

    fn record() -> Metadata {
        let mut mi = Metadata::unknown(OffsetDateTime::UNIX_EPOCH);
        mi.title = "Foo".to_string();
        mi.tags = vec!["Fantasy".to_string()];
        mi
    }

    #[test]
    fn test_unknown_placeholders() {
        let mi = Metadata::unknown(OffsetDateTime::UNIX_EPOCH);
        assert_eq!(mi.title, UNKNOWN);
        assert_eq!(mi.author_sort, UNKNOWN);
        assert_eq!(mi.timestamp, OffsetDateTime::UNIX_EPOCH);
        assert!(mi.formats.is_none());
        assert!(mi.series_index.is_none());
    }

    #[test]
    fn test_get_standard_fields() {
        let mi = record();
        assert_eq!(mi.get("title"), Some(Value::from("Foo")));
        assert_eq!(mi.get("tags"), Some(Value::List(vec!["Fantasy".to_string()])));
        assert_eq!(mi.get("series"), None);
        assert_eq!(mi.get("series_index"), None);
        assert_eq!(mi.get("cover"), Some(Value::Bool(false)));
        assert_eq!(mi.get("nonsense"), None);
    }

    #[test]
    fn test_set_requires_registered_schema() {
        let mut mi = record();
        assert!(!mi.set("#mycol", Some(Value::from("x")), None));
        assert_eq!(mi.get("#mycol"), None);

        mi.set_user_metadata("#mycol", ColumnMeta::custom("mycol", "My Column", Datatype::Text));
        assert!(mi.set("#mycol", Some(Value::from("x")), None));
        assert_eq!(mi.get("#mycol"), Some(Value::from("x")));
    }

    #[test]
    fn test_get_custom_extra_through_index_key() {
        let mut mi = record();
        mi.set_user_metadata("#reading", ColumnMeta::custom("reading", "Reading", Datatype::Series));
        mi.set("#reading", Some(Value::from("Discworld")), Some(Value::Float(3.0)));
        assert_eq!(mi.get("#reading"), Some(Value::from("Discworld")));
        assert_eq!(mi.get("#reading_index"), Some(Value::Float(3.0)));
        assert_eq!(mi.get("#missing_index"), None);
    }
}
