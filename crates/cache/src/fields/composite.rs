//! Composite columns: values computed from other fields at read time.
//!
//! A composite column's definition is an [upon] template, compiled once
//! when the cache is initialized and rendered against a metadata record
//! whose ordinary fields are already populated. Besides upon's own syntax
//! the engine provides:
//!
//! - **`slug`**: formatter turning text into a URL-safe slug, with
//!   quotation marks stripped first (`{{ title|slug }}`).
//! - **`truncate`**: cuts text to a maximum byte length at a character
//!   boundary (`{{ truncate(title, 10) }}` or `{{ title|truncate: 10 }}`).
//! - **`join`**: joins a list with a separator (`{{ join(tags, ", ") }}`).
//!   Scalars pass through as text.
//!
//! # Template Variables
//!
//! | Variable        | Type                   |
//! |-----------------|------------------------|
//! | `id`            | `Option<u64>`          |
//! | `title`         | `String`               |
//! | `title_sort`    | `String`               |
//! | `authors`       | list of `String`       |
//! | `author_sort`   | `String`               |
//! | `comments`      | `Option<String>`       |
//! | `publisher`     | `Option<String>`       |
//! | `timestamp`     | `String`               |
//! | `pubdate`       | `String`               |
//! | `last_modified` | `String`               |
//! | `uuid`          | `String`               |
//! | `size`          | `u64`                  |
//! | `ondevice`      | `String`               |
//! | `formats`       | `Option<String>`       |
//! | `has_cover`     | `bool`                 |
//! | `tags`          | list of `String`       |
//! | `series`        | `Option<String>`       |
//! | `series_index`  | `Option<f64>`          |
//! | `rating`        | `Option<i64>`          |
//! | `identifiers`   | map of `String`        |
//! | `custom.<label>`| the custom column's value, if set |

use super::Column;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Serialize;
use shelf_model::{BookId, ColumnMeta, Metadata, Value};
use std::collections::BTreeMap;
use upon::Template;

pub(crate) type Engine = upon::Engine<'static>;

/// Template engine with the composite helpers registered.
pub(crate) fn engine() -> Engine {
    let mut engine = Engine::new();
    addons::configure(&mut engine);
    engine
}

pub(crate) struct CompositeField {
    meta: ColumnMeta,
    template: Template<'static>,
}

impl CompositeField {
    /// Compiles the column's template. A column without one renders as
    /// empty text.
    pub(crate) fn new(meta: ColumnMeta, engine: &Engine) -> Result<Self> {
        let source = meta.template.clone().unwrap_or_default();
        let template = engine.compile(source).or_raise(|| ErrorKind::Template(meta.key()))?;
        Ok(Self { meta, template })
    }

    /// Renders the column against `record`.
    ///
    /// A template that fails at render time (an unknown variable, a list
    /// where text was expected) yields empty text.
    pub(crate) fn render(&self, engine: &Engine, record: &Metadata) -> String {
        match self.template.render(engine, Context::new(record)).to_string() {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(column = %self.meta.key(), error = %err, "Composite column failed to render");
                String::new()
            },
        }
    }
}

impl Column for CompositeField {
    fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    /// Needs the book's whole record; the registry renders composites
    /// through [`render()`](Self::render) instead.
    fn for_book(&self, _book_id: BookId) -> Option<Value> {
        None
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Param<'a> {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(&'a str),
    DateTime(String),
    List(&'a [String]),
    Map(&'a BTreeMap<String, String>),
}
impl<'a> From<&'a Value> for Param<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::Integer(i) => Self::Integer(*i),
            Value::Float(f) => Self::Float(*f),
            Value::Text(s) => Self::Text(s),
            Value::DateTime(dt) => Self::DateTime(dt.to_string()),
            Value::List(l) => Self::List(l),
            Value::Map(m) => Self::Map(m),
        }
    }
}

#[derive(Serialize)]
struct Context<'a> {
    id: Option<BookId>,
    title: &'a str,
    title_sort: &'a str,
    authors: &'a [String],
    author_sort: &'a str,
    comments: Option<&'a str>,
    publisher: Option<&'a str>,
    timestamp: String,
    pubdate: String,
    last_modified: String,
    uuid: &'a str,
    size: u64,
    ondevice: &'a str,
    formats: Option<&'a str>,
    has_cover: bool,
    tags: &'a [String],
    series: Option<&'a str>,
    series_index: Option<f64>,
    rating: Option<i64>,
    identifiers: &'a BTreeMap<String, String>,
    custom: BTreeMap<&'a str, Option<Param<'a>>>,
}
impl<'a> Context<'a> {
    fn new(mi: &'a Metadata) -> Self {
        let custom = mi
            .user_metadata
            .values()
            .map(|c| (c.meta.label.as_str(), c.value.as_ref().map(Param::from)))
            .collect();
        Self {
            id: mi.id,
            title: &mi.title,
            title_sort: &mi.title_sort,
            authors: &mi.authors,
            author_sort: &mi.author_sort,
            comments: mi.comments.as_deref(),
            publisher: mi.publisher.as_deref(),
            timestamp: mi.timestamp.to_string(),
            pubdate: mi.pubdate.to_string(),
            last_modified: mi.last_modified.to_string(),
            uuid: &mi.uuid,
            size: mi.book_size,
            ondevice: &mi.ondevice_col,
            formats: mi.formats.as_deref(),
            has_cover: !mi.has_cover.is_empty(),
            tags: &mi.tags,
            series: mi.series.as_deref(),
            series_index: mi.series_index,
            rating: mi.rating,
            identifiers: &mi.identifiers,
            custom,
        }
    }
}

mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Quotation marks dropped before slugifying, so `"hello"` does not
    /// become `-hello-`.
    const QUOTES: [char; 13] = [
        '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}', '\u{0060}',
        '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
    ];

    fn slug(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                let stripped: String = s.chars().filter(|c| !QUOTES.contains(c)).collect();
                write!(f, "{}", slugify!(&stripped))?
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    fn truncate(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].to_string()
    }

    fn text(value: &Value) -> String {
        match value {
            Value::None => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(x) => x.to_string(),
            Value::String(s) => s.clone(),
            Value::List(items) => items.iter().map(text).collect::<Vec<_>>().join(", "),
            Value::Map(map) => map.iter().map(|(k, v)| format!("{k}:{}", text(v))).collect::<Vec<_>>().join(","),
        }
    }

    fn join(value: &Value, separator: &str) -> String {
        match value {
            Value::List(items) => items.iter().map(text).collect::<Vec<_>>().join(separator),
            v => text(v),
        }
    }

    pub(super) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("slug", slug);
        engine.add_function("truncate", truncate);
        engine.add_function("join", join);
    }
}
