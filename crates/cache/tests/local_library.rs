use shelf_cache::{Cache, Location, MetadataOptions};
use shelf_config::Preferences;
use shelf_model::{AuthorData, ColumnMeta, Datatype, Value};
use shelf_storage::backend::LocalBackend;
use shelf_storage::{Cover, CoverShape, Table};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const BOOK_PATH: &str = "Terry Pratchett/Mort (1)";
const FILENAME: &str = "Mort - Terry Pratchett";

fn library() -> (TempDir, Cache) {
    let temp_dir = tempfile::tempdir().unwrap();
    let folder = temp_dir.path().join("Terry Pratchett").join("Mort (1)");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join(format!("{FILENAME}.epub")), b"0123456789").unwrap();
    fs::write(folder.join("cover.jpg"), b"not really a jpeg").unwrap();

    let backend = LocalBackend::new("local", temp_dir.path())
        .unwrap()
        .with_table(
            "uuid",
            Table::one_to_one(ColumnMeta::standard("uuid", Datatype::Text), [(1, "u-1".into()), (2, "u-2".into())]),
        )
        .with_table(
            "title",
            Table::one_to_one(
                ColumnMeta::standard("title", Datatype::Text),
                [(1, "Mort".into()), (2, "Orphan".into())],
            ),
        )
        .with_table("path", Table::one_to_one(ColumnMeta::standard("path", Datatype::Text), [(1, BOOK_PATH.into())]))
        .with_table(
            "authors",
            Table::authors(
                ColumnMeta::standard("authors", Datatype::Text).multiple(),
                [(1, AuthorData::new("Terry Pratchett", "Pratchett, Terry", ""))],
                [(1, vec![1])],
            ),
        )
        .with_table(
            "formats",
            Table::formats(
                ColumnMeta::standard("formats", Datatype::Text).multiple(),
                [(1, vec![("epub", FILENAME), ("pdf", FILENAME)])],
            ),
        )
        .with_table(
            "#slug",
            Table::composite(ColumnMeta::composite(
                "slug",
                "Slug",
                "{{ title|slug }}-{{ join(authors, \"+\")|slug }}",
            )),
        );
    let cache = Cache::new(Arc::new(backend), Preferences::default());
    cache.init().unwrap();
    (temp_dir, cache)
}

#[test]
fn test_format_files_on_disk() {
    let (dir, cache) = library();
    let epub = dir.path().join("Terry Pratchett").join("Mort (1)").join(format!("{FILENAME}.epub"));

    assert_eq!(
        cache.format_location(1, "epub"),
        Ok(Location {
            path: BOOK_PATH.to_string(),
            filename: FILENAME.to_string()
        })
    );
    assert_eq!(cache.format_abspath(1, "EPUB"), Some(epub.clone()));
    // Listed in the formats table, but missing from the folder.
    assert_eq!(cache.format_abspath(1, "PDF"), None);
    assert!(cache.format_metadata(1, "PDF", true).is_none());

    let attributes = cache.format_metadata(1, "EPUB", true).unwrap();
    assert_eq!(attributes.size, 10);
    assert_eq!(attributes.path, epub);

    // The memo keeps the old size until told otherwise.
    fs::write(&epub, b"01234567890123456789").unwrap();
    assert_eq!(cache.format_metadata(1, "EPUB", true).unwrap().size, 10);
    assert_eq!(cache.format_metadata(1, "EPUB", false).unwrap().size, 20);
    fs::write(&epub, b"0").unwrap();
    assert!(cache.invalidate_format_metadata(1, "epub"));
    assert_eq!(cache.format_metadata(1, "EPUB", true).unwrap().size, 1);
}

#[test]
fn test_metadata_from_disk() {
    let (_dir, cache) = library();
    let mi = cache.get_metadata(1, MetadataOptions::default().with_cover_data());
    assert_eq!(mi.title, "Mort");
    assert_eq!(mi.authors, vec!["Terry Pratchett".to_string()]);
    assert_eq!(mi.formats.as_deref(), Some("EPUB,PDF"));
    assert_eq!(mi.format_metadata["EPUB"].size, 10);
    assert!(!mi.format_metadata.contains_key("PDF"));
    assert_eq!(mi.get("#slug"), Some(Value::from("mort-terry-pratchett")));
    assert_eq!(mi.cover_data, Some(("jpeg".to_string(), b"not really a jpeg".to_vec())));
}

#[test]
fn test_cover_shapes() {
    let (_dir, cache) = library();
    let Some(Cover::Path(path)) = cache.cover(1, CoverShape::Path) else {
        panic!("expected a cover file");
    };
    assert_eq!(fs::read(&path).unwrap(), b"not really a jpeg");
    fs::remove_file(path).unwrap();

    let mi = cache.get_metadata(1, MetadataOptions::default().with_cover());
    let path = mi.cover.unwrap();
    assert!(path.is_file());
    fs::remove_file(path).unwrap();

    // The bytes are not a decodable image.
    assert!(cache.cover(1, CoverShape::Image).is_none());
}

#[test]
fn test_book_without_folder() {
    let (_dir, cache) = library();
    let mi = cache.get_metadata(2, MetadataOptions::default().with_cover());
    assert_eq!(mi.title, "Orphan");
    assert_eq!(mi.cover, None);
    assert!(cache.cover(2, CoverShape::Bytes).is_none());
    assert!(cache.format_location(2, "EPUB").is_err());
}
