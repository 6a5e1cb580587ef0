use crate::error::{ErrorKind, Result};
use crate::format::{FormatMemo, LocateError, Location};
use crate::lock::RecordLock;
use crate::ops::{ReadOps, WriteOps};
use crate::registry::Registry;
use parking_lot::RwLock;
use shelf_config::Preferences;
use shelf_model::{AuthorData, BookId, FormatMetadata, ItemId, Metadata, Value};
use shelf_storage::{BackendHandle, Cover, CoverShape};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::instrument;

/// Generates the locked public entry point of each unlocked operation:
/// take the named lock, run the operation on the guard, release.
macro_rules! locked {
    ($lock:ident => $(
        $(#[$attr:meta])*
        fn $name:ident(&self $(, $arg:ident: $ty:ty)* $(,)?) $(-> $ret:ty)?;
    )*) => {
        $(
            $(#[$attr])*
            pub fn $name(&self $(, $arg: $ty)*) $(-> $ret)? {
                self.$lock().$name($($arg),*)
            }
        )*
    };
}

/// What [`Cache::get_metadata()`] should include besides the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataOptions {
    /// Load the cover.
    pub cover: bool,
    /// Match the record against the configured user categories.
    pub user_categories: bool,
    /// Return the cover as bytes in [`Metadata::cover_data`] instead of as a
    /// temporary file in [`Metadata::cover`].
    pub cover_as_data: bool,
}
impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            cover: false,
            user_categories: true,
            cover_as_data: false,
        }
    }
}
impl MetadataOptions {
    pub fn with_cover(mut self) -> Self {
        self.cover = true;
        self
    }

    pub fn with_cover_data(mut self) -> Self {
        self.cover = true;
        self.cover_as_data = true;
        self
    }

    pub fn without_user_categories(mut self) -> Self {
        self.user_categories = false;
        self
    }
}

/// Thread-safe metadata cache over one storage backend.
///
/// # Locking
///
/// Field state sits behind a read/write lock. Every query takes the read
/// lock for its own duration, so concurrent queries never block each other
/// and always see a consistent snapshot. Mutations take the write lock.
///
/// Cover loads are slow, so they run under a per-book [`RecordLock`]
/// instead: the book's folder is resolved under the read lock, the read
/// lock is released, and only then is the record lock taken for the
/// backend call. Loads for different books run concurrently; loads for
/// the same book run one at a time.
///
/// [`init()`](Self::init) must be called once before use. Until then the
/// cache knows no fields and every query answers with its default.
pub struct Cache {
    registry: RwLock<Registry>,
    backend: BackendHandle,
    memo: FormatMemo,
    records: RecordLock,
    preferences: Preferences,
}

impl Cache {
    pub fn new(backend: BackendHandle, preferences: Preferences) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            backend,
            memo: FormatMemo::default(),
            records: RecordLock::default(),
            preferences,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    fn read(&self) -> ReadOps<'_> {
        ReadOps::new(self.registry.read(), self.backend.as_ref(), &self.memo, &self.preferences)
    }

    fn write(&self) -> WriteOps<'_> {
        WriteOps::new(self.registry.write())
    }

    /// Loads the backend's tables and builds the field registry.
    ///
    /// Holds the write lock throughout, so no query can observe a partly
    /// built registry.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::AlreadyInitialized`] on a second call.
    /// - [`ErrorKind::Backend`] if the backend cannot provide its tables.
    ///   Backends hand their tables over once, so after a failure past that
    ///   point (a [`ErrorKind::Template`] error) every later call fails with
    ///   a non-retryable [`ErrorKind::Backend`].
    /// - [`ErrorKind::Template`] if a composite column's template does not
    ///   compile.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub fn init(&self) -> Result<()> {
        let mut registry = self.registry.write();
        if registry.is_initialized() {
            exn::bail!(ErrorKind::AlreadyInitialized);
        }
        self.backend.read_tables().map_err(ErrorKind::backend)?;
        let tables = self.backend.take_tables().map_err(ErrorKind::backend)?;
        *registry = Registry::from_tables(tables)?;
        tracing::info!(
            fields = registry.len(),
            books = registry.all_book_ids().len(),
            "Cache initialized"
        );
        Ok(())
    }

    locked!(read =>
        /// A field's value for one book, or `default` when the field is not
        /// registered or the book has no value in it.
        fn field_for(&self, name: &str, book_id: BookId, default: Option<Value>) -> Option<Value>;

        /// Renders composite column `name` for `book_id` into `record`, which
        /// should already hold the book's ordinary fields. Any other `name`
        /// answers `default` without touching `record`.
        fn composite_for(
            &self,
            name: &str,
            book_id: BookId,
            record: &mut Metadata,
            default: Option<Value>,
        ) -> Option<Value>;

        /// Item ids the book holds in a field, in stored order. Empty for an
        /// unknown field or book.
        fn field_ids_for(&self, name: &str, book_id: BookId) -> Vec<ItemId>;

        /// Books holding an item. Empty for an unknown field or item.
        fn books_for_field(&self, name: &str, item_id: ItemId) -> Vec<BookId>;

        /// Every book in the library.
        fn all_book_ids(&self) -> BTreeSet<BookId>;

        /// Every distinct item id in a field.
        ///
        /// # Errors
        ///
        /// [`ErrorKind::UnknownField`] if `name` is not registered.
        fn all_field_ids(&self, name: &str) -> Result<BTreeSet<ItemId>>;

        fn author_data(&self, author_id: ItemId) -> Option<AuthorData>;

        /// Where a format file is stored, or which lookup failed.
        fn format_location(&self, book_id: BookId, fmt: &str) -> std::result::Result<Location, LocateError>;

        /// Absolute path of a format file, if it exists.
        fn format_abspath(&self, book_id: BookId, fmt: &str) -> Option<PathBuf>;

        /// Size and modification time of a format file.
        ///
        /// Results are memoized per book and format. Pass `allow_cache =
        /// false` after changing the file to bypass and refresh the memo.
        /// `None` when the format cannot be located or read.
        fn format_metadata(&self, book_id: BookId, fmt: &str, allow_cache: bool) -> Option<FormatMetadata>;
    );

    locked!(write =>
        /// Replaces the "on device" markers of every book.
        fn set_ondevice(&self, markers: BTreeMap<BookId, String>);
    );

    /// Drops the memoized attributes of one format file. Returns whether
    /// anything was memoized.
    pub fn invalidate_format_metadata(&self, book_id: BookId, fmt: &str) -> bool {
        self.memo.invalidate(book_id, fmt)
    }

    /// Drops every memoized format attribute.
    pub fn clear_format_metadata(&self) {
        tracing::debug!(entries = self.memo.len(), "Clearing format metadata");
        self.memo.clear();
    }

    /// Composes the full metadata record of one book.
    ///
    /// Fields are gathered under a single read lock acquisition. A requested
    /// cover is loaded afterwards, through [`cover()`](Self::cover), once the
    /// read lock is released; if it cannot be loaded the record simply has
    /// none.
    #[instrument(skip(self))]
    pub fn get_metadata(&self, book_id: BookId, options: MetadataOptions) -> Metadata {
        let mut mi = self.read().metadata(book_id, options.user_categories);
        if options.cover {
            match options.cover_as_data {
                true => {
                    if let Some(Cover::Bytes(bytes)) = self.cover(book_id, CoverShape::Bytes) {
                        mi.cover_data = Some((self.preferences.cover_format.clone(), bytes));
                    }
                },
                false => {
                    if let Some(Cover::Path(path)) = self.cover(book_id, CoverShape::Path) {
                        mi.cover = Some(path);
                    }
                },
            }
        }
        mi
    }

    /// Loads a book's cover in the requested shape.
    ///
    /// `None` when the book's folder is unknown (no I/O happens then), when
    /// it holds no cover, or when the backend fails to load it.
    #[instrument(skip(self))]
    pub fn cover(&self, book_id: BookId, shape: CoverShape) -> Option<Cover> {
        // The read guard is a temporary: it is released at the end of this
        // statement, before the record lock is taken.
        let path = match self.read().book_path(book_id) {
            Ok(path) => path,
            Err(reason) => {
                tracing::debug!(book_id, %reason, "Cover path not resolved");
                return None;
            },
        };
        self.records.with(book_id, || match self.backend.cover(&path, shape) {
            Ok(cover) => cover,
            Err(error) => {
                tracing::debug!(book_id, ?error, "Backend could not load cover");
                None
            },
        })
    }
}
