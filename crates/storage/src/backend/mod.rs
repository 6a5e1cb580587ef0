//! Backend trait and implementations.
//!
//! The backend owns everything persistent: the per-field tables and the book
//! folders holding format files and covers. The cache reaches it only
//! through [`Backend`].

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::{ErrorKind, Result};
use crate::table::Table;
use exn::ResultExt;
use shelf_model::{BookId, FormatMetadata};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use tempfile::SpooledTempFile;

/// Covers up to this size stay in memory when returned as a file.
const SPOOL_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// Shape in which a cover should be returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CoverShape {
    /// Raw image bytes
    #[default]
    Bytes,
    /// An open, rewound temporary file
    File,
    /// A decoded image
    Image,
    /// Path to a temporary copy. The caller deletes it when done.
    Path,
}

/// A cover, in the shape that was requested.
pub enum Cover {
    Bytes(Vec<u8>),
    File(SpooledTempFile),
    Image(image::DynamicImage),
    Path(PathBuf),
}
impl Cover {
    /// Converts raw cover bytes into the requested shape.
    pub fn from_bytes(bytes: Vec<u8>, shape: CoverShape) -> Result<Self> {
        Ok(match shape {
            CoverShape::Bytes => Self::Bytes(bytes),
            CoverShape::File => {
                let mut file = tempfile::spooled_tempfile(SPOOL_LIMIT_BYTES);
                file.write_all(&bytes).map_err(ErrorKind::Io)?;
                file.seek(SeekFrom::Start(0)).map_err(ErrorKind::Io)?;
                Self::File(file)
            },
            CoverShape::Image => Self::Image(image::load_from_memory(&bytes).or_raise(|| ErrorKind::Decode)?),
            CoverShape::Path => {
                let mut file = tempfile::Builder::new()
                    .prefix("shelf_cover_")
                    .suffix(".jpg")
                    .tempfile()
                    .map_err(ErrorKind::Io)?;
                file.write_all(&bytes).map_err(ErrorKind::Io)?;
                // Persist: the caller owns the file from here on.
                let (_file, path) = file.keep().map_err(|e| ErrorKind::Io(e.error))?;
                Self::Path(path)
            },
        })
    }

    pub fn shape(&self) -> CoverShape {
        match self {
            Self::Bytes(_) => CoverShape::Bytes,
            Self::File(_) => CoverShape::File,
            Self::Image(_) => CoverShape::Image,
            Self::Path(_) => CoverShape::Path,
        }
    }
}
impl Debug for Cover {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::File(_) => f.write_str("File(..)"),
            Self::Image(img) => f.debug_tuple("Image").field(&(img.width(), img.height())).finish(),
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
        }
    }
}

/// Contract between the cache and whatever persists the library.
///
/// Calls are synchronous and may block on I/O. The cache invokes them from
/// many threads at once, so implementations must be [`Sync`].
///
/// # Paths
/// `path` arguments are the book's stored folder path, `/`-separated and
/// relative to the library root (see [`validate_path`](crate::validate_path)).
/// `filename` is the stored file name of a format, without extension.
pub trait Backend: Send + Sync {
    /// Name of the backend, for logging only.
    fn name(&self) -> &str;

    /// Loads every per-field table. Must complete before
    /// [`take_tables()`](Self::take_tables).
    fn read_tables(&self) -> Result<()>;

    /// Hands over one `(field name, table)` pair per stored field.
    ///
    /// Called once, during cache initialization.
    fn take_tables(&self) -> Result<Vec<(String, Table)>>;

    /// Absolute path of a format file, or `None` if it does not exist.
    fn format_abspath(&self, book_id: BookId, fmt: &str, filename: &str, path: &str) -> Option<PathBuf>;

    /// Derived attributes of a format file (size, modification time).
    fn format_metadata(&self, book_id: BookId, fmt: &str, filename: &str, path: &str) -> Result<FormatMetadata>;

    /// Loads the cover stored in the book folder at `path`.
    ///
    /// Returns `Ok(None)` when the book has no cover file.
    fn cover(&self, path: &str, shape: CoverShape) -> Result<Option<Cover>>;
}
