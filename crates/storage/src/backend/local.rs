//! Local filesystem storage backend.
//!
//! Book folders live under a library root directory on the local
//! filesystem. Per-field tables are supplied by the caller when the backend
//! is constructed; this backend does not define a table file format.

use crate::backend::{Backend, Cover, CoverShape};
use crate::error::{ErrorKind, Result};
use crate::path::resolve as resolve_path;
use crate::table::Table;
use parking_lot::Mutex;
use shelf_model::{BookId, FormatMetadata};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::instrument;

const COVER_FILENAME: &str = "cover.jpg";

enum TableState {
    Pending(Vec<(String, Table)>),
    Read(Vec<(String, Table)>),
    Consumed,
}

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use shelf_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/absolute/path/to/library")?;
/// # Ok(())
/// # }
/// ```
pub struct LocalBackend {
    name: String,
    /// Root directory for the library
    root: PathBuf,
    tables: Mutex<TableState>,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self {
            name: name.into(),
            root,
            tables: Mutex::new(TableState::Pending(Vec::new())),
        })
    }

    /// Adds a field table served by this backend.
    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        if let TableState::Pending(tables) = self.tables.get_mut() {
            tables.push((name.into(), table));
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn format_path(&self, fmt: &str, filename: &str, path: &str) -> Result<PathBuf> {
        Ok(resolve_path(&self.root, path)?.join(format!("{filename}.{}", fmt.to_lowercase())))
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(backend = %self.name))]
    fn read_tables(&self) -> Result<()> {
        if !self.root.is_dir() {
            exn::bail!(ErrorKind::NotARoot(self.root.clone()));
        }
        let mut state = self.tables.lock();
        *state = match std::mem::replace(&mut *state, TableState::Consumed) {
            TableState::Pending(tables) | TableState::Read(tables) => TableState::Read(tables),
            TableState::Consumed => TableState::Consumed,
        };
        Ok(())
    }

    fn take_tables(&self) -> Result<Vec<(String, Table)>> {
        let mut state = self.tables.lock();
        match std::mem::replace(&mut *state, TableState::Consumed) {
            TableState::Read(tables) => Ok(tables),
            TableState::Pending(tables) => {
                *state = TableState::Pending(tables);
                exn::bail!(ErrorKind::TablesNotRead)
            },
            TableState::Consumed => exn::bail!(ErrorKind::TablesConsumed),
        }
    }

    fn format_abspath(&self, _book_id: BookId, fmt: &str, filename: &str, path: &str) -> Option<PathBuf> {
        self.format_path(fmt, filename, path).ok().filter(|p| p.is_file())
    }

    fn format_metadata(&self, _book_id: BookId, fmt: &str, filename: &str, path: &str) -> Result<FormatMetadata> {
        let path = self.format_path(fmt, filename, path)?;
        let stat = fs::metadata(&path).map_err(|e| ErrorKind::from_io(e, &path))?;
        let mtime = stat.modified().map_err(ErrorKind::Io)?;
        Ok(FormatMetadata {
            size: stat.len(),
            mtime: OffsetDateTime::from(mtime),
            path,
        })
    }

    fn cover(&self, path: &str, shape: CoverShape) -> Result<Option<Cover>> {
        let path = resolve_path(&self.root, path)?.join(COVER_FILENAME);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => exn::bail!(ErrorKind::from_io(e, path)),
        };
        Cover::from_bytes(bytes, shape).map(Some)
    }
}
