//! In-memory storage backend for testing.

use crate::backend::{Backend, Cover, CoverShape};
use crate::error::{ErrorKind, Result};
use crate::table::Table;
use parking_lot::{Condvar, Mutex};
use shelf_model::{BookId, FormatMetadata};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Holds cover loads inside the backend until opened.
#[derive(Default)]
struct CoverGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Default)]
struct GateState {
    waiting: usize,
    open: bool,
}

impl CoverGate {
    fn pass(&self) {
        let mut state = self.state.lock();
        state.waiting += 1;
        self.changed.notify_all();
        self.changed.wait_while(&mut state, |state| !state.open);
        state.waiting -= 1;
    }
}

/// In-memory backend that records how it is called.
///
/// Tables, format attributes and covers are all held in memory. Every
/// `format_metadata` and `cover` call is counted, and cover loads track how
/// many calls overlap in time (overall and per book path), so tests can
/// assert on the cache's locking discipline.
///
/// # Examples
///
/// ```
/// use shelf_storage::backend::{Backend, CoverShape, MockBackend};
///
/// let backend = MockBackend::default().with_cover("Alice/Foo (1)", b"jpeg".to_vec());
/// let cover = backend.cover("Alice/Foo (1)", CoverShape::Bytes).unwrap();
/// assert!(cover.is_some());
/// assert_eq!(backend.cover_calls(), 1);
/// ```
#[derive(Default)]
pub struct MockBackend {
    tables: Vec<(String, Table)>,
    formats: HashMap<(BookId, String), FormatMetadata>,
    covers: HashMap<String, Vec<u8>>,
    cover_delay: Option<Duration>,
    cover_gate: Option<CoverGate>,
    failing: AtomicBool,
    tables_read: AtomicBool,
    read_table_calls: AtomicUsize,
    format_metadata_calls: Mutex<HashMap<(BookId, String), usize>>,
    cover_calls: AtomicUsize,
    covers_in_flight: Mutex<HashMap<String, usize>>,
    peak_covers: AtomicUsize,
    peak_covers_per_path: AtomicUsize,
}

impl MockBackend {
    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.tables.push((name.into(), table));
        self
    }

    /// Register the attributes returned for one stored format file.
    pub fn with_format(mut self, book_id: BookId, fmt: &str, size: u64) -> Self {
        let meta = FormatMetadata {
            path: PathBuf::from(format!("/mock/{book_id}.{}", fmt.to_lowercase())),
            size,
            mtime: time::OffsetDateTime::UNIX_EPOCH,
        };
        self.formats.insert((book_id, fmt.to_uppercase()), meta);
        self
    }

    /// Register cover bytes for the book folder at `path`.
    pub fn with_cover(mut self, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.covers.insert(path.into(), bytes);
        self
    }

    /// Make every cover load sleep, to widen the window in which
    /// concurrent loads can overlap.
    pub fn with_cover_delay(mut self, delay: Duration) -> Self {
        self.cover_delay = Some(delay);
        self
    }

    /// Make every cover load wait inside the backend until
    /// [`open_cover_gate()`](Self::open_cover_gate) is called.
    pub fn with_cover_gate(mut self) -> Self {
        self.cover_gate = Some(CoverGate::default());
        self
    }

    /// Blocks until a cover load is waiting at the gate. Returns `false` if
    /// none arrives within `timeout`, or if there is no gate.
    pub fn wait_for_cover_start(&self, timeout: Duration) -> bool {
        let Some(gate) = &self.cover_gate else {
            return false;
        };
        let mut state = gate.state.lock();
        gate.changed.wait_while_for(&mut state, |state| state.waiting == 0, timeout);
        state.waiting > 0
    }

    /// Lets every waiting and future cover load through.
    pub fn open_cover_gate(&self) {
        if let Some(gate) = &self.cover_gate {
            gate.state.lock().open = true;
            gate.changed.notify_all();
        }
    }

    /// Make I/O calls (`format_metadata` and `cover`) fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn read_table_calls(&self) -> usize {
        self.read_table_calls.load(Ordering::SeqCst)
    }

    /// Number of `format_metadata` calls made for one book and format.
    pub fn format_metadata_calls(&self, book_id: BookId, fmt: &str) -> usize {
        self.format_metadata_calls.lock().get(&(book_id, fmt.to_uppercase())).copied().unwrap_or(0)
    }

    pub fn cover_calls(&self) -> usize {
        self.cover_calls.load(Ordering::SeqCst)
    }

    /// Highest number of cover loads that were running at the same time.
    pub fn peak_concurrent_covers(&self) -> usize {
        self.peak_covers.load(Ordering::SeqCst)
    }

    /// Highest number of cover loads for the *same* book path that were
    /// running at the same time.
    pub fn peak_concurrent_covers_per_path(&self) -> usize {
        self.peak_covers_per_path.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::BackendError("injected failure".to_string()));
        }
        Ok(())
    }

    fn enter_cover(&self, path: &str) {
        let mut in_flight = self.covers_in_flight.lock();
        let same_path = {
            let count = in_flight.entry(path.to_string()).or_default();
            *count += 1;
            *count
        };
        let total = in_flight.values().sum();
        self.peak_covers.fetch_max(total, Ordering::SeqCst);
        self.peak_covers_per_path.fetch_max(same_path, Ordering::SeqCst);
    }

    fn leave_cover(&self, path: &str) {
        let mut in_flight = self.covers_in_flight.lock();
        if let Some(count) = in_flight.get_mut(path) {
            *count -= 1;
        }
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn read_tables(&self) -> Result<()> {
        self.read_table_calls.fetch_add(1, Ordering::SeqCst);
        self.tables_read.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn take_tables(&self) -> Result<Vec<(String, Table)>> {
        if !self.tables_read.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::TablesNotRead);
        }
        Ok(self.tables.clone())
    }

    fn format_abspath(&self, book_id: BookId, fmt: &str, _filename: &str, _path: &str) -> Option<PathBuf> {
        self.formats.get(&(book_id, fmt.to_uppercase())).map(|meta| meta.path.clone())
    }

    fn format_metadata(&self, book_id: BookId, fmt: &str, _filename: &str, _path: &str) -> Result<FormatMetadata> {
        let key = (book_id, fmt.to_uppercase());
        *self.format_metadata_calls.lock().entry(key.clone()).or_default() += 1;
        self.check_failing()?;
        match self.formats.get(&key) {
            Some(meta) => Ok(meta.clone()),
            None => exn::bail!(ErrorKind::NotFound(PathBuf::from(format!("/mock/{book_id}.{}", key.1)))),
        }
    }

    fn cover(&self, path: &str, shape: CoverShape) -> Result<Option<Cover>> {
        self.cover_calls.fetch_add(1, Ordering::SeqCst);
        self.enter_cover(path);
        if let Some(gate) = &self.cover_gate {
            gate.pass();
        }
        if let Some(delay) = self.cover_delay {
            thread::sleep(delay);
        }
        self.leave_cover(path);
        self.check_failing()?;
        self.covers.get(path).map(|bytes| Cover::from_bytes(bytes.clone(), shape)).transpose()
    }
}
