//! Per-book mutual exclusion.
//!
//! The cache-wide read/write lock protects field state; [`RecordLock`]
//! serializes slow per-book I/O (cover loads) without serializing the
//! whole cache. The two are never held at the same time: callers resolve
//! what they need under the read lock, release it, and only then take the
//! record lock.

use dashmap::DashMap;
use parking_lot::Mutex;
use shelf_model::BookId;
use std::sync::Arc;

/// One mutex per book id, created on first use and never removed.
///
/// The number of entries is bounded by the number of distinct books ever
/// locked.
#[derive(Debug, Default)]
pub struct RecordLock {
    locks: DashMap<BookId, Arc<Mutex<()>>>,
}

impl RecordLock {
    /// Runs `f` while holding the lock for `book_id`.
    ///
    /// Blocks while another thread holds the lock for the same book. Calls
    /// for different books never wait on each other.
    pub fn with<R>(&self, book_id: BookId, f: impl FnOnce() -> R) -> R {
        // The map entry guard locks a whole shard; it must be gone before
        // blocking on the book's own mutex.
        let mutex = Arc::clone(&self.locks.entry(book_id).or_default());
        tracing::trace!(book_id, "Acquiring record lock");
        let _guard = mutex.lock();
        f()
    }

    /// Number of books that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
