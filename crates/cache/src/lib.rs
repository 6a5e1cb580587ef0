//! Concurrent in-memory metadata cache for a book library.
//!
//! The cache sits between a storage [`Backend`](shelf_storage::Backend) and
//! whatever presents the library (a GUI, a CLI, a server). At
//! [`init()`](Cache::init) it consumes the backend's per-field tables and
//! builds a field registry; from then on it answers per-book queries from
//! memory, composes full [`Metadata`](shelf_model::Metadata) records, and
//! loads covers with per-book locking.
//!
//! # Architecture
//! - **Field registry**: one field object per stored column plus the
//!   synthetic `ondevice` field. Composite columns are templates rendered
//!   against the rest of the record.
//! - **Operations**: every public query is a thin wrapper that takes the
//!   cache-wide read or write lock and runs the unlocked implementation on
//!   the guard. Unlocked implementations call each other freely.
//! - **Format memo**: size and modification time of format files, kept
//!   until explicitly invalidated.
//! - **Record lock**: per-book mutual exclusion for slow I/O, never held
//!   together with the read/write lock.

mod cache;
pub mod error;
mod fields;
mod format;
mod lock;
mod ops;
mod registry;

pub use crate::cache::{Cache, MetadataOptions};
pub use crate::format::{LocateError, Location};
pub use crate::lock::RecordLock;
