//! Data types shared by every layer of the library cache.
//!
//! Nothing in here does any I/O or locking. These are the values that flow
//! between the storage backend (which produces tables of them), the field
//! registry (which answers per-book queries with them) and the metadata
//! composer (which assembles them into a [`Metadata`] record).

mod author;
mod category;
mod column;
mod format;
mod metadata;
mod value;

pub use crate::author::AuthorData;
pub use crate::category::{CategoryMember, UserCategories};
pub use crate::column::{ColumnMeta, Datatype};
pub use crate::format::FormatMetadata;
pub use crate::metadata::{CustomValue, Metadata};
pub use crate::value::Value;

/// Identity of one book in the library.
pub type BookId = u64;
/// Identity of one distinct value (an author, a tag, a series, ...) within a
/// multi-valued field.
pub type ItemId = u64;

/// Placeholder text for titles and sort keys that have no stored value.
pub const UNKNOWN: &str = "Unknown";
