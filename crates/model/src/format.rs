use std::path::PathBuf;
use time::OffsetDateTime;

/// Attributes derived from a stored format file.
///
/// Calculating these requires a backend stat call, which is why the cache
/// memoizes them per book and format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatMetadata {
    /// Absolute path to the format file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time of the file
    pub mtime: OffsetDateTime,
}
