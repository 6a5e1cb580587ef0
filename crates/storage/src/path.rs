//! Book storage path validation.
//!
//! Every book owns a folder inside the library root. Its location is stored
//! as a `/`-separated path relative to the root (`"Terry Pratchett/Mort (12)"`).
//! These helpers turn that stored form into a filesystem path without ever
//! leaving the root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a stored book path and converts it to a relative [`PathBuf`].
///
/// The stored form always uses `/`, whatever the host separator. `.` and
/// empty segments are dropped and `..` pops a segment. Popping past the
/// root is rejected, as are null bytes.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use shelf_storage::validate_path;
/// assert_eq!(validate_path("Author/Title (1)").unwrap(), Path::new("Author").join("Title (1)"));
/// assert_eq!(validate_path("Author/./Title//").unwrap(), Path::new("Author").join("Title"));
/// assert!(validate_path("../outside").is_err());
/// assert!(validate_path("").is_err());
/// ```
pub fn validate(stored: &str) -> Result<PathBuf> {
    let invalid = || ErrorKind::InvalidPath(PathBuf::from(stored));
    let mut segments: Vec<&str> = Vec::new();
    for segment in stored.split('/') {
        if segment.contains('\0') {
            exn::bail!(invalid());
        }
        // Each segment has to be a plain name once separators are
        // host-native, otherwise a backslash on Windows could sneak in a
        // traversal.
        match Path::new(segment).components().collect::<Vec<_>>().as_slice() {
            [] | [Component::CurDir] => {},
            [Component::ParentDir] => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
            [Component::Normal(_)] => segments.push(segment),
            _ => exn::bail!(invalid()),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(segments.into_iter().collect()),
    }
}

/// Joins a validated stored path onto the library `root`.
pub fn resolve(root: impl AsRef<Path>, stored: &str) -> Result<PathBuf> {
    Ok(root.as_ref().join(validate(stored)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Author/Title (1)", &["Author", "Title (1)"])]
    #[case("single", &["single"])]
    #[case("a//b/./c/", &["a", "b", "c"])]
    #[case("a/b/../c", &["a", "c"])]
    fn test_valid_paths(#[case] stored: &str, #[case] expected: &[&str]) {
        let expected: PathBuf = expected.iter().collect();
        assert_eq!(validate(stored).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("//")]
    #[case("..")]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("a\0b")]
    fn test_invalid_paths(#[case] stored: &str) {
        let err = validate(stored).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_stored_path_stays_inside_root() {
        assert_eq!(resolve("/library", "/Author/Title").unwrap(), Path::new("/library/Author/Title"));
    }
}
