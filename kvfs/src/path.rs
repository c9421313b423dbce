//! Pure path parsing.
//!
//! Paths handed to the filesystem are absolute and slash-delimited. No
//! normalization happens here: `.` and `..` are ordinary (invalid to
//! create) names, there are no symlinks, and comparison downstream is
//! exact byte equality.

use crate::error::{FsError, Result};
use crate::NAME_LIMIT;

/// Splits an absolute path into its non-empty components.
///
/// Repeated or trailing separators contribute nothing, so `"/a//b/"`
/// yields `["a", "b"]` and `"/"` yields no components at all.
pub fn components(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidPath(path.to_string()));
    }
    Ok(path.split('/').filter(|part| !part.is_empty()).collect())
}

/// Splits a mutation target into its parent path and terminal name:
/// `"/a/b/c"` becomes `("/a/b", "c")` and `"/f"` becomes `("/", "f")`.
/// The root itself has no terminal name and is rejected.
pub fn split_parent(path: &str) -> Result<(&str, &str)> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidPath(path.to_string()));
    }
    let cut = match path.rfind('/') {
        Some(i) => i,
        None => return Err(FsError::InvalidPath(path.to_string())),
    };
    let name = &path[cut + 1..];
    if name.is_empty() {
        return Err(FsError::InvalidPath(path.to_string()));
    }
    let parent = if cut == 0 { "/" } else { &path[..cut] };
    Ok((parent, name))
}

/// Checks a new entry name against the component limit and the characters
/// the layout cannot store.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\0') {
        return Err(FsError::InvalidPath(name.to_string()));
    }
    if name.len() >= NAME_LIMIT {
        return Err(FsError::NameTooLong);
    }
    Ok(())
}
