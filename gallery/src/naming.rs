//! Identity-name validation and derivation from `container/identity/file`
//! style source paths.

use crate::error::{GalleryError, Result};

/// Longest identity name accepted, in bytes.
pub const MAX_IDENTITY_LEN: usize = 128;

/// Checks that `name` is usable as an identity key.
///
/// Names become directory names and key segments, so path separators, `:`,
/// control characters, and leading dots are rejected.
pub fn validate_identity(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GalleryError::invalid("identity name is empty"));
    }
    if name.len() > MAX_IDENTITY_LEN {
        return Err(GalleryError::invalid(format!(
            "identity name longer than {MAX_IDENTITY_LEN} bytes"
        )));
    }
    if name.starts_with('.') {
        return Err(GalleryError::invalid(format!(
            "identity name {name:?} must not start with '.'"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|&c| c == '/' || c == '\\' || c == ':' || c.is_control())
    {
        return Err(GalleryError::invalid(format!(
            "identity name {name:?} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

/// Returns the identity encoded in a `container/identity/file` path: the
/// second-to-last segment.
pub fn derive_identity(path: &str) -> Result<String> {
    let parts = segments(path);
    if parts.len() < 2 {
        return Err(GalleryError::invalid(format!(
            "cannot derive identity from {path:?}: expected a parent directory"
        )));
    }
    let name = parts[parts.len() - 2];
    validate_identity(name)?;
    Ok(name.to_string())
}

/// Returns the final path segment, used as the record's source ref.
pub fn file_name(path: &str) -> Result<&str> {
    segments(path)
        .pop()
        .ok_or_else(|| GalleryError::invalid(format!("path {path:?} has no file name")))
}
