// src/filesystem/path.rs

//! Path handling for diff headers and plan entries
//!
//! Paths recorded inside diff files and plan entries are untrusted: a diff
//! header of `../../etc/profile` must never resolve outside the
//! installed-packages root.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Sanitize a path from an untrusted source
///
/// Rejects `..` components, drops `.` components and leading slashes, and
/// refuses paths that end up empty.
///
/// # Examples
///
/// ```
/// use patchbay::filesystem::path::sanitize_path;
/// use std::path::PathBuf;
///
/// // Normal paths are preserved
/// assert_eq!(sanitize_path("requests/models.py").unwrap(), PathBuf::from("requests/models.py"));
///
/// // Leading slashes are stripped
/// assert_eq!(sanitize_path("/requests/models.py").unwrap(), PathBuf::from("requests/models.py"));
///
/// // Path traversal is rejected
/// assert!(sanitize_path("../etc/passwd").is_err());
/// assert!(sanitize_path("requests/../../../etc/passwd").is_err());
/// ```
pub fn sanitize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();
    let relative = path_str.trim_start_matches('/');

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::ParentDir => {
                return Err(Error::PathTraversal(path_str.to_string()));
            }
            Component::CurDir | Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath(format!(
            "'{}' is empty after sanitization",
            path_str
        )));
    }

    Ok(normalized)
}

/// Safely join a root path with an untrusted path
///
/// This function sanitizes the path and joins it with the root, ensuring
/// the result cannot escape the root directory.
///
/// # Examples
///
/// ```
/// use patchbay::filesystem::path::safe_join;
/// use std::path::{Path, PathBuf};
///
/// let root = Path::new("/venv/lib/python3.11/site-packages");
///
/// assert_eq!(
///     safe_join(root, "requests/models.py").unwrap(),
///     PathBuf::from("/venv/lib/python3.11/site-packages/requests/models.py")
/// );
///
/// // Traversal attempts are rejected
/// assert!(safe_join(root, "../etc/passwd").is_err());
/// ```
pub fn safe_join(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let root = root.as_ref();
    let sanitized = sanitize_path(path.as_ref())?;
    let joined = root.join(&sanitized);

    // Symlinks inside root may still point outside of it
    if let (Ok(canonical_root), Ok(canonical_joined)) =
        (root.canonicalize(), joined.canonicalize())
        && !canonical_joined.starts_with(&canonical_root)
    {
        return Err(Error::PathTraversal(format!(
            "Path {} escapes root {}",
            joined.display(),
            root.display()
        )));
    }

    Ok(joined)
}

/// Remove the first `strip` components from a recorded diff path
///
/// Mirrors `patch -pN`: components are counted on the path as recorded,
/// before sanitizing. A leading `/` counts as an empty first component, a
/// leading `./` counts as `.`, and runs of slashes act as one separator.
/// `a/requests/models.py` with `strip = 1` becomes `requests/models.py`.
/// Stripping every component is an error.
///
/// # Examples
///
/// ```
/// use patchbay::filesystem::path::strip_components;
/// use std::path::PathBuf;
///
/// assert_eq!(strip_components("a/libx/mod.py", 1).unwrap(), PathBuf::from("libx/mod.py"));
/// assert_eq!(strip_components("./libx/mod.py", 1).unwrap(), PathBuf::from("libx/mod.py"));
/// assert_eq!(strip_components("libx/mod.py", 0).unwrap(), PathBuf::from("libx/mod.py"));
/// assert!(strip_components("mod.py", 1).is_err());
/// ```
pub fn strip_components(recorded: &str, strip: u32) -> Result<PathBuf> {
    let exhausted = || {
        Error::InvalidPath(format!(
            "Stripping {} component(s) from '{}' leaves nothing",
            strip, recorded
        ))
    };

    let mut rest = recorded;
    for _ in 0..strip {
        let (_, tail) = rest.split_once('/').ok_or_else(exhausted)?;
        rest = tail.trim_start_matches('/');
    }

    if rest.is_empty() {
        return Err(exhausted());
    }

    sanitize_path(rest)
}
