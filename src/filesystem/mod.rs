// src/filesystem/mod.rs

//! Filesystem helpers shared by the provisioning stages

pub mod path;

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace the content of `path` atomically
///
/// Writes into a temporary file in the same directory and renames it over
/// the destination, so readers never observe a half-written file. When the
/// destination already exists its permissions are carried over.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(parent).map_err(|e| {
        Error::IoError(format!("Failed to create {}: {}", parent.display(), e))
    })?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| {
        Error::IoError(format!(
            "Failed to create temporary file in {}: {}",
            parent.display(),
            e
        ))
    })?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }

    tmp.persist(path).map_err(|e| {
        Error::IoError(format!("Failed to write {}: {}", path.display(), e.error))
    })?;

    Ok(())
}
