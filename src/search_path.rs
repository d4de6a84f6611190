// src/search_path.rs

//! Extra module search-path directory
//!
//! Creates an empty directory under the provisioning root and registers it
//! in a `.pth` file inside site-packages, where the interpreter picks it up
//! at startup. Users drop modules there without touching the installed
//! packages.
//!
//! Every call appends a line, so repeated runs leave duplicate entries.
//! The interpreter ignores duplicates.

use crate::environment::Environment;
use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Create `<root>/<directory_name>` and append it to the environment's `.pth` file
///
/// Returns the absolute directory path that was registered.
pub fn augment_search_path(
    env: &Environment,
    root: &Path,
    directory_name: &str,
    pth_file: &str,
) -> Result<PathBuf> {
    let directory = root.join(directory_name);
    std::fs::create_dir_all(&directory).map_err(|e| {
        Error::IoError(format!("Failed to create {}: {}", directory.display(), e))
    })?;
    let directory = directory.canonicalize()?;

    let pth_path = env.site_packages.join(pth_file);
    let needs_newline = match std::fs::read(&pth_path) {
        Ok(existing) => existing.last().is_some_and(|b| *b != b'\n'),
        Err(_) => false,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&pth_path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", pth_path.display(), e)))?;

    let mut line = String::new();
    if needs_newline {
        line.push('\n');
    }
    line.push_str(&directory.to_string_lossy());
    line.push('\n');
    file.write_all(line.as_bytes())?;

    info!(
        "Added {} to search path via {}",
        directory.display(),
        pth_path.display()
    );
    Ok(directory)
}
