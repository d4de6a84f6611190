// src/installer/alias.rs

//! Convenience link to site-packages
//!
//! Tooling run from the provisioning root reaches installed packages
//! through a fixed local name (`eggs` by default) instead of the
//! interpreter-versioned site-packages path.

use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Create `link` pointing at `target`
///
/// An existing symlink at `link` is replaced. Anything else at `link` is
/// left alone and reported as an error.
pub fn create_alias(link: &Path, target: &Path) -> Result<()> {
    match std::fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            debug!("Replacing existing link {}", link.display());
            remove_link(link)?;
        }
        Ok(_) => {
            return Err(Error::InvalidPath(format!(
                "{} exists and is not a symlink",
                link.display()
            )));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent)?;
    }

    symlink_dir(target, link).map_err(|e| {
        Error::IoError(format!(
            "Failed to link {} -> {}: {}",
            link.display(),
            target.display(),
            e
        ))
    })
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(unix)]
fn remove_link(link: &Path) -> Result<()> {
    std::fs::remove_file(link).map_err(Into::into)
}

#[cfg(windows)]
fn remove_link(link: &Path) -> Result<()> {
    std::fs::remove_dir(link)
        .or_else(|_| std::fs::remove_file(link))
        .map_err(Into::into)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_replace_alias() {
        let dir = TempDir::new().unwrap();
        let old_site = dir.path().join("venv-old/site-packages");
        let new_site = dir.path().join("venv/site-packages");
        std::fs::create_dir_all(&old_site).unwrap();
        std::fs::create_dir_all(&new_site).unwrap();
        let link = dir.path().join("eggs");

        create_alias(&link, &old_site).unwrap();
        create_alias(&link, &new_site).unwrap();

        assert_eq!(std::fs::read_link(&link).unwrap(), new_site);
    }

    #[test]
    fn test_real_directory_not_clobbered() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("eggs");
        std::fs::create_dir_all(link.join("keep")).unwrap();

        let err = create_alias(&link, dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a symlink"));
        assert!(link.join("keep").is_dir());
    }
}
