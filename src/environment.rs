// src/environment.rs

//! The target Python environment
//!
//! The environment is created and activated by the caller. A run only
//! reads its layout, installs into it, appends to a `.pth` file in its
//! site-packages and writes a launcher into its binary directory.

use crate::error::{Error, Result};
use crate::lock::{LOCK_FILE, RunLock};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Variable set by `activate` scripts
pub const VIRTUAL_ENV: &str = "VIRTUAL_ENV";

/// Layout of an activated environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    /// Environment root (the `VIRTUAL_ENV` directory)
    pub root: PathBuf,
    /// Directory holding the interpreter and console scripts
    pub bin_dir: PathBuf,
    /// Interpreter inside `bin_dir`
    pub python: PathBuf,
    /// Installed-packages directory; patches resolve against it
    pub site_packages: PathBuf,
}

impl Environment {
    /// Locate the active environment from `VIRTUAL_ENV`
    ///
    /// Fails with `PreconditionError` when no environment is active.
    pub fn from_env(site_packages: Option<&Path>) -> Result<Self> {
        let root = std::env::var_os(VIRTUAL_ENV)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::PreconditionError(format!(
                    "no active environment: {} is not set (activate one or pass --env)",
                    VIRTUAL_ENV
                ))
            })?;

        Self::discover(Path::new(&root), site_packages)
    }

    /// Inspect an environment directory
    ///
    /// `site_packages` overrides discovery of the installed-packages
    /// directory.
    pub fn discover(root: &Path, site_packages: Option<&Path>) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::PreconditionError(format!(
                "environment {} does not exist",
                root.display()
            )));
        }
        let root = root.canonicalize()?;

        let (bin_dir, python) = [("bin", "python"), ("Scripts", "python.exe")]
            .iter()
            .map(|(bin, exe)| (root.join(bin), root.join(bin).join(exe)))
            .find(|(_, python)| python.exists())
            .ok_or_else(|| {
                Error::PreconditionError(format!(
                    "no interpreter found in {} (expected bin/python)",
                    root.display()
                ))
            })?;

        let site_packages = match site_packages {
            Some(path) => path.to_path_buf(),
            None => find_site_packages(&root)?,
        };
        if !site_packages.is_dir() {
            return Err(Error::PreconditionError(format!(
                "site-packages directory {} does not exist",
                site_packages.display()
            )));
        }

        debug!(
            "Environment {}: python {}, site-packages {}",
            root.display(),
            python.display(),
            site_packages.display()
        );

        Ok(Self {
            root,
            bin_dir,
            python,
            site_packages,
        })
    }

    /// Build an environment from known paths without inspecting them
    pub fn with_layout(root: &Path, bin_dir: &Path, site_packages: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            bin_dir: bin_dir.to_path_buf(),
            python: bin_dir.join("python"),
            site_packages: site_packages.to_path_buf(),
        }
    }

    /// Run lock location for this environment
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Take the exclusive run lock
    pub fn lock(&self) -> Result<RunLock> {
        RunLock::try_acquire(self.lock_path())
    }
}

/// Find `lib/python*/site-packages` (or `Lib/site-packages`) under a root
fn find_site_packages(root: &Path) -> Result<PathBuf> {
    let pattern = root.join("lib/python*/site-packages");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| Error::InvalidPath(format!("{} is not valid UTF-8", root.display())))?;

    let mut found: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|e| Error::InvalidPath(format!("Bad site-packages pattern: {}", e)))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_dir())
        .collect();
    found.sort();

    if found.len() > 1 {
        warn!(
            "Several site-packages directories in {}, using {}",
            root.display(),
            found[found.len() - 1].display()
        );
    }

    if let Some(path) = found.pop() {
        return Ok(path);
    }

    let windows = root.join("Lib").join("site-packages");
    if windows.is_dir() {
        return Ok(windows);
    }

    Err(Error::PreconditionError(format!(
        "no site-packages directory found in {}",
        root.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn venv(python_version: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/python"), "").unwrap();
        std::fs::create_dir_all(
            dir.path()
                .join(format!("lib/{}/site-packages", python_version)),
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_discover_posix_layout() {
        let dir = venv("python3.11");
        let env = Environment::discover(dir.path(), None).unwrap();

        assert!(env.python.ends_with("bin/python"));
        assert!(env.site_packages.ends_with("lib/python3.11/site-packages"));
        assert_eq!(env.lock_path(), env.root.join(".patchbay.lock"));
    }

    #[test]
    fn test_site_packages_override() {
        let dir = venv("python3.11");
        let custom = dir.path().join("custom-site");
        std::fs::create_dir_all(&custom).unwrap();

        let env = Environment::discover(dir.path(), Some(&custom)).unwrap();
        assert_eq!(env.site_packages, custom);
    }

    #[test]
    fn test_missing_interpreter_is_precondition_error() {
        let dir = TempDir::new().unwrap();
        let err = Environment::discover(dir.path(), None).unwrap_err();
        assert!(matches!(err, Error::PreconditionError(_)));

        let err = Environment::discover(&dir.path().join("nope"), None).unwrap_err();
        assert!(matches!(err, Error::PreconditionError(_)));
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = venv("python3.9");
        let env = Environment::discover(dir.path(), None).unwrap();

        let _held = env.lock().unwrap();
        assert!(env.lock().is_err());
    }
}
