// src/provenance.rs

//! Revision stamping
//!
//! Every run records the commit the provisioning root is checked out at,
//! so an environment can be traced back to the sources it was built from.
//! The stamp is the bare commit id with no trailing newline, and it
//! replaces whatever a previous run wrote.

use crate::error::{Error, Result};
use crate::filesystem::write_atomic;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Reads the current revision of a source checkout
pub trait RevisionSource {
    fn current_revision(&self, vcs_root: &Path) -> Result<String>;
}

/// Revision lookup through the `git` command line
#[derive(Debug, Clone)]
pub struct GitCli {
    git: PathBuf,
}

impl GitCli {
    /// Find `git` on `PATH`
    pub fn locate() -> Result<Self> {
        let git = which::which("git").map_err(|e| {
            Error::PreconditionError(format!("git not found on PATH: {}", e))
        })?;
        debug!("Using git at {}", git.display());
        Ok(Self { git })
    }

    pub fn with_binary(git: impl Into<PathBuf>) -> Self {
        Self { git: git.into() }
    }
}

impl RevisionSource for GitCli {
    fn current_revision(&self, vcs_root: &Path) -> Result<String> {
        let output = Command::new(&self.git)
            .arg("-C")
            .arg(vcs_root)
            .args(["log", "-n", "1", "--pretty=format:%H"])
            .output()
            .map_err(|e| Error::CommandFailed(format!("Failed to run git: {}", e)))?;

        if !output.status.success() {
            return Err(Error::VcsUnavailable(format!(
                "no commit history in {}: {}",
                vcs_root.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if revision.is_empty() {
            return Err(Error::VcsUnavailable(format!(
                "no commit history in {}",
                vcs_root.display()
            )));
        }

        Ok(revision)
    }
}

/// Write the current revision of `vcs_root` to `output`
///
/// The file holds exactly the revision id. Returns the revision written.
pub fn record_revision(
    source: &dyn RevisionSource,
    vcs_root: &Path,
    output: &Path,
) -> Result<String> {
    let revision = source.current_revision(vcs_root)?;
    if revision.trim().is_empty() || revision.contains('\n') {
        return Err(Error::VcsUnavailable(format!(
            "unusable revision id for {}: {:?}",
            vcs_root.display(),
            revision
        )));
    }

    write_atomic(output, revision.as_bytes())?;
    info!("Recorded revision {} in {}", revision, output.display());
    Ok(revision)
}
