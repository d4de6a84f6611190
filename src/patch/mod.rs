// src/patch/mod.rs

//! Patch application against installed packages
//!
//! Patches are applied one at a time, in declared order, to files under the
//! installed-packages root (site-packages). A later patch sees the result
//! of every earlier one, so two patches against the same file must be
//! declared in the order they were written.
//!
//! A patch touching several files is all-or-nothing: every section is
//! checked against the current content before anything is written.
//!
//! What happens when a patch does not apply is decided by its
//! [`Tolerance`](crate::plan::Tolerance): fatal patches stop the run,
//! tolerant ones are skipped with a warning. Applied patches are never
//! reverted; a failed run leaves earlier patches in place.

pub mod unified;

use crate::error::{Error, Result};
use crate::filesystem::path::safe_join;
use crate::filesystem::write_atomic;
use crate::plan::PatchSpec;
use crate::progress::ProgressTracker;
use crate::report::{AppliedPatch, MismatchKind, Warning};
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use unified::FileApply;

/// Result of one patch that did not stop the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchResult {
    Applied(AppliedPatch),
    Skipped(Warning),
}

/// Patches applied and skipped by [`apply_patches`]
#[derive(Debug, Clone, Default)]
pub struct PatchOutcome {
    pub applied: Vec<AppliedPatch>,
    pub skipped: Vec<Warning>,
}

/// What a dry run predicts for one patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Applies,
    /// Tolerant patch that would be skipped
    Skips(MismatchKind),
    /// Fatal patch that would stop the run
    Fails(MismatchKind),
}

/// Dry-run result for one patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchCheck {
    pub name: String,
    /// File the verdict is about
    pub file: PathBuf,
    pub verdict: Verdict,
}

/// Per-file changes a patch would make, or the first file it cannot change
enum Evaluation {
    Clean(Vec<(PathBuf, Option<Vec<u8>>)>),
    Mismatch { file: PathBuf, kind: MismatchKind },
}

/// Applies patches under one packages root
///
/// In dry-run mode nothing is written; results are kept in memory so later
/// patches are checked against the content earlier ones would produce.
pub struct PatchSession {
    root: PathBuf,
    dry_run: bool,
    overlay: HashMap<PathBuf, Option<Vec<u8>>>,
}

impl PatchSession {
    pub fn new(packages_root: &Path) -> Self {
        Self {
            root: packages_root.to_path_buf(),
            dry_run: false,
            overlay: HashMap::new(),
        }
    }

    pub fn dry_run(packages_root: &Path) -> Self {
        Self {
            dry_run: true,
            ..Self::new(packages_root)
        }
    }

    /// Apply one patch, honouring its tolerance
    ///
    /// Returns `Err(PatchApplicationFailed)` for a fatal patch that does not
    /// apply. Other errors (unreadable files, write failures) are fatal
    /// regardless of tolerance.
    pub fn apply(&mut self, patch: &PatchSpec) -> Result<PatchResult> {
        match self.evaluate(patch)? {
            Evaluation::Clean(changes) => {
                let files: Vec<PathBuf> = changes.iter().map(|(rel, _)| rel.clone()).collect();
                self.commit(changes)?;
                info!("Applied patch '{}' ({} file(s))", patch.name, files.len());
                Ok(PatchResult::Applied(AppliedPatch {
                    name: patch.name.clone(),
                    sha256: patch.sha256.clone(),
                    files,
                }))
            }
            Evaluation::Mismatch { file, kind } => {
                let warning = patch.tolerance.on_mismatch(&patch.name, &file, kind)?;
                warn!("Skipping tolerant patch '{}': {}: {}", patch.name, file.display(), kind);
                Ok(PatchResult::Skipped(warning))
            }
        }
    }

    /// Predict what applying a patch would do, without failing
    ///
    /// A patch that would apply is recorded in the overlay so later checks
    /// see its effect.
    pub fn check(&mut self, patch: &PatchSpec) -> Result<PatchCheck> {
        match self.evaluate(patch)? {
            Evaluation::Clean(changes) => {
                let file = patch.target.clone();
                for (rel, content) in changes {
                    self.overlay.insert(rel, content);
                }
                Ok(PatchCheck {
                    name: patch.name.clone(),
                    file,
                    verdict: Verdict::Applies,
                })
            }
            Evaluation::Mismatch { file, kind } => {
                let verdict = if patch.tolerance.is_tolerant() {
                    Verdict::Skips(kind)
                } else {
                    Verdict::Fails(kind)
                };
                Ok(PatchCheck {
                    name: patch.name.clone(),
                    file,
                    verdict,
                })
            }
        }
    }

    fn evaluate(&self, patch: &PatchSpec) -> Result<Evaluation> {
        let mut pending: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(patch.sections.len());

        for section in &patch.sections {
            let rel = section.resolve(patch.strip)?;
            let current = match pending.iter().rev().find(|(path, _)| *path == rel) {
                Some((_, content)) => content.clone(),
                None => self.read(&rel)?,
            };

            if current.is_none() && !section.creates_file() {
                return Ok(Evaluation::Mismatch {
                    file: rel,
                    kind: MismatchKind::TargetMissing,
                });
            }

            match section.apply(current.as_deref())? {
                FileApply::Applied(content) => {
                    debug!("patch '{}': {} applies", patch.name, rel.display());
                    pending.push((rel, content));
                }
                FileApply::AlreadyApplied => {
                    return Ok(Evaluation::Mismatch {
                        file: rel,
                        kind: MismatchKind::AlreadyApplied,
                    });
                }
                FileApply::ContextMismatch => {
                    return Ok(Evaluation::Mismatch {
                        file: rel,
                        kind: MismatchKind::ContextMismatch,
                    });
                }
            }
        }

        Ok(Evaluation::Clean(pending))
    }

    /// Current content of a file, `None` if it does not exist
    fn read(&self, rel: &Path) -> Result<Option<Vec<u8>>> {
        if let Some(content) = self.overlay.get(rel) {
            return Ok(content.clone());
        }

        let path = safe_join(&self.root, rel)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn commit(&mut self, changes: Vec<(PathBuf, Option<Vec<u8>>)>) -> Result<()> {
        for (rel, content) in changes {
            if !self.dry_run {
                let path = safe_join(&self.root, &rel)?;
                match &content {
                    Some(bytes) => write_atomic(&path, bytes)?,
                    None => std::fs::remove_file(&path).map_err(|e| {
                        Error::IoError(format!("Failed to remove {}: {}", path.display(), e))
                    })?,
                }
            }
            self.overlay.insert(rel, content);
        }
        Ok(())
    }
}

/// Apply patches in order under `packages_root`
///
/// Stops at the first fatal patch that does not apply. Patches applied
/// before it stay applied and are already recorded in `outcome`.
pub fn apply_patches(
    patches: &[PatchSpec],
    packages_root: &Path,
    progress: &dyn ProgressTracker,
    outcome: &mut PatchOutcome,
) -> Result<()> {
    let mut session = PatchSession::new(packages_root);
    progress.set_length(patches.len() as u64);

    for patch in patches {
        progress.set_message(&patch.name);
        match session.apply(patch) {
            Ok(PatchResult::Applied(applied)) => outcome.applied.push(applied),
            Ok(PatchResult::Skipped(warning)) => outcome.skipped.push(warning),
            Err(e) => {
                progress.finish_with_error(&e.to_string());
                return Err(e);
            }
        }
        progress.increment(1);
    }

    progress.finish_with_message(&format!(
        "{} applied, {} skipped",
        outcome.applied.len(),
        outcome.skipped.len()
    ));
    Ok(())
}

/// Predict the outcome of every patch without writing anything
pub fn check_patches(patches: &[PatchSpec], packages_root: &Path) -> Result<Vec<PatchCheck>> {
    let mut session = PatchSession::dry_run(packages_root);
    patches.iter().map(|patch| session.check(patch)).collect()
}
