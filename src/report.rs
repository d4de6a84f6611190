// src/report.rs

//! Run reports
//!
//! A [`RunReport`] is filled in as a run progresses and survives a fatal
//! failure, so callers can show what was done before the run stopped.

use crate::engine::RunState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Why a patch could not be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// The reverse diff applies: the fix is already present upstream
    AlreadyApplied,
    /// The target differs from the content the diff was made against
    ContextMismatch,
    /// The target file does not exist
    TargetMissing,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::AlreadyApplied => "already applied",
            Self::ContextMismatch => "context does not match",
            Self::TargetMissing => "target file missing",
        };
        f.write_str(text)
    }
}

/// A non-fatal condition the run continued past
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Warning {
    /// The site-packages alias could not be created
    AliasCreationWarning { link: PathBuf, reason: String },
    /// A tolerant patch did not apply and was skipped
    PatchSkipped {
        patch_name: String,
        file: PathBuf,
        reason: MismatchKind,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AliasCreationWarning { link, reason } => {
                write!(f, "alias {} not created: {}", link.display(), reason)
            }
            Self::PatchSkipped {
                patch_name,
                file,
                reason,
            } => write!(
                f,
                "patch '{}' skipped ({}: {})",
                patch_name,
                file.display(),
                reason
            ),
        }
    }
}

/// A patch that landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedPatch {
    pub name: String,
    /// SHA-256 of the diff payload
    pub sha256: String,
    /// Files written, relative to the packages root
    pub files: Vec<PathBuf>,
}

/// Everything a run did, whether it finished or not
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: RunState,
    /// Kind of the fatal error that stopped the run
    pub error: Option<&'static str>,
    /// Revision stamped into the provenance file
    pub revision: Option<String>,
    /// Local packages installed, in install order
    pub installed: Vec<String>,
    pub applied: Vec<AppliedPatch>,
    pub warnings: Vec<Warning>,
    /// Artifacts created (revision file, alias, extra paths, launcher)
    pub artifacts: Vec<PathBuf>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::NotStarted,
            error: None,
            revision: None,
            installed: Vec::new(),
            applied: Vec::new(),
            warnings: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Names of patches that were skipped
    pub fn skipped(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                Warning::PatchSkipped { patch_name, .. } => Some(patch_name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.state, RunState::Completed)
    }

    /// Seconds between start and finish, if finished
    pub fn duration_secs(&self) -> Option<f64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
