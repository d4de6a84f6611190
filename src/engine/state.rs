// src/engine/state.rs

//! Run state machine
//!
//! ```text
//! NotStarted -> InstallingPrerequisite -> InstallingPackages -> ApplyingPatches -> Completed
//!      \                  \                       \                    \
//!       +------------------+-----------------------+--------------------+--> Failed
//! ```
//!
//! States only move forward. `Completed` and `Failed` are terminal; a run
//! is never resumed, a new run starts from `NotStarted`.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Fine-grained step of a run, recorded when the run fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preconditions,
    Provenance,
    Prerequisite,
    Requirements,
    Packages,
    Alias,
    SearchPath,
    Launcher,
    Patches,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preconditions => "precondition check",
            Self::Provenance => "revision recording",
            Self::Prerequisite => "prerequisite install",
            Self::Requirements => "requirements install",
            Self::Packages => "package install",
            Self::Alias => "site-packages alias",
            Self::SearchPath => "search path setup",
            Self::Launcher => "launcher setup",
            Self::Patches => "patch application",
        };
        f.write_str(name)
    }
}

/// State of a provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    InstallingPrerequisite,
    InstallingPackages,
    ApplyingPatches,
    Completed,
    Failed { stage: Stage, reason: String },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }

    fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::InstallingPrerequisite => "InstallingPrerequisite",
            Self::InstallingPackages => "InstallingPackages",
            Self::ApplyingPatches => "ApplyingPatches",
            Self::Completed => "Completed",
            Self::Failed { .. } => "Failed",
        }
    }

    /// The state that follows this one on success
    fn successor(&self) -> Option<RunState> {
        match self {
            Self::NotStarted => Some(Self::InstallingPrerequisite),
            Self::InstallingPrerequisite => Some(Self::InstallingPackages),
            Self::InstallingPackages => Some(Self::ApplyingPatches),
            Self::ApplyingPatches => Some(Self::Completed),
            Self::Completed | Self::Failed { .. } => None,
        }
    }

    /// Move to `next`, which must be the direct successor
    pub fn advance(&mut self, next: RunState) -> Result<()> {
        if self.successor().as_ref() != Some(&next) {
            return Err(Error::IllegalTransition {
                from: self.name().to_string(),
                to: next.name().to_string(),
            });
        }
        *self = next;
        Ok(())
    }

    /// Move to `Failed`; only valid from a non-terminal state
    pub fn fail(&mut self, stage: Stage, reason: impl Into<String>) -> Result<()> {
        if self.is_terminal() {
            return Err(Error::IllegalTransition {
                from: self.name().to_string(),
                to: "Failed".to_string(),
            });
        }
        *self = Self::Failed {
            stage,
            reason: reason.into(),
        };
        Ok(())
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { stage, reason } => write!(f, "Failed during {}: {}", stage, reason),
            other => f.write_str(other.name()),
        }
    }
}
