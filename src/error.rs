// src/error.rs

//! Error types for provisioning runs
//!
//! Every variant here is fatal: it stops the run at the stage that produced
//! it. Non-fatal outcomes (alias creation problems, skipped tolerant patches)
//! are not errors and live in [`crate::report::Warning`].

use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a provisioning run
#[derive(Error, Debug)]
pub enum Error {
    /// The environment is not usable (not activated, missing tools, locked)
    #[error("Precondition failed: {0}")]
    PreconditionError(String),

    /// No revision could be read from the source checkout
    #[error("Revision unavailable: {0}")]
    VcsUnavailable(String),

    /// The pinned prerequisite package did not install
    #[error("Failed to install prerequisite {package}: {reason}")]
    PrerequisiteInstallFailed { package: String, reason: String },

    /// The requirements manifest did not install
    #[error("Failed to install requirements from {manifest}: {reason}")]
    RequirementsInstallFailed { manifest: String, reason: String },

    /// A local package did not install; later packages were not attempted
    #[error("Failed to install package '{package}': {reason}")]
    DependencyInstallFailed { package: String, reason: String },

    /// A non-tolerant patch did not apply
    #[error("Failed to apply patch '{patch_name}': {reason}")]
    PatchApplicationFailed { patch_name: String, reason: String },

    /// The provisioning plan is structurally invalid
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Parse error (plan file, requirements manifest, diff)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Checksum verification failed
    #[error("Checksum verification failed: {0}")]
    ChecksumMismatch(String),

    /// I/O error with context
    #[error("I/O error: {0}")]
    IoError(String),

    /// Invalid path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path escapes its root
    #[error("Path traversal rejected: {0}")]
    PathTraversal(String),

    /// External command could not be run or exited non-zero
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Run state machine was driven through an illegal transition
    #[error("Illegal run transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl Error {
    /// Short name of the error kind, recorded in `RunReport::error`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PreconditionError(_) => "PreconditionError",
            Self::VcsUnavailable(_) => "VcsUnavailable",
            Self::PrerequisiteInstallFailed { .. } => "PrerequisiteInstallFailed",
            Self::RequirementsInstallFailed { .. } => "RequirementsInstallFailed",
            Self::DependencyInstallFailed { .. } => "DependencyInstallFailed",
            Self::PatchApplicationFailed { .. } => "PatchApplicationFailed",
            Self::InvalidPlan(_) => "InvalidPlan",
            Self::ParseError(_) => "ParseError",
            Self::ChecksumMismatch(_) => "ChecksumMismatch",
            Self::IoError(_) => "IoError",
            Self::InvalidPath(_) => "InvalidPath",
            Self::PathTraversal(_) => "PathTraversal",
            Self::CommandFailed(_) => "CommandFailed",
            Self::IllegalTransition { .. } => "IllegalTransition",
        }
    }
}
