// src/plan/mod.rs

//! Provisioning plans
//!
//! A plan is read from TOML ([`format`]), checked ([`parser`]) and resolved
//! into a [`ProvisioningPlan`]: packages sorted into install order, patch
//! files read and split into per-file diffs, paths made absolute against
//! the provisioning root.
//!
//! A plan is built once and executed once. Nothing in it is mutated by the
//! run.
//!
//! # Example Plan
//!
//! ```toml
//! [prerequisite]
//! name = "setuptools"
//! version = "57.5.0"
//!
//! [[package]]
//! name = "common"
//! path = "code/common"
//! rank = 0
//!
//! [[package]]
//! name = "server"
//! path = "code/server"
//! rank = 1
//!
//! [[patch]]
//! file = "patches/requests/models.py.diff"
//! target = "requests/models.py"
//! ```

pub mod format;
pub mod graph;
pub mod parser;
pub mod requirements;

pub use format::PlanFile;
pub use graph::PackageGraph;
pub use parser::{load_plan, parse_plan, parse_plan_file, validate_plan};
pub use requirements::{Requirement, RequirementsManifest};

use crate::error::{Error, Result};
use crate::patch::unified::FilePatch;
use crate::report::{MismatchKind, Warning};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A local package to install
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSpec {
    pub name: String,
    /// Absolute package directory
    pub path: PathBuf,
    pub editable: bool,
    pub rank: u32,
    pub depends_on: Vec<String>,
}

/// What a patch that does not apply means for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    /// The run stops with `PatchApplicationFailed`
    #[default]
    Fatal,
    /// The patch is skipped with a `PatchSkipped` warning
    Tolerant,
}

impl Tolerance {
    pub fn from_flag(tolerant: bool) -> Self {
        if tolerant { Self::Tolerant } else { Self::Fatal }
    }

    pub fn is_tolerant(self) -> bool {
        matches!(self, Self::Tolerant)
    }

    /// Turn a patch that did not apply into an error or a warning
    pub fn on_mismatch(self, patch_name: &str, file: &Path, kind: MismatchKind) -> Result<Warning> {
        match self {
            Self::Fatal => Err(Error::PatchApplicationFailed {
                patch_name: patch_name.to_string(),
                reason: format!("{}: {}", file.display(), kind),
            }),
            Self::Tolerant => Ok(Warning::PatchSkipped {
                patch_name: patch_name.to_string(),
                file: file.to_path_buf(),
                reason: kind,
            }),
        }
    }
}

/// A patch to apply to installed packages
#[derive(Debug, Clone)]
pub struct PatchSpec {
    pub name: String,
    /// Diff file the content was read from
    pub source: PathBuf,
    /// Raw diff payload
    pub content: Vec<u8>,
    /// One entry per file the diff touches
    pub sections: Vec<FilePatch>,
    /// Main file the patch modifies, relative to the packages root
    pub target: PathBuf,
    pub strip: u32,
    pub tolerance: Tolerance,
    /// SHA-256 of `content`
    pub sha256: String,
}

impl PatchSpec {
    /// Build a patch from diff content, checking that it touches `target`
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        content: impl Into<Vec<u8>>,
        target: impl AsRef<Path>,
        strip: u32,
        tolerance: Tolerance,
    ) -> Result<Self> {
        let name = name.into();
        let content = content.into();
        let target = crate::filesystem::path::sanitize_path(target)?;
        let sections = crate::patch::unified::parse_diff(&content)
            .map_err(|e| Error::InvalidPlan(format!("patch '{}': {}", name, e)))?;

        let resolved = sections
            .iter()
            .map(|s| s.resolve(strip))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::InvalidPlan(format!("patch '{}': {}", name, e)))?;

        if !resolved.contains(&target) {
            let touched: Vec<String> = resolved.iter().map(|p| p.display().to_string()).collect();
            return Err(Error::InvalidPlan(format!(
                "patch '{}': target {} is not in the diff (touches: {}); check strip = {}",
                name,
                target.display(),
                touched.join(", "),
                strip
            )));
        }

        let sha256 = crate::hash::sha256(&content);

        Ok(Self {
            name,
            source: source.into(),
            content,
            sections,
            target,
            strip,
            tolerance,
            sha256,
        })
    }

    /// Files the patch touches, relative to the packages root
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        self.sections.iter().map(|s| s.resolve(self.strip)).collect()
    }
}

/// Artifact settings, with disabled artifacts as `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSettings {
    /// Link name under the root pointing at site-packages
    pub alias: Option<String>,
    /// Extra search-path directory name under the root
    pub extra_paths: Option<String>,
    /// `.pth` file inside site-packages
    pub pth_file: String,
    /// Launcher name in the environment's binary directory
    pub launcher: Option<String>,
    /// Explicit site-packages directory
    pub site_packages: Option<PathBuf>,
}

/// A resolved provisioning plan
#[derive(Debug, Clone)]
pub struct ProvisioningPlan {
    /// Provisioning root; relative plan paths resolve against it
    pub root: PathBuf,
    /// Absolute path of the revision stamp
    pub revision_file: PathBuf,
    pub prerequisite: Requirement,
    pub requirements: RequirementsManifest,
    /// Local packages in install order
    pub packages: Vec<PackageSpec>,
    /// Patches in declared order
    pub patches: Vec<PatchSpec>,
    pub artifacts: ArtifactSettings,
    /// Extra arguments for every package manager install
    pub pip_args: Vec<String>,
}

impl ProvisioningPlan {
    /// The package installed before all others
    pub fn foundational(&self) -> Option<&PackageSpec> {
        self.packages.first()
    }

    /// Names of packages in install order
    pub fn install_order(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }
}
