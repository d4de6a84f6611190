// src/lib.rs

//! Patchbay: environment provisioning
//!
//! Provisions a Python environment for a multi-package application:
//! installs a pinned prerequisite, the third-party requirements and the
//! application's local packages in dependency order, then applies an
//! ordered set of patches to the installed third-party packages.
//!
//! # Architecture
//!
//! - Plans: TOML files resolved into a [`plan::ProvisioningPlan`]
//! - Installs: a [`installer::PackageManager`] backend (`pip`) driven in a
//!   strict, fatal-on-failure order
//! - Patches: unified diffs applied in process, with a per-patch tolerance
//! - Runs: a forward-only state machine in [`engine`], reported through
//!   [`report::RunReport`]
//!
//! Runs are executed once and never rolled back.

pub mod engine;
pub mod environment;
mod error;
pub mod filesystem;
pub mod hash;
pub mod installer;
pub mod launcher;
pub mod lock;
pub mod patch;
pub mod plan;
pub mod progress;
pub mod provenance;
pub mod report;
pub mod search_path;

pub use engine::{Provisioner, RunState, Stage};
pub use environment::Environment;
pub use error::{Error, Result};
pub use hash::HashAlgorithm;
pub use installer::{Installer, PackageManager};
pub use plan::{PackageSpec, PatchSpec, ProvisioningPlan, Tolerance, load_plan};
pub use progress::{LogProgress, ProgressMode, ProgressTracker, SilentProgress};
pub use provenance::{GitCli, RevisionSource, record_revision};
pub use report::{AppliedPatch, MismatchKind, RunReport, Warning};
