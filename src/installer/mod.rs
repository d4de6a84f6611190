// src/installer/mod.rs

//! Package installation
//!
//! Installation happens in three fatal steps, each of which must finish
//! before the next starts:
//!
//! 1. The pinned prerequisite (non-editable). Later builds import it.
//! 2. The requirements manifest, in manifest order.
//! 3. Local packages in install order, editable. The foundational package
//!    comes first; a failure stops the loop before any later package.
//!
//! Nothing is retried. A failed install leaves the environment as it was
//! at the failure point.
//!
//! The actual installs go through a [`PackageManager`]; [`pip::Pip`] is the
//! production backend.

pub mod alias;
pub mod pip;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::plan::{PackageSpec, Requirement, RequirementsManifest};
use crate::progress::ProgressTracker;
use crate::report::Warning;
use std::path::Path;
use tracing::{info, warn};

/// Backend that performs individual installs into an environment
pub trait PackageManager {
    /// Install one exact `name==version` requirement, non-editable
    fn install_pinned(&self, env: &Environment, requirement: &Requirement) -> Result<()>;

    /// Install everything in a requirements manifest
    fn install_manifest(&self, env: &Environment, manifest: &RequirementsManifest) -> Result<()>;

    /// Install a local package directory
    fn install_local(&self, env: &Environment, package: &PackageSpec) -> Result<()>;
}

/// Runs the install steps against one environment
pub struct Installer<'a> {
    manager: &'a dyn PackageManager,
    env: &'a Environment,
}

impl<'a> Installer<'a> {
    pub fn new(manager: &'a dyn PackageManager, env: &'a Environment) -> Self {
        Self { manager, env }
    }

    /// Install the pinned prerequisite
    pub fn install_prerequisite(&self, requirement: &Requirement) -> Result<()> {
        info!("Installing prerequisite {}", requirement);
        self.manager
            .install_pinned(self.env, requirement)
            .map_err(|e| Error::PrerequisiteInstallFailed {
                package: requirement.to_string(),
                reason: e.to_string(),
            })
    }

    /// Install the requirements manifest; an empty manifest is a no-op
    pub fn install_requirements(&self, manifest: &RequirementsManifest) -> Result<()> {
        if manifest.is_empty() {
            info!("No third-party requirements to install");
            return Ok(());
        }

        let label = manifest
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "requirements".to_string());

        info!("Installing {} requirement(s) from {}", manifest.len(), label);
        self.manager
            .install_manifest(self.env, manifest)
            .map_err(|e| Error::RequirementsInstallFailed {
                manifest: label,
                reason: e.to_string(),
            })
    }

    /// Install local packages in the given order
    ///
    /// `packages` must already be in install order. Each package that
    /// installs is pushed onto `installed` before the next one starts, so
    /// the caller keeps an accurate record when a later install fails.
    pub fn install_packages(
        &self,
        packages: &[PackageSpec],
        progress: &dyn ProgressTracker,
        installed: &mut Vec<String>,
    ) -> Result<()> {
        progress.set_length(packages.len() as u64);

        for package in packages {
            progress.set_message(&package.name);
            let mode = if package.editable { "editable" } else { "regular" };
            info!(
                "Installing {} ({}) from {}",
                package.name,
                mode,
                package.path.display()
            );

            if let Err(e) = self.manager.install_local(self.env, package) {
                let err = Error::DependencyInstallFailed {
                    package: package.name.clone(),
                    reason: e.to_string(),
                };
                progress.finish_with_error(&err.to_string());
                return Err(err);
            }

            installed.push(package.name.clone());
            progress.increment(1);
        }

        progress.finish_with_message(&format!("{} package(s) installed", installed.len()));
        Ok(())
    }

    /// Link `<root>/<name>` to site-packages
    ///
    /// Failure is returned as a warning, never as an error.
    pub fn create_alias(&self, root: &Path, name: &str) -> std::result::Result<(), Warning> {
        let link = root.join(name);
        match alias::create_alias(&link, &self.env.site_packages) {
            Ok(()) => {
                info!(
                    "Linked {} -> {}",
                    link.display(),
                    self.env.site_packages.display()
                );
                Ok(())
            }
            Err(e) => {
                warn!("Could not create {}: {}", link.display(), e);
                Err(Warning::AliasCreationWarning {
                    link,
                    reason: e.to_string(),
                })
            }
        }
    }
}
