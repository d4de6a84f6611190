// src/engine/mod.rs

//! Provisioning run orchestration
//!
//! A [`Provisioner`] owns one plan and executes it exactly once:
//!
//! 1. Preconditions, then the environment lock
//! 2. Revision stamp
//! 3. Prerequisite, requirements, local packages
//! 4. Site-packages alias (non-fatal), search path, launcher
//! 5. Patches, in declared order
//!
//! The first fatal error stops the run and is recorded as
//! `Failed { stage, reason }`. Nothing is rolled back; provisioning is
//! repeated from a fresh environment, not resumed.

mod state;

pub use state::{RunState, Stage};

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::installer::{Installer, PackageManager};
use crate::launcher::write_launcher;
use crate::patch::{PatchOutcome, apply_patches};
use crate::plan::ProvisioningPlan;
use crate::progress::ProgressMode;
use crate::provenance::{RevisionSource, record_revision};
use crate::report::RunReport;
use crate::search_path::augment_search_path;
use chrono::Utc;
use tracing::{error, info};

/// Executes a provisioning plan against an environment
pub struct Provisioner<'a> {
    plan: ProvisioningPlan,
    env: Environment,
    manager: &'a dyn PackageManager,
    revisions: &'a dyn RevisionSource,
    progress: ProgressMode,
    stage: Stage,
    report: RunReport,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        plan: ProvisioningPlan,
        env: Environment,
        manager: &'a dyn PackageManager,
        revisions: &'a dyn RevisionSource,
    ) -> Self {
        Self {
            plan,
            env,
            manager,
            revisions,
            progress: ProgressMode::default(),
            stage: Stage::Preconditions,
            report: RunReport::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressMode) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.report.state
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Execute the plan
    ///
    /// Can be called once; a second call fails with `IllegalTransition`.
    /// The report is kept up to date either way.
    pub fn run(&mut self) -> Result<()> {
        if self.report.state != RunState::NotStarted {
            return Err(Error::IllegalTransition {
                from: self.report.state.to_string(),
                to: "InstallingPrerequisite".to_string(),
            });
        }

        self.report.started_at = Utc::now();
        let result = self.execute();
        self.report.finished_at = Some(Utc::now());

        if let Err(e) = &result {
            error!("Provisioning stopped: {} failed: {}", self.stage, e);
            self.report.error = Some(e.kind());
            self.report.state.fail(self.stage, e.to_string())?;
        } else {
            info!(
                "Provisioning complete: {} package(s), {} patch(es) applied, {} warning(s)",
                self.report.installed.len(),
                self.report.applied.len(),
                self.report.warnings.len()
            );
        }

        result
    }

    fn execute(&mut self) -> Result<()> {
        self.stage = Stage::Preconditions;
        self.check_preconditions()?;
        let _lock = self.env.lock()?;

        self.stage = Stage::Provenance;
        let revision = record_revision(self.revisions, &self.plan.root, &self.plan.revision_file)?;
        self.report.revision = Some(revision);
        self.report.artifacts.push(self.plan.revision_file.clone());

        self.report.state.advance(RunState::InstallingPrerequisite)?;
        let installer = Installer::new(self.manager, &self.env);
        self.stage = Stage::Prerequisite;
        installer.install_prerequisite(&self.plan.prerequisite)?;

        self.report.state.advance(RunState::InstallingPackages)?;
        self.stage = Stage::Requirements;
        installer.install_requirements(&self.plan.requirements)?;

        self.stage = Stage::Packages;
        let progress = self
            .progress
            .tracker("packages", self.plan.packages.len() as u64);
        installer.install_packages(&self.plan.packages, progress.as_ref(), &mut self.report.installed)?;

        if let Some(alias) = &self.plan.artifacts.alias {
            self.stage = Stage::Alias;
            match installer.create_alias(&self.plan.root, alias) {
                Ok(()) => self.report.artifacts.push(self.plan.root.join(alias)),
                Err(warning) => self.report.warnings.push(warning),
            }
        }

        if let Some(extra) = &self.plan.artifacts.extra_paths {
            self.stage = Stage::SearchPath;
            let dir = augment_search_path(&self.env, &self.plan.root, extra, &self.plan.artifacts.pth_file)?;
            self.report.artifacts.push(dir);
        }

        if let Some(name) = &self.plan.artifacts.launcher {
            self.stage = Stage::Launcher;
            let path = write_launcher(&self.env, name)?;
            self.report.artifacts.push(path);
        }

        self.report.state.advance(RunState::ApplyingPatches)?;
        self.stage = Stage::Patches;
        let progress = self
            .progress
            .tracker("patches", self.plan.patches.len() as u64);
        let mut outcome = PatchOutcome::default();
        let patched = apply_patches(
            &self.plan.patches,
            &self.env.site_packages,
            progress.as_ref(),
            &mut outcome,
        );
        self.report.applied.extend(outcome.applied);
        self.report.warnings.extend(outcome.skipped);
        patched?;

        self.report.state.advance(RunState::Completed)
    }

    /// Checks that run before anything is written
    fn check_preconditions(&self) -> Result<()> {
        if !self.env.site_packages.is_dir() {
            return Err(Error::PreconditionError(format!(
                "site-packages directory {} does not exist",
                self.env.site_packages.display()
            )));
        }
        if self.plan.artifacts.launcher.is_some() && !self.env.bin_dir.is_dir() {
            return Err(Error::PreconditionError(format!(
                "binary directory {} does not exist",
                self.env.bin_dir.display()
            )));
        }
        for package in &self.plan.packages {
            if !package.path.is_dir() {
                return Err(Error::PreconditionError(format!(
                    "package '{}' directory {} does not exist",
                    package.name,
                    package.path.display()
                )));
            }
        }
        Ok(())
    }
}
