// src/installer/pip.rs

//! `pip` backend
//!
//! Every install runs `<env python> -m pip install ...`, so packages always
//! land in the target environment whatever `pip` is first on `PATH`.

use crate::environment::{Environment, VIRTUAL_ENV};
use crate::error::{Error, Result};
use crate::installer::PackageManager;
use crate::plan::{PackageSpec, Requirement, RequirementsManifest};
use std::ffi::OsString;
use std::process::Command;
use tracing::debug;

/// Lines of pip's stderr kept in error messages
const STDERR_TAIL: usize = 20;

/// Installs through `python -m pip`
#[derive(Debug, Clone, Default)]
pub struct Pip {
    /// Extra arguments for every `pip install` (e.g. `--no-index`)
    pub extra_args: Vec<String>,
}

/// What a single `pip install` call installs
#[derive(Debug, Clone, Copy)]
pub enum PipTarget<'a> {
    Pinned(&'a Requirement),
    Manifest(&'a RequirementsManifest),
    Local(&'a PackageSpec),
}

impl Pip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(extra_args: Vec<String>) -> Self {
        Self { extra_args }
    }

    /// Arguments passed to the interpreter for one install
    pub fn install_args(&self, target: PipTarget<'_>) -> Result<Vec<OsString>> {
        let mut args: Vec<OsString> = ["-m", "pip", "install", "--disable-pip-version-check"]
            .iter()
            .map(OsString::from)
            .collect();
        args.extend(self.extra_args.iter().map(OsString::from));

        match target {
            PipTarget::Pinned(requirement) => args.push(requirement.to_string().into()),
            PipTarget::Manifest(manifest) => {
                let path = manifest.path.as_ref().ok_or_else(|| {
                    Error::InvalidPath("requirements manifest has no file".to_string())
                })?;
                args.push("-r".into());
                args.push(path.into());
            }
            PipTarget::Local(package) => {
                if package.editable {
                    args.push("-e".into());
                }
                args.push(package.path.clone().into());
            }
        }

        Ok(args)
    }

    fn run(&self, env: &Environment, target: PipTarget<'_>) -> Result<()> {
        let args = self.install_args(target)?;
        debug!("Running {} {:?}", env.python.display(), args);

        let output = Command::new(&env.python)
            .args(&args)
            .env(VIRTUAL_ENV, &env.root)
            .output()
            .map_err(|e| {
                Error::CommandFailed(format!("Failed to run {}: {}", env.python.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL)..].join("\n");
            return Err(Error::CommandFailed(format!(
                "pip install exited with {}: {}",
                output.status, tail
            )));
        }

        Ok(())
    }
}

impl PackageManager for Pip {
    fn install_pinned(&self, env: &Environment, requirement: &Requirement) -> Result<()> {
        self.run(env, PipTarget::Pinned(requirement))
    }

    fn install_manifest(&self, env: &Environment, manifest: &RequirementsManifest) -> Result<()> {
        self.run(env, PipTarget::Manifest(manifest))
    }

    fn install_local(&self, env: &Environment, package: &PackageSpec) -> Result<()> {
        self.run(env, PipTarget::Local(package))
    }
}
