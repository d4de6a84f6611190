// src/commands/mod.rs
//! Command handlers for the patchbay CLI

mod check;
mod plan;
mod revision;
mod run;

pub use check::cmd_check;
pub use plan::cmd_plan;
pub use revision::cmd_revision;
pub use run::cmd_run;

use anyhow::{Context, Result};
use patchbay::{Environment, ProvisioningPlan, load_plan};
use std::path::Path;

/// Load a plan and print its warnings
fn load(plan_path: &Path, quiet: bool) -> Result<ProvisioningPlan> {
    let (plan, warnings) = load_plan(plan_path)
        .with_context(|| format!("Failed to load plan {}", plan_path.display()))?;

    if !quiet {
        for warning in &warnings {
            eprintln!("Warning: {}", warning);
        }
    }

    Ok(plan)
}

/// The environment named on the command line, or the active one
fn environment(env: Option<&Path>, plan: &ProvisioningPlan) -> Result<Environment> {
    let site_packages = plan.artifacts.site_packages.as_deref();
    let env = match env {
        Some(root) => Environment::discover(root, site_packages)?,
        None => Environment::from_env(site_packages)?,
    };
    Ok(env)
}
