// src/commands/revision.rs

//! Revision command - stamp the current source revision

use anyhow::{Context, Result};
use patchbay::plan::format::DEFAULT_REVISION_FILE;
use patchbay::plan::parse_plan_file;
use patchbay::{GitCli, record_revision};
use std::path::Path;

/// Record the revision of `root` without provisioning anything
///
/// The output defaults to the plan's provenance setting, or the standard
/// location when there is no plan file.
pub fn cmd_revision(root: &Path, plan_path: &Path, output: Option<&Path>) -> Result<()> {
    let output = match output {
        Some(path) => path.to_path_buf(),
        None if plan_path.is_file() => {
            let plan = parse_plan_file(plan_path)
                .with_context(|| format!("Failed to read plan {}", plan_path.display()))?;
            root.join(patchbay::filesystem::path::sanitize_path(&plan.provenance.output)?)
        }
        None => root.join(DEFAULT_REVISION_FILE),
    };

    let git = GitCli::locate()?;
    let revision = record_revision(&git, root, &output)?;
    println!("{} -> {}", revision, output.display());
    Ok(())
}
