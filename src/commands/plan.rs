// src/commands/plan.rs

//! Plan command - show what a run would do, in order

use anyhow::Result;
use patchbay::Tolerance;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct PatchView<'a> {
    name: &'a str,
    target: &'a Path,
    files: Vec<PathBuf>,
    strip: u32,
    tolerance: Tolerance,
    sha256: &'a str,
}

#[derive(Serialize)]
struct PlanView<'a> {
    root: &'a Path,
    revision_file: &'a Path,
    prerequisite: String,
    requirements: Vec<String>,
    packages: &'a [patchbay::PackageSpec],
    patches: Vec<PatchView<'a>>,
}

/// Print the resolved plan
pub fn cmd_plan(plan_path: &Path, json: bool) -> Result<()> {
    let plan = super::load(plan_path, json)?;

    let patches = plan
        .patches
        .iter()
        .map(|p| {
            Ok(PatchView {
                name: &p.name,
                target: &p.target,
                files: p.files()?,
                strip: p.strip,
                tolerance: p.tolerance,
                sha256: &p.sha256,
            })
        })
        .collect::<patchbay::Result<Vec<_>>>()?;

    let view = PlanView {
        root: &plan.root,
        revision_file: &plan.revision_file,
        prerequisite: plan.prerequisite.to_string(),
        requirements: plan
            .requirements
            .requirements
            .iter()
            .map(ToString::to_string)
            .collect(),
        packages: &plan.packages,
        patches,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Root: {}", view.root.display());
    println!("Revision file: {}", view.revision_file.display());
    println!("Prerequisite: {}", view.prerequisite);
    println!("Requirements: {}", view.requirements.len());

    println!("\nInstall order:");
    for (idx, package) in view.packages.iter().enumerate() {
        let deps = if package.depends_on.is_empty() {
            String::new()
        } else {
            format!(" (after {})", package.depends_on.join(", "))
        };
        println!("  {}. {} [rank {}]{}", idx + 1, package.name, package.rank, deps);
    }

    println!("\nPatches:");
    if view.patches.is_empty() {
        println!("  (none)");
    }
    for (idx, patch) in view.patches.iter().enumerate() {
        let policy = match patch.tolerance {
            Tolerance::Fatal => "fatal",
            Tolerance::Tolerant => "tolerant",
        };
        println!(
            "  {}. {} -> {} (-p{}, {}, sha256 {})",
            idx + 1,
            patch.name,
            patch.target.display(),
            patch.strip,
            policy,
            &patch.sha256[..12]
        );
        for file in patch.files.iter().filter(|f| *f != patch.target) {
            println!("       also touches {}", file.display());
        }
    }

    Ok(())
}
