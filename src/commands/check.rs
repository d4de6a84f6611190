// src/commands/check.rs

//! Check command - dry run against the environment

use anyhow::{Result, bail};
use patchbay::lock::RunLock;
use patchbay::patch::{PatchCheck, Verdict, check_patches};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CheckReport<'a> {
    environment: &'a Path,
    site_packages: &'a Path,
    locked: bool,
    git: bool,
    install_order: Vec<&'a str>,
    missing_packages: Vec<&'a str>,
    patches: Vec<PatchCheck>,
}

/// Validate the plan and predict each patch without writing
pub fn cmd_check(plan_path: &Path, env: Option<&Path>, json: bool) -> Result<()> {
    let plan = super::load(plan_path, json)?;
    let env = super::environment(env, &plan)?;

    let patches = check_patches(&plan.patches, &env.site_packages)?;
    let report = CheckReport {
        environment: &env.root,
        site_packages: &env.site_packages,
        locked: RunLock::is_held(env.lock_path()),
        git: which::which("git").is_ok(),
        install_order: plan.install_order(),
        missing_packages: plan
            .packages
            .iter()
            .filter(|p| !p.path.is_dir())
            .map(|p| p.name.as_str())
            .collect(),
        patches,
    };

    let fatal = report
        .patches
        .iter()
        .filter(|c| matches!(c.verdict, Verdict::Fails(_)))
        .count();
    let blocked = fatal > 0 || report.locked || !report.git || !report.missing_packages.is_empty();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Environment: {}", report.environment.display());
        println!("Install order: {}", report.install_order.join(" -> "));
        for name in &report.missing_packages {
            println!("  [MISSING] package directory for '{}'", name);
        }
        if !report.git {
            println!("  [MISSING] git is not on PATH");
        }
        if report.locked {
            println!("  [LOCKED] another run holds {}", env.lock_path().display());
        }

        for check in &report.patches {
            match check.verdict {
                Verdict::Applies => println!("  [APPLY] {}", check.name),
                Verdict::Skips(kind) => {
                    println!("  [SKIP]  {} ({}: {})", check.name, check.file.display(), kind)
                }
                Verdict::Fails(kind) => {
                    println!("  [FAIL]  {} ({}: {})", check.name, check.file.display(), kind)
                }
            }
        }
    }

    if blocked {
        bail!("a run against {} would not complete", env.root.display());
    }

    if !json {
        println!("\n[OK] A run would complete");
    }
    Ok(())
}
