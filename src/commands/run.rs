// src/commands/run.rs

//! Run command - provision the environment

use anyhow::Result;
use patchbay::installer::pip::Pip;
use patchbay::{GitCli, ProgressMode, Provisioner, RunReport, RunState};
use std::io::IsTerminal;
use std::path::Path;
use tracing::info;

/// Provision the environment from a plan
///
/// # Arguments
/// * `plan_path` - Path to the plan file
/// * `env` - Environment directory; `$VIRTUAL_ENV` when `None`
/// * `json` - Print the run report as JSON instead of a summary
/// * `no_launcher` - Skip writing the interpreter launcher
pub fn cmd_run(plan_path: &Path, env: Option<&Path>, json: bool, no_launcher: bool) -> Result<()> {
    let mut plan = super::load(plan_path, json)?;
    if no_launcher {
        plan.artifacts.launcher = None;
    }

    let env = super::environment(env, &plan)?;
    let git = GitCli::locate()?;
    let pip = Pip::with_args(plan.pip_args.clone());

    info!(
        "Provisioning {} from {}",
        env.root.display(),
        plan.root.display()
    );

    let progress = if json {
        ProgressMode::Silent
    } else if std::io::stderr().is_terminal() {
        ProgressMode::Bar
    } else {
        ProgressMode::Log
    };

    let mut provisioner = Provisioner::new(plan, env, &pip, &git).with_progress(progress);
    let result = provisioner.run();
    let report = provisioner.into_report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    result?;
    Ok(())
}

fn print_summary(report: &RunReport) {
    if let Some(revision) = &report.revision {
        println!("Revision: {}", revision);
    }
    if !report.installed.is_empty() {
        println!("Installed: {}", report.installed.join(", "));
    }
    for applied in &report.applied {
        println!("Patched: {} ({} file(s))", applied.name, applied.files.len());
    }

    if !report.warnings.is_empty() {
        println!("\nContinued despite {} warning(s):", report.warnings.len());
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }

    let duration = report
        .duration_secs()
        .map(|secs| format!(" in {:.1}s", secs))
        .unwrap_or_default();

    match &report.state {
        RunState::Completed => println!("\n[OK] Provisioning complete{}", duration),
        RunState::Failed { stage, reason } => {
            let kind = report.error.map(|k| format!(" ({})", k)).unwrap_or_default();
            println!(
                "\n[FAILED] Stopped because {} failed{}{}: {}",
                stage, kind, duration, reason
            );
        }
        other => println!("\n[INCOMPLETE] Run ended in state {}", other),
    }
}
