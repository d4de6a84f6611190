// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::path::Path;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let plan_path = resolve_plan_path(&cli.root, &cli.plan);

    match cli.command {
        Commands::Run {
            env,
            json,
            no_launcher,
            dry_run,
        } => {
            if dry_run {
                commands::cmd_check(&plan_path, env.as_deref(), json)
            } else {
                commands::cmd_run(&plan_path, env.as_deref(), json, no_launcher)
            }
        }
        Commands::Check { env, json } => commands::cmd_check(&plan_path, env.as_deref(), json),
        Commands::Plan { json } => commands::cmd_plan(&plan_path, json),
        Commands::Revision { output } => {
            commands::cmd_revision(&cli.root, &plan_path, output.as_deref())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "patchbay", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// The plan path as given if absolute, otherwise under the root
fn resolve_plan_path(root: &Path, plan: &Path) -> std::path::PathBuf {
    if plan.is_absolute() {
        plan.to_path_buf()
    } else {
        root.join(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_plan_path_resolution() {
        assert_eq!(
            resolve_plan_path(Path::new("/srv/app"), Path::new("provision.toml")),
            Path::new("/srv/app/provision.toml")
        );
        assert_eq!(
            resolve_plan_path(Path::new("/srv/app"), Path::new("/etc/plan.toml")),
            Path::new("/etc/plan.toml")
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["patchbay", "run", "--root", "/srv/app", "--json"]).unwrap();
        assert_eq!(cli.root, Path::new("/srv/app"));
        assert!(matches!(cli.command, Commands::Run { json: true, .. }));
    }
}
