// src/cli.rs
//! CLI definitions for patchbay
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "patchbay")]
#[command(author = "Patchbay Contributors")]
#[command(version)]
#[command(about = "Provision a Python environment: ordered installs, then patches", long_about = None)]
pub struct Cli {
    /// Provisioning root (source checkout holding the plan)
    #[arg(short, long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Plan file, relative to the root
    #[arg(short, long, global = true, default_value = "provision.toml")]
    pub plan: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision the active environment
    Run {
        /// Environment directory (defaults to $VIRTUAL_ENV)
        #[arg(short, long)]
        env: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Do not write the interpreter launcher
        #[arg(long)]
        no_launcher: bool,

        /// Only report what would happen (same as `check`)
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the plan and predict every patch without writing anything
    Check {
        /// Environment directory (defaults to $VIRTUAL_ENV)
        #[arg(short, long)]
        env: Option<PathBuf>,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved install order and patch sequence
    Plan {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record the current source revision only
    Revision {
        /// Output file (defaults to the plan's provenance output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
