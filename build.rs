// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: environment directory
fn env_arg() -> Arg {
    Arg::new("env")
        .short('e')
        .long("env")
        .value_name("DIR")
        .help("Environment directory (defaults to $VIRTUAL_ENV)")
}

/// Common argument: JSON output
fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print machine-readable JSON")
}

fn build_cli() -> Command {
    Command::new("patchbay")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Patchbay Contributors")
        .about("Provision a Python environment: ordered installs, then patches")
        .subcommand_required(true)
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .global(true)
                .default_value(".")
                .help("Provisioning root (source checkout holding the plan)"),
        )
        .arg(
            Arg::new("plan")
                .short('p')
                .long("plan")
                .global(true)
                .default_value("provision.toml")
                .help("Plan file, relative to the root"),
        )
        .subcommand(
            Command::new("run")
                .about("Provision the active environment")
                .arg(env_arg())
                .arg(json_arg())
                .arg(
                    Arg::new("no_launcher")
                        .long("no-launcher")
                        .action(ArgAction::SetTrue)
                        .help("Do not write the interpreter launcher"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Only report what would happen (same as `check`)"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Validate the plan and predict every patch without writing anything")
                .arg(env_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("plan")
                .about("Show the resolved install order and patch sequence")
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("revision")
                .about("Record the current source revision only")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Output file (defaults to the plan's provenance output)"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = manifest_dir.join("man").join("patchbay.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
