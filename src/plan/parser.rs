// src/plan/parser.rs

//! Plan file parsing, validation and resolution

use crate::error::{Error, Result};
use crate::filesystem::path::sanitize_path;
use crate::plan::format::{DEFAULT_REQUIREMENTS, PlanFile};
use crate::plan::graph::PackageGraph;
use crate::plan::{
    ArtifactSettings, PackageSpec, PatchSpec, ProvisioningPlan, Requirement,
    RequirementsManifest, Tolerance,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parse a plan from a TOML string
pub fn parse_plan(content: &str) -> Result<PlanFile> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid plan: {}", e)))
}

/// Parse a plan from a file
pub fn parse_plan_file(path: &Path) -> Result<PlanFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::IoError(format!("Failed to read plan file {}: {}", path.display(), e))
    })?;

    parse_plan(&content)
}

/// Validate a plan for structural correctness
///
/// Returns warnings for things that are allowed but suspicious.
pub fn validate_plan(plan: &PlanFile) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if plan.prerequisite.name.trim().is_empty() {
        return Err(Error::InvalidPlan("prerequisite name cannot be empty".to_string()));
    }
    if plan.prerequisite.version.trim().is_empty() {
        return Err(Error::InvalidPlan(format!(
            "prerequisite '{}' must pin a version",
            plan.prerequisite.name
        )));
    }

    let mut names = HashSet::new();
    for package in &plan.packages {
        if package.name.trim().is_empty() {
            return Err(Error::InvalidPlan("package name cannot be empty".to_string()));
        }
        if !names.insert(package.name.as_str()) {
            return Err(Error::InvalidPlan(format!(
                "package '{}' is declared more than once",
                package.name
            )));
        }
        if !package.editable {
            warnings.push(format!(
                "Package '{}' is not editable; source changes will need a reinstall",
                package.name
            ));
        }
    }

    // Ordering problems (cycles, unknown deps, ambiguous foundational)
    let graph = package_graph(plan);
    graph.install_order()?;

    let ranks: HashMap<&str, u32> = plan
        .packages
        .iter()
        .enumerate()
        .map(|(idx, p)| (p.name.as_str(), effective_rank(p.rank, idx)))
        .collect();
    for package in &plan.packages {
        let rank = ranks[package.name.as_str()];
        for dep in &package.depends_on {
            let dep_rank = ranks[dep.as_str()];
            if dep_rank > rank {
                warnings.push(format!(
                    "Package '{}' (rank {}) depends on '{}' (rank {}); dependency wins",
                    package.name, rank, dep, dep_rank
                ));
            }
        }
    }

    let mut patch_names = HashSet::new();
    for patch in &plan.patches {
        let name = patch.display_name();
        if name.trim().is_empty() || patch.file.trim().is_empty() {
            return Err(Error::InvalidPlan(
                "patch entries need a file and a target".to_string(),
            ));
        }
        if !patch_names.insert(name) {
            return Err(Error::InvalidPlan(format!(
                "patch '{}' is declared more than once; give one of them a name",
                name
            )));
        }
        if let Some(checksum) = &patch.checksum {
            crate::hash::parse_checksum(checksum)
                .map_err(|e| Error::InvalidPlan(format!("patch '{}': {}", name, e)))?;
        }
        if patch.tolerant {
            warnings.push(format!(
                "Patch '{}' is tolerant: it will be skipped if it does not apply",
                name
            ));
        }
    }

    let tolerant = plan.patches.iter().filter(|p| p.tolerant).count();
    if tolerant > 1 {
        warnings.push(format!(
            "{} patches are tolerant; confirm each one really has upstream versions that already carry the fix",
            tolerant
        ));
    }

    Ok(warnings)
}

/// Resolve a validated plan against the provisioning root
///
/// Reads the requirements manifest and every patch file, verifies patch
/// checksums and sorts packages into install order.
pub fn resolve_plan(plan: &PlanFile, root: &Path) -> Result<ProvisioningPlan> {
    let revision_file = root.join(sanitize_path(&plan.provenance.output)?);

    let prerequisite = Requirement::new(
        plan.prerequisite.name.trim(),
        plan.prerequisite.version.trim(),
    );

    let requirements = match &plan.requirements.manifest {
        Some(manifest) => RequirementsManifest::load(&root.join(manifest))?,
        None => {
            let default = root.join(DEFAULT_REQUIREMENTS);
            if default.is_file() {
                RequirementsManifest::load(&default)?
            } else {
                debug!("No {} at {}, skipping", DEFAULT_REQUIREMENTS, root.display());
                RequirementsManifest::empty()
            }
        }
    };

    let order = package_graph(plan).install_order()?;
    let packages: Vec<PackageSpec> = order
        .iter()
        .filter_map(|name| {
            plan.packages
                .iter()
                .enumerate()
                .find(|(_, p)| &p.name == name)
        })
        .map(|(idx, entry)| PackageSpec {
            name: entry.name.clone(),
            path: root.join(&entry.path),
            editable: entry.editable,
            rank: effective_rank(entry.rank, idx),
            depends_on: entry.depends_on.clone(),
        })
        .collect();

    let mut patches = Vec::with_capacity(plan.patches.len());
    for entry in &plan.patches {
        let name = entry.display_name();
        let source = root.join(&entry.file);
        let bytes = std::fs::read(&source).map_err(|e| {
            Error::IoError(format!(
                "Failed to read patch '{}' from {}: {}",
                name,
                source.display(),
                e
            ))
        })?;

        if let Some(checksum) = &entry.checksum {
            crate::hash::verify_checksum(&bytes, checksum).map_err(|e| match e {
                Error::ChecksumMismatch(msg) => Error::ChecksumMismatch(format!(
                    "patch '{}' ({}): {}",
                    name,
                    source.display(),
                    msg
                )),
                other => other,
            })?;
        }

        patches.push(PatchSpec::new(
            name,
            source,
            bytes,
            &entry.target,
            entry.strip,
            Tolerance::from_flag(entry.tolerant),
        )?);
    }

    let non_empty = |value: &str| -> Option<String> {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };

    let artifacts = ArtifactSettings {
        alias: non_empty(&plan.environment.alias),
        extra_paths: non_empty(&plan.environment.extra_paths),
        pth_file: plan.environment.pth_file.clone(),
        launcher: non_empty(&plan.environment.launcher),
        site_packages: plan
            .environment
            .site_packages
            .as_ref()
            .map(|p| root.join(p)),
    };

    Ok(ProvisioningPlan {
        root: root.to_path_buf(),
        revision_file,
        prerequisite,
        requirements,
        packages,
        patches,
        artifacts,
        pip_args: plan.environment.pip_args.clone(),
    })
}

/// Load, validate and resolve a plan file
///
/// The directory holding the plan file is the provisioning root.
pub fn load_plan(path: &Path) -> Result<(ProvisioningPlan, Vec<String>)> {
    let path = path.canonicalize().map_err(|e| {
        Error::IoError(format!("Failed to locate plan file {}: {}", path.display(), e))
    })?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    let file = parse_plan_file(&path)?;
    let warnings = validate_plan(&file)?;
    let plan = resolve_plan(&file, &root)?;

    debug!(
        "Loaded plan {}: {} package(s), {} patch(es)",
        path.display(),
        plan.packages.len(),
        plan.patches.len()
    );

    Ok((plan, warnings))
}

fn effective_rank(rank: Option<u32>, index: usize) -> u32 {
    rank.unwrap_or(index as u32)
}

fn package_graph(plan: &PlanFile) -> PackageGraph {
    let mut graph = PackageGraph::new();
    for (idx, package) in plan.packages.iter().enumerate() {
        let deps: Vec<&str> = package.depends_on.iter().map(String::as_str).collect();
        graph.add_package(&package.name, effective_rank(package.rank, idx), &deps);
    }
    graph
}
