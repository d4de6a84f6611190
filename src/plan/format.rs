// src/plan/format.rs

//! Plan file format definitions
//!
//! A plan is a TOML file (conventionally `provision.toml` at the
//! provisioning root) that names the pinned prerequisite, the requirements
//! manifest, the local packages and the patches to apply afterwards.

use serde::{Deserialize, Serialize};

/// Default location of the revision stamp, relative to the root
pub const DEFAULT_REVISION_FILE: &str = "release-info/revision.txt";

/// Default requirements manifest, relative to the root
pub const DEFAULT_REQUIREMENTS: &str = "requirements.txt";

/// Default name of the site-packages alias link
pub const DEFAULT_ALIAS: &str = "eggs";

/// Default name of the extra search-path directory
pub const DEFAULT_EXTRA_PATHS: &str = "extra_paths";

/// Default `.pth` file the extra directory is registered in
pub const DEFAULT_PTH_FILE: &str = "extra_paths.pth";

/// Default launcher name placed in the environment's binary directory
pub const DEFAULT_LAUNCHER: &str = "py";

/// A complete plan file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    /// Where the revision stamp goes
    #[serde(default)]
    pub provenance: ProvenanceSection,

    /// Package that must be importable before anything else builds
    pub prerequisite: PrerequisiteSection,

    /// Third-party requirements
    #[serde(default)]
    pub requirements: RequirementsSection,

    /// Local packages, installed in editable mode
    #[serde(default, rename = "package")]
    pub packages: Vec<PackageEntry>,

    /// Artifacts written into or next to the environment
    #[serde(default)]
    pub environment: EnvironmentSection,

    /// Patches applied to installed packages, in order
    #[serde(default, rename = "patch")]
    pub patches: Vec<PatchEntry>,
}

/// Provenance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvenanceSection {
    /// Revision file, relative to the root
    #[serde(default = "default_revision_file")]
    pub output: String,
}

impl Default for ProvenanceSection {
    fn default() -> Self {
        Self {
            output: default_revision_file(),
        }
    }
}

/// The pinned prerequisite package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrerequisiteSection {
    pub name: String,
    pub version: String,
}

/// Requirements manifest settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementsSection {
    /// Manifest path relative to the root
    ///
    /// When unset, `requirements.txt` is used if it exists.
    #[serde(default)]
    pub manifest: Option<String>,
}

/// A local package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageEntry {
    /// Package name as used in reports and `depends_on`
    pub name: String,

    /// Package directory relative to the root
    pub path: String,

    /// Install order rank; the lowest rank is the foundational package.
    /// Defaults to the declaration index.
    #[serde(default)]
    pub rank: Option<u32>,

    /// Packages that must be installed before this one
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Install in editable (development) mode
    #[serde(default = "default_true")]
    pub editable: bool,
}

/// Environment artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSection {
    /// Name of the link to site-packages created under the root; empty disables
    #[serde(default = "default_alias")]
    pub alias: String,

    /// Extra search-path directory created under the root; empty disables
    #[serde(default = "default_extra_paths")]
    pub extra_paths: String,

    /// `.pth` file in site-packages that receives the extra directory
    #[serde(default = "default_pth_file")]
    pub pth_file: String,

    /// Launcher written to the environment's binary directory; empty disables
    #[serde(default = "default_launcher")]
    pub launcher: String,

    /// Explicit site-packages directory, overriding discovery
    #[serde(default)]
    pub site_packages: Option<String>,

    /// Extra arguments for every `pip install` (e.g. `--no-index`)
    #[serde(default)]
    pub pip_args: Vec<String>,
}

impl Default for EnvironmentSection {
    fn default() -> Self {
        Self {
            alias: default_alias(),
            extra_paths: default_extra_paths(),
            pth_file: default_pth_file(),
            launcher: default_launcher(),
            site_packages: None,
            pip_args: Vec::new(),
        }
    }
}

/// A patch against an installed package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchEntry {
    /// Patch name used in reports; defaults to `target`
    #[serde(default)]
    pub name: Option<String>,

    /// Diff file relative to the root
    pub file: String,

    /// File the patch is expected to modify, relative to site-packages
    pub target: String,

    /// Leading components stripped from paths recorded in the diff (`-pN`)
    #[serde(default)]
    pub strip: u32,

    /// Skip instead of failing when the diff does not apply
    #[serde(default)]
    pub tolerant: bool,

    /// Optional `algorithm:hex` checksum of the diff file
    #[serde(default)]
    pub checksum: Option<String>,
}

impl PatchEntry {
    /// Effective patch name
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.target)
    }
}

fn default_true() -> bool {
    true
}

fn default_revision_file() -> String {
    DEFAULT_REVISION_FILE.to_string()
}

fn default_alias() -> String {
    DEFAULT_ALIAS.to_string()
}

fn default_extra_paths() -> String {
    DEFAULT_EXTRA_PATHS.to_string()
}

fn default_pth_file() -> String {
    DEFAULT_PTH_FILE.to_string()
}

fn default_launcher() -> String {
    DEFAULT_LAUNCHER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_plan_defaults() {
        let plan: PlanFile = toml::from_str(
            r#"
[prerequisite]
name = "setuptools"
version = "57.5.0"

[[package]]
name = "common"
path = "code/common"
"#,
        )
        .unwrap();

        assert_eq!(plan.provenance.output, DEFAULT_REVISION_FILE);
        assert_eq!(plan.environment.alias, "eggs");
        assert_eq!(plan.environment.launcher, "py");
        assert!(plan.packages[0].editable);
        assert!(plan.packages[0].rank.is_none());
        assert!(plan.patches.is_empty());
        assert!(plan.environment.pip_args.is_empty());
    }

    #[test]
    fn test_patch_entry_name_defaults_to_target() {
        let plan: PlanFile = toml::from_str(
            r#"
[prerequisite]
name = "setuptools"
version = "57.5.0"

[[patch]]
file = "patches/requests/models.py.diff"
target = "requests/models.py"
tolerant = true
"#,
        )
        .unwrap();

        let patch = &plan.patches[0];
        assert_eq!(patch.display_name(), "requests/models.py");
        assert_eq!(patch.strip, 0);
        assert!(patch.tolerant);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<PlanFile, _> = toml::from_str(
            r#"
[prerequisite]
name = "setuptools"
version = "57.5.0"
editable = true
"#,
        );
        assert!(result.is_err());
    }
}
