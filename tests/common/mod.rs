// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use patchbay::plan::{PackageSpec, Requirement, RequirementsManifest};
use patchbay::{Environment, PackageManager, ProvisioningPlan, Result, RevisionSource, load_plan};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Content of `libx/mod.py` before any patch
pub const LIBX_ORIGINAL: &str = "x = 1\ny = 1\n";

/// Changes `x = 1` to `x = 2` in `libx/mod.py`
pub const FIX_X: &str = "\
--- a/libx/mod.py
+++ b/libx/mod.py
@@ -1,2 +1,2 @@
-x = 1
+x = 2
 y = 1
";

/// Changes `y = 1` to `y = 2`, written against the file after `FIX_X`
pub const FIX_Y: &str = "\
--- a/libx/mod.py
+++ b/libx/mod.py
@@ -1,2 +1,2 @@
 x = 2
-y = 1
+y = 2
";

/// Written against a version of `libx/mod.py` that was never installed
pub const STALE: &str = "\
--- a/libx/mod.py
+++ b/libx/mod.py
@@ -1,2 +1,2 @@
 x = 1
-z = 1
+z = 2
";

/// Package manager that records calls and marks packages as installed
///
/// A local package install writes `<site-packages>/<name>.egg-link`, the
/// file an editable install leaves behind.
#[derive(Default)]
pub struct FakeManager {
    pub calls: RefCell<Vec<String>>,
    pub fail_on: Option<String>,
    pub fail_prerequisite: bool,
    pub fail_manifest: bool,
}

impl FakeManager {
    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_prerequisite() -> Self {
        Self {
            fail_prerequisite: true,
            ..Default::default()
        }
    }

    pub fn failing_manifest() -> Self {
        Self {
            fail_manifest: true,
            ..Default::default()
        }
    }

    /// Names of local packages attempted, in order
    pub fn local_attempts(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| c.strip_prefix("local:").map(str::to_string))
            .collect()
    }
}

impl PackageManager for FakeManager {
    fn install_pinned(&self, _env: &Environment, requirement: &Requirement) -> Result<()> {
        self.calls.borrow_mut().push(format!("pinned:{}", requirement));
        if self.fail_prerequisite {
            return Err(patchbay::Error::CommandFailed(format!(
                "No matching distribution found for {}",
                requirement
            )));
        }
        Ok(())
    }

    fn install_manifest(&self, _env: &Environment, manifest: &RequirementsManifest) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("manifest:{}", manifest.len()));
        if self.fail_manifest {
            return Err(patchbay::Error::CommandFailed(
                "pip install -r exited with exit status: 1".to_string(),
            ));
        }
        Ok(())
    }

    fn install_local(&self, env: &Environment, package: &PackageSpec) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("local:{}", package.name));
        if self.fail_on.as_deref() == Some(package.name.as_str()) {
            return Err(patchbay::Error::CommandFailed(
                "pip install exited with exit status: 1".to_string(),
            ));
        }
        std::fs::write(
            env.site_packages.join(format!("{}.egg-link", package.name)),
            package.path.to_string_lossy().as_bytes(),
        )?;
        Ok(())
    }
}

/// Revision source returning a fixed id
pub struct StaticRevision(pub &'static str);

impl RevisionSource for StaticRevision {
    fn current_revision(&self, _vcs_root: &Path) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Revision source for a checkout without history
pub struct NoHistory;

impl RevisionSource for NoHistory {
    fn current_revision(&self, vcs_root: &Path) -> Result<String> {
        Err(patchbay::Error::VcsUnavailable(format!(
            "{} has no commits",
            vcs_root.display()
        )))
    }
}

/// A provisioning root and an environment in one temp directory
///
/// Layout:
/// - `root/`: plan, `code/<package>/`, `patches/`
/// - `venv/`: `bin/python`, `lib/python3.11/site-packages/libx/mod.py`
pub struct Fixture {
    pub dir: TempDir,
    packages: Vec<String>,
    patches: Vec<String>,
    extra: String,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Self {
            dir,
            packages: Vec::new(),
            patches: Vec::new(),
            extra: String::new(),
        };

        std::fs::create_dir_all(fixture.root().join("patches")).unwrap();
        std::fs::create_dir_all(fixture.venv().join("bin")).unwrap();
        std::fs::write(fixture.venv().join("bin/python"), "").unwrap();
        std::fs::create_dir_all(fixture.site_packages().join("libx")).unwrap();
        std::fs::write(fixture.libx(), LIBX_ORIGINAL).unwrap();
        fixture
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    pub fn venv(&self) -> PathBuf {
        self.dir.path().join("venv")
    }

    pub fn site_packages(&self) -> PathBuf {
        self.venv().join("lib/python3.11/site-packages")
    }

    pub fn libx(&self) -> PathBuf {
        self.site_packages().join("libx/mod.py")
    }

    pub fn read_libx(&self) -> String {
        std::fs::read_to_string(self.libx()).unwrap()
    }

    /// Whether the fake manager installed a package
    pub fn importable(&self, name: &str) -> bool {
        self.site_packages()
            .join(format!("{}.egg-link", name))
            .is_file()
    }

    /// Declare a local package and create its directory
    pub fn package(mut self, name: &str, rank: u32) -> Self {
        std::fs::create_dir_all(self.root().join("code").join(name)).unwrap();
        self.packages.push(format!(
            "[[package]]\nname = \"{}\"\npath = \"code/{}\"\nrank = {}\n",
            name, name, rank
        ));
        self
    }

    /// Declare a patch against `libx/mod.py` and write its diff file
    pub fn patch(mut self, name: &str, diff: &str, tolerant: bool) -> Self {
        let file = format!("patches/{}.diff", name);
        std::fs::write(self.root().join(&file), diff).unwrap();
        self.patches.push(format!(
            "[[patch]]\nname = \"{}\"\nfile = \"{}\"\ntarget = \"libx/mod.py\"\nstrip = 1\ntolerant = {}\n",
            name, file, tolerant
        ));
        self
    }

    /// Write a `requirements.txt` at the root
    pub fn requirements(self, content: &str) -> Self {
        std::fs::write(self.root().join("requirements.txt"), content).unwrap();
        self
    }

    /// Extra TOML appended before packages and patches
    pub fn with_toml(mut self, toml: &str) -> Self {
        self.extra.push_str(toml);
        self.extra.push('\n');
        self
    }

    /// Write `provision.toml` and load it
    pub fn plan(&self) -> ProvisioningPlan {
        let mut content = String::from("[prerequisite]\nname = \"setuptools\"\nversion = \"57.5.0\"\n\n");
        content.push_str(&self.extra);
        for package in &self.packages {
            content.push_str(package);
            content.push('\n');
        }
        for patch in &self.patches {
            content.push_str(patch);
            content.push('\n');
        }

        let path = self.root().join("provision.toml");
        std::fs::write(&path, content).unwrap();
        let (plan, _warnings) = load_plan(&path).unwrap();
        plan
    }

    pub fn env(&self) -> Environment {
        Environment::discover(&self.venv(), None).unwrap()
    }
}
