// src/plan/requirements.rs

//! Pinned requirements (`name==version`)

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single pinned requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: String,
    pub version: String,
}

impl Requirement {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse a `name==version` specifier
    ///
    /// Extras (`name[extra]==1.0`) are kept as part of the name. Anything
    /// other than an exact pin is rejected: versions are resolved before a
    /// plan is written, never during provisioning.
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, version) = spec.split_once("==").ok_or_else(|| {
            Error::ParseError(format!("Requirement '{}' is not pinned with ==", spec))
        })?;

        let name = name.trim();
        let version = version.trim();
        // Environment markers are not supported
        if name.is_empty() || version.is_empty() || version.contains(';') || version.contains('=')
        {
            return Err(Error::ParseError(format!(
                "Invalid pinned requirement: '{}'",
                spec
            )));
        }

        Ok(Self::new(name, version))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// A requirements manifest, in file order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequirementsManifest {
    /// Manifest location; `None` when the plan has no manifest
    pub path: Option<PathBuf>,
    pub requirements: Vec<Requirement>,
}

impl RequirementsManifest {
    /// A manifest with nothing to install
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse manifest content; blank lines and `#` comments are ignored
    pub fn parse(content: &str) -> Result<Vec<Requirement>> {
        let mut requirements = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = match raw.split_once('#') {
                Some((before, _)) => before.trim(),
                None => raw.trim(),
            };
            if line.is_empty() {
                continue;
            }
            let requirement = Requirement::parse(line)
                .map_err(|e| Error::ParseError(format!("line {}: {}", idx + 1, e)))?;
            requirements.push(requirement);
        }

        Ok(requirements)
    }

    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!(
                "Failed to read requirements manifest {}: {}",
                path.display(),
                e
            ))
        })?;

        let requirements = Self::parse(&content)
            .map_err(|e| Error::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            requirements,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }
}
