// src/launcher.rs

//! Interpreter launcher
//!
//! A symlink to the interpreter would report the interpreter's own name as
//! `argv[0]`. The launcher is a small shell script that re-executes the
//! environment's interpreter with `exec -a "$0"`, so programs see the name
//! they were invoked under.

use crate::environment::Environment;
use crate::error::Result;
use crate::filesystem::write_atomic;
use std::path::PathBuf;
use tracing::info;

/// Launcher script content for an interpreter path
pub fn launcher_script(python: &std::path::Path) -> String {
    let quoted = python.to_string_lossy().replace('\'', r"'\''");
    format!("#!/usr/bin/env bash\nexec -a \"$0\" '{}' \"$@\"\n", quoted)
}

/// Write the launcher `name` into the environment's binary directory
pub fn write_launcher(env: &Environment, name: &str) -> Result<PathBuf> {
    let path = env.bin_dir.join(name);
    write_atomic(&path, launcher_script(&env.python).as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    info!("Wrote launcher {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_script_forwards_arguments_and_name() {
        let script = launcher_script(Path::new("/srv/venv/bin/python"));
        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains("exec -a \"$0\" '/srv/venv/bin/python' \"$@\""));
    }

    #[test]
    fn test_quotes_in_path_are_escaped() {
        let script = launcher_script(Path::new("/srv/o'brien/bin/python"));
        assert!(script.contains(r"'/srv/o'\''brien/bin/python'"));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_launcher_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let env = Environment::with_layout(dir.path(), &bin, &dir.path().join("site"));

        let path = write_launcher(&env, "py").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert!(std::fs::read_to_string(&path).unwrap().contains("exec -a"));
    }
}
