use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::python::PythonVersion;

const VENV_CONFIG: &str = "pyvenv.cfg";

#[cfg(windows)]
const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const BIN_DIR: &str = "bin";

#[cfg(windows)]
const EXE_SUFFIX: &str = ".exe";
#[cfg(not(windows))]
const EXE_SUFFIX: &str = "";

pub fn bin_dir(env_root: &Path) -> PathBuf {
    env_root.join(BIN_DIR)
}

/// Platform interpreter inside a managed environment.
pub fn interpreter_path(env_root: &Path) -> PathBuf {
    bin_dir(env_root).join(format!("python{EXE_SUFFIX}"))
}

pub fn installer_path(env_root: &Path) -> PathBuf {
    bin_dir(env_root).join(format!("pip{EXE_SUFFIX}"))
}

pub fn has_interpreter(env_root: &Path) -> bool {
    interpreter_path(env_root).is_file()
}

pub fn has_installer(env_root: &Path) -> bool {
    installer_path(env_root).is_file()
}

/// A directory holding both the interpreter and the installer.
pub fn is_managed_environment(env_root: &Path) -> bool {
    has_interpreter(env_root) && has_installer(env_root)
}

/// Interpreter version recorded in the environment's `pyvenv.cfg`.
///
/// `venv` writes `version = 3.11.4`; virtualenv writes `version_info`.
pub fn recorded_python_version(env_root: &Path) -> Option<PythonVersion> {
    let contents = fs::read_to_string(env_root.join(VENV_CONFIG)).ok()?;
    contents.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        match key.trim() {
            "version" | "version_info" => value.parse().ok(),
            _ => None,
        }
    })
}

/// Shell text that activates the environment at `env_root`.
pub fn activation_command(env_root: &Path) -> String {
    let script = bin_dir(env_root).join("activate");
    if cfg!(windows) {
        script.display().to_string()
    } else {
        format!("source {}", script.display())
    }
}

/// Canonical form of `path`. A path that does not exist yet is made absolute,
/// cleaned of `.` and `..`, and resolved through its deepest existing
/// ancestor, so it compares equal to the canonical form it will have once
/// created.
pub fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let normalized = normalize_lexically(&joined);

    let mut missing = Vec::new();
    let mut ancestor = normalized.as_path();
    let resolved = loop {
        if let Ok(canonical) = fs::canonicalize(ancestor) {
            break Some(canonical);
        }
        match (ancestor.parent(), ancestor.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                ancestor = parent;
            }
            _ => break None,
        }
    };
    match resolved {
        Some(base) => missing.iter().rev().fold(base, |acc, part| acc.join(part)),
        None => normalized,
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn managed_environment_needs_interpreter_and_installer() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("venv");
        assert!(!has_interpreter(&root));

        touch(&interpreter_path(&root));
        assert!(has_interpreter(&root));
        assert!(!is_managed_environment(&root));

        touch(&installer_path(&root));
        assert!(is_managed_environment(&root));
    }

    #[cfg(not(windows))]
    #[test]
    fn unix_layout_uses_bin() {
        let root = Path::new("/tmp/project/.venv");
        assert_eq!(interpreter_path(root), root.join("bin").join("python"));
        assert_eq!(
            activation_command(root),
            "source /tmp/project/.venv/bin/activate"
        );
    }

    #[test]
    fn reads_the_version_recorded_by_venv_and_virtualenv() {
        let temp = tempdir().unwrap();
        let venv = temp.path().join("venv");
        fs::create_dir_all(&venv).unwrap();
        assert_eq!(recorded_python_version(&venv), None);

        fs::write(
            venv.join("pyvenv.cfg"),
            "home = /usr/bin\ninclude-system-site-packages = false\nversion = 3.11.9\n",
        )
        .unwrap();
        assert_eq!(recorded_python_version(&venv), Some(PythonVersion::new(3, 11)));

        fs::write(venv.join("pyvenv.cfg"), "version_info = 3.9.18.final.0\n").unwrap();
        assert_eq!(recorded_python_version(&venv), Some(PythonVersion::new(3, 9)));
    }

    #[test]
    fn absolute_path_resolves_missing_relative_paths() {
        let resolved = absolute_path(Path::new("does-not-exist-yet"));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("does-not-exist-yet"));
    }

    #[test]
    fn missing_paths_resolve_through_existing_ancestors() {
        let temp = tempdir().unwrap();
        let project = temp.path().join("project");
        fs::create_dir_all(project.join("sub")).unwrap();
        let canonical = fs::canonicalize(&project).unwrap().join(".venv");

        assert_eq!(absolute_path(&project.join(".venv")), canonical);
        assert_eq!(absolute_path(&project.join("sub/../.venv")), canonical);
        assert_eq!(absolute_path(&project.join("./.venv")), canonical);
        assert_eq!(
            absolute_path(&project.join("gone/../.venv/nested")),
            canonical.join("nested")
        );
    }

    #[cfg(unix)]
    #[test]
    fn missing_paths_under_a_symlink_match_their_target() {
        let temp = tempdir().unwrap();
        let real = temp.path().join("real");
        fs::create_dir_all(&real).unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(
            absolute_path(&link.join(".venv")),
            absolute_path(&real.join(".venv"))
        );
    }
}
