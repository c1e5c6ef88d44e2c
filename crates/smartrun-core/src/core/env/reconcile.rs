use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};
use smartrun_domain::{absolute_path, activation_command, EnvState, EnvStateStore};
use tracing::debug;

use super::detector::ActiveEnvironment;
use crate::effects::EnvironmentDetector;

pub const DEFAULT_ENV_DIR: &str = ".venv";

/// Outcome of comparing the active, expected, and last-created environments.
#[derive(Clone, Debug, Serialize)]
pub struct EnvCheck {
    pub proceed: bool,
    pub active: ActiveEnvironment,
    pub expected: PathBuf,
    pub last_created: Option<EnvState>,
    #[serde(skip)]
    pub warning: Option<EnvWarning>,
}

impl EnvCheck {
    /// Path of the active environment when one is running.
    pub fn active_path(&self) -> Option<&Path> {
        self.active
            .path
            .as_deref()
            .filter(|_| self.active.active)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "proceed": self.proceed,
            "active": self.active,
            "expected": self.expected,
            "last_created": self.last_created,
            "warning": self.warning.as_ref().map(ToString::to_string),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvWarning {
    NoActiveEnvironment {
        expected: PathBuf,
        last_created: Option<EnvState>,
    },
    DifferentEnvironment {
        current_name: String,
        current_path: PathBuf,
        expected: PathBuf,
        last_created: EnvState,
    },
}

impl fmt::Display for EnvWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvWarning::NoActiveEnvironment {
                expected,
                last_created,
            } => {
                let name = env_name(expected);
                writeln!(f, "Virtual environment not detected.")?;
                writeln!(f)?;
                writeln!(
                    f,
                    "smartrun only installs packages into an active virtual environment, \
                     so your global Python stays untouched."
                )?;
                writeln!(f)?;
                match last_created {
                    Some(last) => {
                        writeln!(f, "Options:")?;
                        writeln!(
                            f,
                            "  1. Activate last created environment: {}",
                            activation_command(&last.path)
                        )?;
                        writeln!(f, "  2. Create new environment: smartrun env create {name}")?;
                        writeln!(f, "     Then activate: {}", activation_command(expected))?;
                    }
                    None => {
                        writeln!(f, "Quick setup:")?;
                        writeln!(
                            f,
                            "  1. Create virtual environment: smartrun env create {name}"
                        )?;
                        writeln!(
                            f,
                            "  2. Activate virtual environment: {}",
                            activation_command(expected)
                        )?;
                    }
                }
                writeln!(f)?;
                write!(f, "Then re-run your command.")
            }
            EnvWarning::DifferentEnvironment {
                current_name,
                current_path,
                expected,
                last_created,
            } => {
                writeln!(f, "Different environment detected!")?;
                writeln!(f)?;
                writeln!(f, "Current: {current_name} ({})", current_path.display())?;
                writeln!(f, "Expected: {} ({})", env_name(expected), expected.display())?;
                writeln!(
                    f,
                    "Last created: {} ({})",
                    last_created.name,
                    last_created.path.display()
                )?;
                writeln!(f)?;
                writeln!(f, "To switch environments:")?;
                writeln!(f, "  - Use expected: {}", activation_command(expected))?;
                writeln!(
                    f,
                    "  - Use last created: {}",
                    activation_command(&last_created.path)
                )?;
                writeln!(f)?;
                write!(f, "Continuing with current environment...")
            }
        }
    }
}

fn env_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || DEFAULT_ENV_DIR.to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// `<project>/<env>` for an explicit environment name or path, else
/// `<project>/.venv`.
pub fn expected_env_path(project_root: &Path, env: Option<&Path>) -> PathBuf {
    let env = env.unwrap_or_else(|| Path::new(DEFAULT_ENV_DIR));
    absolute_path(&project_root.join(env))
}

/// Decides whether work may proceed in the currently active environment.
///
/// A stale last-created record is discarded first, so it never shows up in
/// suggestions.
pub fn reconcile(
    detector: &dyn EnvironmentDetector,
    store: &EnvStateStore,
    expected: &Path,
) -> EnvCheck {
    store.clear_invalid();
    let active = detector.get();
    let expected = absolute_path(expected);
    let last_created = store.last_valid();

    let current_path = match active.path.as_deref() {
        Some(path) if active.active => absolute_path(path),
        _ => {
            debug!(expected = %expected.display(), "no active environment");
            let warning = EnvWarning::NoActiveEnvironment {
                expected: expected.clone(),
                last_created: last_created.clone(),
            };
            return EnvCheck {
                proceed: false,
                active,
                expected,
                last_created,
                warning: Some(warning),
            };
        }
    };

    let warning = if current_path == expected {
        None
    } else {
        match &last_created {
            Some(last) if absolute_path(&last.path) != current_path => {
                Some(EnvWarning::DifferentEnvironment {
                    current_name: active.name.clone(),
                    current_path,
                    expected: expected.clone(),
                    last_created: last.clone(),
                })
            }
            _ => None,
        }
    };

    EnvCheck {
        proceed: true,
        active,
        expected,
        last_created,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{active_venv, fake_env, FixedDetector};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn no_active_env_without_history_suggests_setup() {
        let temp = tempdir().unwrap();
        let store = EnvStateStore::for_project(temp.path());
        let detector = FixedDetector(ActiveEnvironment::system());
        let expected = expected_env_path(temp.path(), None);

        let check = reconcile(&detector, &store, &expected);
        assert!(!check.proceed);
        let text = check.warning.expect("warning").to_string();
        assert!(text.contains("Quick setup"));
        assert!(text.contains("smartrun env create .venv"));
        assert!(!text.contains("last created"));
    }

    #[test]
    fn no_active_env_mentions_last_created() {
        let temp = tempdir().unwrap();
        let store = EnvStateStore::for_project(temp.path());
        let last = temp.path().join("older");
        fake_env(&last);
        store.record_created("older", &last, "3.12.0", temp.path());

        let check = reconcile(
            &FixedDetector(ActiveEnvironment::system()),
            &store,
            &expected_env_path(temp.path(), None),
        );
        assert!(!check.proceed);
        let text = check.warning.unwrap().to_string();
        assert!(text.contains("Activate last created environment"));
        assert!(text.contains("older"));
    }

    #[test]
    fn stale_record_is_discarded_before_suggesting() {
        let temp = tempdir().unwrap();
        let store = EnvStateStore::for_project(temp.path());
        let gone = temp.path().join("gone");
        fake_env(&gone);
        store.record_created("gone", &gone, "3.12.0", temp.path());
        fs::remove_dir_all(&gone).unwrap();

        let check = reconcile(
            &FixedDetector(ActiveEnvironment::system()),
            &store,
            &expected_env_path(temp.path(), None),
        );
        assert!(check.last_created.is_none());
        assert!(!check.warning.unwrap().to_string().contains("gone"));
        assert!(!store.state_file().exists());
    }

    #[test]
    fn expected_environment_proceeds_silently() {
        let temp = tempdir().unwrap();
        let expected = temp.path().join(".venv");
        fake_env(&expected);
        let store = EnvStateStore::for_project(temp.path());

        let check = reconcile(&FixedDetector(active_venv(&expected)), &store, &expected);
        assert!(check.proceed);
        assert!(check.warning.is_none());
        assert_eq!(check.active_path(), Some(expected.as_path()));
    }

    #[test]
    fn last_created_environment_proceeds_silently() {
        let temp = tempdir().unwrap();
        let last = temp.path().join("work-env");
        fake_env(&last);
        let store = EnvStateStore::for_project(temp.path());
        store.record_created("work-env", &last, "3.12.0", temp.path());

        let check = reconcile(
            &FixedDetector(active_venv(&last)),
            &store,
            &expected_env_path(temp.path(), None),
        );
        assert!(check.proceed);
        assert!(check.warning.is_none());
    }

    #[test]
    fn unrelated_environment_proceeds_with_warning() {
        let temp = tempdir().unwrap();
        let last = temp.path().join("last");
        let other = temp.path().join("elsewhere");
        fake_env(&last);
        fake_env(&other);
        let store = EnvStateStore::for_project(temp.path());
        store.record_created("last", &last, "3.12.0", temp.path());

        let check = reconcile(
            &FixedDetector(active_venv(&other)),
            &store,
            &expected_env_path(temp.path(), None),
        );
        assert!(check.proceed);
        let text = check.warning.unwrap().to_string();
        assert!(text.contains("Current: elsewhere"));
        assert!(text.contains("Expected: .venv"));
        assert!(text.contains("Last created: last"));
    }

    #[test]
    fn unrelated_environment_without_history_proceeds_silently() {
        let temp = tempdir().unwrap();
        let other = temp.path().join("elsewhere");
        fake_env(&other);
        let store = EnvStateStore::for_project(temp.path());

        let check = reconcile(
            &FixedDetector(active_venv(&other)),
            &store,
            &expected_env_path(temp.path(), None),
        );
        assert!(check.proceed);
        assert!(check.warning.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn missing_paths_are_compared_in_the_same_form() {
        let temp = tempdir().unwrap();
        let real = temp.path().join("real");
        fs::create_dir_all(real.join("sub")).unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let store = EnvStateStore::for_project(&real);

        // The environment directory is gone but still named by the activation.
        let check = reconcile(
            &FixedDetector(active_venv(&link.join(".venv"))),
            &store,
            &real.join("sub/../.venv"),
        );
        assert!(check.proceed);
        assert!(check.warning.is_none());
        assert_eq!(check.expected, absolute_path(&link.join(".venv")));
    }
}
