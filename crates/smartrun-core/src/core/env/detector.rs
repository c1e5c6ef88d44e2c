use std::path::PathBuf;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    Conda,
    VirtualEnv,
    System,
}

impl EnvironmentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentKind::Conda => "conda",
            EnvironmentKind::VirtualEnv => "virtual_env",
            EnvironmentKind::System => "system",
        }
    }
}

/// The interpreter environment the caller is running inside.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActiveEnvironment {
    pub active: bool,
    pub kind: EnvironmentKind,
    pub name: String,
    pub path: Option<PathBuf>,
}

impl ActiveEnvironment {
    #[must_use]
    pub fn system() -> Self {
        Self {
            active: false,
            kind: EnvironmentKind::System,
            name: "system".to_string(),
            path: None,
        }
    }
}

/// Classifies the environment from activation variables: conda first, then a
/// plain virtual environment, otherwise the system interpreter.
pub fn detect_active(lookup: impl Fn(&str) -> Option<String>) -> ActiveEnvironment {
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let virtual_env = non_empty("VIRTUAL_ENV");
    if let Some(name) = non_empty("CONDA_DEFAULT_ENV") {
        return ActiveEnvironment {
            active: true,
            kind: EnvironmentKind::Conda,
            name,
            path: non_empty("CONDA_PREFIX").or(virtual_env).map(PathBuf::from),
        };
    }
    if let Some(path) = virtual_env {
        let path = PathBuf::from(path);
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        return ActiveEnvironment {
            active: true,
            kind: EnvironmentKind::VirtualEnv,
            name,
            path: Some(path),
        };
    }
    ActiveEnvironment::system()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn detect(pairs: &[(&str, &str)]) -> ActiveEnvironment {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        detect_active(|key| vars.get(key).cloned())
    }

    #[test]
    fn conda_takes_priority() {
        let env = detect(&[
            ("CONDA_DEFAULT_ENV", "ml"),
            ("CONDA_PREFIX", "/opt/conda/envs/ml"),
            ("VIRTUAL_ENV", "/work/.venv"),
        ]);
        assert_eq!(env.kind, EnvironmentKind::Conda);
        assert_eq!(env.name, "ml");
        assert_eq!(env.path, Some(PathBuf::from("/opt/conda/envs/ml")));
    }

    #[test]
    fn virtual_env_is_named_after_its_directory() {
        let env = detect(&[("VIRTUAL_ENV", "/work/project/.venv")]);
        assert!(env.active);
        assert_eq!(env.kind, EnvironmentKind::VirtualEnv);
        assert_eq!(env.name, ".venv");
    }

    #[test]
    fn nothing_active_reports_system() {
        let env = detect(&[("VIRTUAL_ENV", "  ")]);
        assert_eq!(env, ActiveEnvironment::system());
    }
}
