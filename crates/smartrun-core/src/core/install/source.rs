use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use smartrun_domain::{
    resolve_specs_checked, split_name_list, RejectedSpec, RequirementSet, ScanError, Scanner,
};

/// Where the packages to install come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstallSource {
    /// A script or notebook to scan for imports.
    Script(PathBuf),
    /// Specs given directly, e.g. `pandas==2.0, cv2 rich`.
    Specs(Vec<String>),
    /// A pip-style requirements file.
    RequirementsFile(PathBuf),
    /// A JSON array of specs or an object mapping names to versions.
    JsonFile(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum InstallSourceError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not valid JSON", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} must hold an array of specs or an object of name/version pairs", path.display())]
    Shape { path: PathBuf },
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl InstallSource {
    /// Interprets a command-line argument relative to `base`.
    pub fn classify(raw: &str, base: &Path) -> Self {
        let trimmed = raw.trim();
        let candidate = base.join(trimmed);
        let extension = candidate
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => InstallSource::JsonFile(candidate),
            Some("txt") => InstallSource::RequirementsFile(candidate),
            Some("py" | "ipynb") => InstallSource::Script(candidate),
            _ => InstallSource::Specs(split_name_list(trimmed)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InstallSource::Script(_) => "script",
            InstallSource::Specs(_) => "specs",
            InstallSource::RequirementsFile(_) => "requirements",
            InstallSource::JsonFile(_) => "json",
        }
    }

    /// Collects the requirements this source names. Entries that do not
    /// parse come back in [`ResolvedSource::rejected`] rather than vanishing.
    pub fn requirements(&self, scanner: &Scanner) -> Result<ResolvedSource, InstallSourceError> {
        match self {
            InstallSource::Script(path) => Ok(ResolvedSource {
                set: scanner.scan_path(path)?,
                rejected: Vec::new(),
            }),
            InstallSource::Specs(specs) => Ok(ResolvedSource::from_specs(specs)),
            InstallSource::RequirementsFile(path) => {
                let contents = read(path)?;
                Ok(ResolvedSource::from_specs(&requirement_lines(&contents)))
            }
            InstallSource::JsonFile(path) => {
                let contents = read(path)?;
                let value: Value =
                    serde_json::from_str(&contents).map_err(|source| InstallSourceError::Json {
                        path: path.clone(),
                        source,
                    })?;
                let specs = json_specs(&value).ok_or_else(|| InstallSourceError::Shape {
                    path: path.clone(),
                })?;
                Ok(ResolvedSource::from_specs(&specs))
            }
        }
    }
}

/// Requirements named by an install source.
#[derive(Clone, Debug, Default)]
pub struct ResolvedSource {
    pub set: RequirementSet,
    pub rejected: Vec<RejectedSpec>,
}

impl ResolvedSource {
    fn from_specs<S: AsRef<str>>(specs: &[S]) -> Self {
        let (set, rejected) = resolve_specs_checked(specs);
        Self { set, rejected }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.rejected.is_empty()
    }
}

fn read(path: &Path) -> Result<String, InstallSourceError> {
    fs::read_to_string(path).map_err(|source| InstallSourceError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Requirement lines without comments, blanks, or pip options. Per-line
/// options such as `--hash=...` are cut off; markers after `;` are kept.
fn requirement_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split(" #").next().unwrap_or_default())
        .map(|line| line.split(" --").next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty() && !line.starts_with(['-', '#']))
        .map(ToOwned::to_owned)
        .collect()
}

fn json_specs(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(ToOwned::to_owned))
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(name, version)| match version {
                Value::Null => Some(name.clone()),
                Value::String(version) => Some(pin(name, version)),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn pin(name: &str, version: &str) -> String {
    let version = version.trim();
    if version.is_empty() || version == "*" {
        name.to_string()
    } else if version.starts_with(['=', '!', '<', '>', '~']) {
        format!("{name}{version}")
    } else {
        format!("{name}=={version}")
    }
}
