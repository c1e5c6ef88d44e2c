//! Import discovery: turns Python source text into a [`RequirementSet`].

mod directives;
mod imports;
mod lexer;
mod stdlib;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::notebook;
use crate::package::{
    distribution_for, normalize_distribution_name, PackageName, RequirementOrigin,
    RequirementSet, SpecError,
};
use crate::python::PythonVersion;

pub use stdlib::is_stdlib;

/// Lines searched on either side of an import for an inline directive.
pub const DEFAULT_DIRECTIVE_RADIUS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not valid UTF-8", path.display())]
    Decode { path: PathBuf },
    #[error("failed to parse notebook {}", path.display())]
    Notebook {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub exclude: Vec<String>,
    pub include: Option<Vec<String>>,
    pub python: PythonVersion,
    pub directive_radius: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            include: None,
            python: PythonVersion::DEFAULT,
            directive_radius: DEFAULT_DIRECTIVE_RADIUS,
        }
    }
}

impl ScanOptions {
    #[must_use]
    pub fn with_exclude(mut self, raw: Option<&str>) -> Self {
        self.exclude = raw.map(split_name_list).unwrap_or_default();
        self
    }

    #[must_use]
    pub fn with_include(mut self, raw: Option<&str>) -> Self {
        self.include = raw.map(split_name_list).filter(|names| !names.is_empty());
        self
    }

    #[must_use]
    pub fn with_python(mut self, python: PythonVersion) -> Self {
        self.python = python;
        self
    }

    fn is_included(&self, name: &str) -> bool {
        self.include
            .as_ref()
            .is_some_and(|names| matches_any(names, name))
    }
}

/// Splits a user-supplied list on commas, semicolons and whitespace.
///
/// Fragments that continue a version constraint stay attached to their
/// requirement, so `numpy>=1.20,<2.0 rich` yields two entries.
#[must_use]
pub fn split_name_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (group_idx, group) in raw.split([',', ';']).enumerate() {
        for (word_idx, word) in group.split_whitespace().enumerate() {
            let after_separator = group_idx > 0 && word_idx == 0;
            match names.last_mut() {
                Some(previous) if !after_separator && previous.ends_with(OPERATOR_CHARS) => {
                    previous.push_str(word);
                }
                Some(previous) if word.starts_with(OPERATOR_CHARS) => {
                    if previous.contains(OPERATOR_CHARS) && !previous.ends_with(OPERATOR_CHARS) {
                        previous.push(',');
                    }
                    previous.push_str(word);
                }
                _ => names.push(word.to_string()),
            }
        }
    }
    names
}

const OPERATOR_CHARS: [char; 5] = ['=', '!', '<', '>', '~'];

#[derive(Clone, Debug, Default)]
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Reads a script or notebook and scans it.
    pub fn scan_path(&self, path: &Path) -> Result<RequirementSet, ScanError> {
        let source = read_source(path)?;
        Ok(self.scan(&source))
    }

    #[must_use]
    pub fn scan(&self, source: &str) -> RequirementSet {
        let lines = lexer::lex_source(source);
        let imports = imports::find_imports(&lines);
        let inline = directives::inline_directives(&lines);
        let radius = self.options.directive_radius;

        let mut set = RequirementSet::new();
        let mut associated = vec![false; inline.len()];

        for import in &imports {
            let module = import.module.as_str();
            let included = self.options.is_included(module);
            let stdlib = is_stdlib(module, self.options.python);

            let window: Vec<usize> = inline
                .iter()
                .enumerate()
                .filter(|(_, directive)| directive.line.abs_diff(import.line) <= radius)
                .map(|(idx, _)| idx)
                .collect();
            for idx in &window {
                associated[*idx] = true;
            }

            if stdlib && !included {
                continue;
            }

            let resolved = PackageName::from_import(module, distribution_for(module));
            let mut nearest = window.clone();
            nearest.sort_by_key(|idx| inline[*idx].line.abs_diff(import.line));

            let matched = nearest.iter().find_map(|idx| {
                inline[*idx].specs.iter().find(|spec| {
                    **spec == resolved || spec.key() == normalize_distribution_name(module)
                })
            });
            let same_line_override = || {
                nearest
                    .iter()
                    .map(|idx| &inline[*idx])
                    .find(|directive| directive.line == import.line && directive.specs.len() == 1)
                    .map(|directive| &directive.specs[0])
            };

            match matched.or_else(same_line_override) {
                Some(spec) => {
                    set.insert(
                        spec.clone().with_importable_name(module),
                        RequirementOrigin::Inline,
                    );
                }
                None => {
                    set.insert(resolved, RequirementOrigin::Import);
                }
            }
        }

        for (directive, used) in inline.iter().zip(&associated) {
            if !used {
                debug!(
                    line = directive.line + 1,
                    radius, "ignoring directive with no import in range"
                );
                continue;
            }
            for spec in &directive.specs {
                if !self.is_dropped_stdlib(spec) {
                    set.insert(spec.clone(), RequirementOrigin::Inline);
                }
            }
        }

        for spec in directives::block_requirements(source) {
            if !self.is_dropped_stdlib(&spec) {
                set.insert(spec, RequirementOrigin::Block);
            }
        }

        self.apply_filters(&mut set);
        set
    }

    /// Directive entries naming a standard-library module are dropped like
    /// the imports themselves, unless explicitly included.
    fn is_dropped_stdlib(&self, spec: &PackageName) -> bool {
        let name = spec.importable_name();
        let dropped = is_stdlib(name, self.options.python) && !self.options.is_included(name);
        if dropped {
            debug!(spec = %spec, python = %self.options.python, "dropping stdlib directive entry");
        }
        dropped
    }

    fn apply_filters(&self, set: &mut RequirementSet) {
        if !self.options.exclude.is_empty() {
            let exclude = &self.options.exclude;
            set.retain(|requirement| {
                !(matches_any(exclude, requirement.package.distribution_name())
                    || matches_any(exclude, requirement.package.importable_name()))
            });
        }
        if let Some(include) = &self.options.include {
            set.retain(|requirement| {
                matches_any(include, requirement.package.distribution_name())
                    || matches_any(include, requirement.package.importable_name())
            });
        }
    }
}

/// A requirement string that could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedSpec {
    pub spec: String,
    pub error: SpecError,
}

/// Parses explicit requirement specs given on the command line or in a
/// manifest. Bare import names with a known distribution are translated, so
/// `cv2>=4` installs `opencv-python>=4`. Malformed entries are skipped.
#[must_use]
pub fn resolve_specs<S: AsRef<str>>(items: &[S]) -> RequirementSet {
    let (set, rejected) = resolve_specs_checked(items);
    for RejectedSpec { spec, error } in rejected {
        debug!(%error, %spec, "skipping malformed requirement");
    }
    set
}

/// Like [`resolve_specs`], but hands back the entries it could not parse.
#[must_use]
pub fn resolve_specs_checked<S: AsRef<str>>(items: &[S]) -> (RequirementSet, Vec<RejectedSpec>) {
    let mut set = RequirementSet::new();
    let mut rejected = Vec::new();
    for item in items {
        let raw = item.as_ref().trim();
        match PackageName::parse(raw) {
            Ok(spec) => {
                let importable = spec.distribution_name().to_string();
                let resolved = match crate::package::known_mapping(&importable) {
                    Some(distribution) => spec
                        .with_distribution_name(distribution)
                        .with_importable_name(&importable),
                    None => spec,
                };
                set.insert(resolved, RequirementOrigin::Inline);
            }
            Err(error) => rejected.push(RejectedSpec {
                spec: raw.to_string(),
                error,
            }),
        }
    }
    (set, rejected)
}

fn matches_any(names: &[String], candidate: &str) -> bool {
    names.iter().any(|name| name.eq_ignore_ascii_case(candidate))
}

/// Reads source text, extracting code cells when `path` is a notebook.
pub fn read_source(path: &Path) -> Result<String, ScanError> {
    let bytes = fs::read(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| ScanError::Decode {
        path: path.to_path_buf(),
    })?;
    if notebook::is_notebook(path) {
        return notebook::code_cells(&text).map_err(|source| ScanError::Notebook {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(set: &RequirementSet) -> Vec<String> {
        set.to_specs()
    }

    #[test]
    fn empty_source_yields_empty_set() {
        assert!(Scanner::default().scan("").is_empty());
        assert!(Scanner::default()
            .scan("x = 1\nprint('import numpy')\n# just a note\n")
            .is_empty());
    }

    #[test]
    fn resolves_known_mappings_and_drops_stdlib() {
        let source = "import numpy\nimport pandas as pd\nfrom sklearn import linear_model\nimport os, sys\n";
        assert_eq!(
            specs(&Scanner::default().scan(source)),
            vec!["numpy", "pandas", "scikit-learn"]
        );
    }

    #[test]
    fn directive_above_import_sets_predicate() {
        let set = Scanner::default().scan("#smartrun: pandas<=2.3.0\nimport pandas\n");
        let pandas = set.get("pandas").expect("pandas present");
        assert_eq!(pandas.version_predicate().unwrap().to_string(), "<=2.3.0");
        assert_eq!(pandas.importable_name(), "pandas");
    }

    #[test]
    fn directive_matches_through_known_mapping() {
        let set = Scanner::default().scan("from sklearn import svm  # requires: scikit-learn==1.3.0\n");
        assert_eq!(specs(&set), vec!["scikit-learn==1.3.0"]);
        assert_eq!(set.get("scikit-learn").unwrap().importable_name(), "sklearn");
    }

    #[test]
    fn same_line_single_spec_renames_the_import() {
        let set = Scanner::default().scan("import cv2  # smartrun: opencv-python-headless\n");
        assert_eq!(specs(&set), vec!["opencv-python-headless"]);
    }

    #[test]
    fn multi_spec_directive_adds_neighbours() {
        let source = "# smartrun: pandas==1.3.0, matplotlib>=3.0.0\nfrom pandas import DataFrame\n";
        assert_eq!(
            specs(&Scanner::default().scan(source)),
            vec!["pandas==1.3.0", "matplotlib>=3.0.0"]
        );
    }

    #[test]
    fn directives_outside_radius_are_ignored() {
        let source = "# smartrun: pandas==1.0\n\n\n\n\nimport pandas\n";
        let set = Scanner::default().scan(source);
        assert_eq!(specs(&set), vec!["pandas"]);

        let only_directive = Scanner::default().scan("# smartrun: requests\nx = 1\n");
        assert!(only_directive.is_empty());
    }

    #[test]
    fn radius_is_configurable() {
        let source = "# smartrun: pandas==1.0\n\n\n\n\nimport pandas\n";
        let scanner = Scanner::new(ScanOptions {
            directive_radius: 5,
            ..ScanOptions::default()
        });
        assert_eq!(specs(&scanner.scan(source)), vec!["pandas==1.0"]);
    }

    #[test]
    fn block_directives_add_requirements() {
        let source = "\"\"\"\nsmartrun-requirements:\nrequests==2.25.1\nbeautifulsoup4\n\"\"\"\nimport numpy\n";
        assert_eq!(
            specs(&Scanner::default().scan(source)),
            vec!["numpy", "requests==2.25.1", "beautifulsoup4"]
        );
    }

    #[test]
    fn block_directive_overrides_plain_import() {
        let source = "# smartrun-requirements:\n# numpy==1.26.4\nimport numpy\n";
        assert_eq!(specs(&Scanner::default().scan(source)), vec!["numpy==1.26.4"]);
    }

    #[test]
    fn inline_directive_beats_block_directive() {
        let source = "'''\nsmartrun-requirements:\nrequests==2.25.1\n'''\n\n\n\nimport requests  # smartrun: requests==2.31.0\n";
        assert_eq!(specs(&Scanner::default().scan(source)), vec!["requests==2.31.0"]);
    }

    #[test]
    fn exclude_removes_every_reference() {
        let source = "import pandas\nfrom pandas import DataFrame\nimport numpy\n";
        let scanner = Scanner::new(ScanOptions::default().with_exclude(Some("PANDAS")));
        assert_eq!(specs(&scanner.scan(source)), vec!["numpy"]);
    }

    #[test]
    fn exclude_matches_import_name_too() {
        let scanner = Scanner::new(ScanOptions::default().with_exclude(Some("sklearn; cv2")));
        let set = scanner.scan("import sklearn\nimport cv2\nimport rich\n");
        assert_eq!(specs(&set), vec!["rich"]);
    }

    #[test]
    fn include_restricts_and_bypasses_stdlib() {
        let source = "import os\nimport numpy\nimport pandas\n";
        let scanner = Scanner::new(ScanOptions::default().with_include(Some("os, numpy")));
        assert_eq!(specs(&scanner.scan(source)), vec!["os", "numpy"]);
    }

    #[test]
    fn split_name_list_accepts_mixed_separators() {
        assert_eq!(
            split_name_list(" pandas,rich;nbformat  numpy "),
            vec!["pandas", "rich", "nbformat", "numpy"]
        );
        assert!(split_name_list(" , ; ").is_empty());
    }

    #[test]
    fn split_name_list_keeps_constraint_clauses_together() {
        assert_eq!(
            split_name_list("numpy>=1.20,<2.0 rich, scipy >= 1.6"),
            vec!["numpy>=1.20,<2.0", "rich", "scipy>=1.6"]
        );
        assert_eq!(split_name_list("ok==1, bad==, also-ok"), vec!["ok==1", "bad==", "also-ok"]);
    }

    #[test]
    fn checked_resolution_keeps_constraints_markers_and_rejects() {
        let (set, rejected) = resolve_specs_checked(&[
            "numpy>=1.20,<2.0",
            "pandas==2.0; python_version >= '3.9'",
            "bad==",
        ]);
        assert_eq!(
            specs(&set),
            vec!["numpy>=1.20,<2.0", "pandas==2.0; python_version >= '3.9'"]
        );
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].spec, "bad==");
        assert!(matches!(rejected[0].error, SpecError::InvalidVersion { .. }));
    }

    #[test]
    fn directives_naming_stdlib_modules_are_dropped() {
        let source = "import os  # smartrun: os\nimport sqlite3  # smartrun: pysqlite3\n";
        assert_eq!(specs(&Scanner::default().scan(source)), vec!["pysqlite3"]);

        let block = "\"\"\"\nsmartrun-requirements:\njson\nrich\n\"\"\"\n";
        assert_eq!(specs(&Scanner::default().scan(block)), vec!["rich"]);

        let included = Scanner::new(ScanOptions::default().with_include(Some("os")));
        assert_eq!(specs(&included.scan("import os  # smartrun: os\n")), vec!["os"]);
    }

    #[test]
    fn resolve_specs_translates_import_names() {
        let set = resolve_specs(&["cv2>=4", "sklearn", "yaml", "rich==13.0", "bad=="]);
        assert_eq!(
            specs(&set),
            vec!["opencv-python>=4", "scikit-learn", "PyYAML", "rich==13.0"]
        );
    }

    #[test]
    fn read_source_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.py");
        fs::write(&path, [0x69, 0x6d, 0xff, 0xfe]).expect("write");
        let err = Scanner::default().scan_path(&path).unwrap_err();
        assert!(matches!(err, ScanError::Decode { .. }));

        let missing = Scanner::default()
            .scan_path(&dir.path().join("missing.py"))
            .unwrap_err();
        assert!(matches!(missing, ScanError::Read { .. }));
    }
}
