use std::path::PathBuf;

use anyhow::Result;
use serde_json::{json, Value};
use smartrun_domain::{PythonVersion, RequirementSet, ScanOptions, Scanner};

use crate::tooling::{script_not_found_outcome, unreadable_source_outcome};
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug, Default)]
pub struct ScanRequest {
    pub path: PathBuf,
    pub exclude: Option<String>,
    pub include: Option<String>,
    pub python: Option<PythonVersion>,
}

pub(crate) fn scanner_for(
    exclude: Option<&str>,
    include: Option<&str>,
    python: Option<PythonVersion>,
) -> Scanner {
    let options = ScanOptions::default()
        .with_exclude(exclude)
        .with_include(include)
        .with_python(python.unwrap_or_default());
    Scanner::new(options)
}

pub(crate) fn requirements_to_json(set: &RequirementSet) -> Value {
    Value::Array(
        set.iter()
            .map(|requirement| {
                let package = &requirement.package;
                json!({
                    "import": package.importable_name(),
                    "distribution": package.distribution_name(),
                    "spec": package.to_string(),
                    "origin": requirement.origin.as_str(),
                })
            })
            .collect(),
    )
}

/// Lists the third-party requirements of a script or notebook.
///
/// # Errors
/// Never fails; unreadable input becomes a user-error outcome.
pub fn scan(ctx: &CommandContext, request: &ScanRequest) -> Result<ExecutionOutcome> {
    let path = ctx.project_root().join(&request.path);
    if !path.is_file() {
        return Ok(script_not_found_outcome(&path));
    }
    let scanner = scanner_for(
        request.exclude.as_deref(),
        request.include.as_deref(),
        request.python,
    );
    let set = match scanner.scan_path(&path) {
        Ok(set) => set,
        Err(err) => return Ok(unreadable_source_outcome(&err)),
    };

    let specs = set.to_specs();
    let details = json!({
        "path": path.display().to_string(),
        "python": scanner.options().python.to_string(),
        "packages": requirements_to_json(&set),
        "specs": specs,
    });
    if specs.is_empty() {
        return Ok(ExecutionOutcome::success(
            "no third-party imports found",
            details,
        ));
    }
    Ok(ExecutionOutcome::success(
        format!("found {} package(s):\n{}", specs.len(), specs.join("\n")),
        details,
    ))
}
