use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::json;
use smartrun_domain::{PythonVersion, RequirementSet};
use tracing::info;

use super::scan::{requirements_to_json, scanner_for};
use super::target::{prepare_target, TargetEnv};
use crate::install::{InstallMode, InstallReport, InstallSource, InstallTool, Installer};
use crate::tooling::{script_not_found_outcome, unreadable_source_outcome};
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug, Default)]
pub struct InstallRequest {
    /// A script, notebook, requirements file, JSON file, or a list of specs.
    pub source: String,
    pub env: Option<PathBuf>,
    pub mode: InstallMode,
    pub exclude: Option<String>,
    pub include: Option<String>,
    /// Standard-library version to filter scripts against instead of the
    /// target's.
    pub python: Option<PythonVersion>,
}

/// Installs packages named by a script, file or list into the target
/// environment.
///
/// # Errors
/// Returns an error if the installer cannot be launched.
pub fn install(ctx: &CommandContext, request: &InstallRequest) -> Result<ExecutionOutcome> {
    let source = InstallSource::classify(&request.source, ctx.project_root());
    if let InstallSource::Script(path) = &source {
        if !path.is_file() {
            return Ok(script_not_found_outcome(path));
        }
    }
    let target = match prepare_target(ctx, request.env.as_deref()) {
        Ok(target) => target,
        Err(outcome) => return Ok(outcome),
    };
    let python = if matches!(source, InstallSource::Script(_)) {
        Some(target.python_version(ctx, request.python))
    } else {
        request.python
    };
    let scanner = scanner_for(request.exclude.as_deref(), request.include.as_deref(), python);
    let resolved = match source.requirements(&scanner) {
        Ok(resolved) => resolved,
        Err(err) => return Ok(unreadable_source_outcome(&err)),
    };
    if resolved.is_empty() {
        return Ok(ExecutionOutcome::success(
            "nothing to install",
            json!({
                "source": source.kind(),
                "env": target.path.display().to_string(),
                "installed": [],
                "failed": [],
            }),
        ));
    }

    let mut report = install_into(ctx, &target, &resolved.set, request.mode)?;
    report.record_rejected(&resolved.rejected);
    Ok(install_outcome(&target, &resolved.set, &report, source.kind()))
}

/// Installs `set` into `target` with the configured tool.
pub(crate) fn install_into(
    ctx: &CommandContext,
    target: &TargetEnv,
    set: &RequirementSet,
    mode: InstallMode,
) -> Result<InstallReport> {
    let tool = InstallTool::select(ctx.runner(), ctx.config().use_uv());
    info!(env = %target.path.display(), packages = set.len(), "installing into environment");
    Installer::new(ctx.runner(), &target.python, ctx.project_root())
        .with_tool(tool)
        .with_mode(mode)
        .with_manifest_dir(ctx.state_store().dir())
        .with_options(ctx.tool_run_options())
        .install(set)
}

fn install_outcome(
    target: &TargetEnv,
    set: &RequirementSet,
    report: &InstallReport,
    source_kind: &str,
) -> ExecutionOutcome {
    let details = json!({
        "source": source_kind,
        "env": target.path.display().to_string(),
        "env_created": target.created,
        "warning": target.warning(),
        "packages": requirements_to_json(set),
        "tool": report.tool,
        "mode": report.mode,
        "installed": report.installed,
        "failed": report.failed,
    });
    if report.is_success() {
        return ExecutionOutcome::success(
            format!(
                "installed {} package(s) into {}",
                report.installed.len(),
                display_env(&target.path)
            ),
            details,
        );
    }
    let failed: Vec<&str> = report.failed.iter().map(|f| f.spec.as_str()).collect();
    ExecutionOutcome::failure(
        format!(
            "failed to install {} of {} package(s): {}",
            failed.len(),
            report.installed.len() + failed.len(),
            failed.join(", ")
        ),
        details,
    )
}

fn display_env(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
