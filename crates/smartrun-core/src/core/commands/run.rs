use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use smartrun_domain::notebook::is_notebook;
use smartrun_domain::{read_source, PythonVersion, RequirementSet};
use tracing::{debug, info};

use super::install::install_into;
use super::scan::{requirements_to_json, scanner_for};
use super::target::{prepare_target, TargetEnv};
use crate::install::InstallMode;
use crate::process::{ProcessError, RunOptions, RunOutput, StdioEcho};
use crate::tooling::{script_not_found_outcome, unreadable_source_outcome};
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug, Default)]
pub struct RunRequest {
    pub script: PathBuf,
    pub args: Vec<String>,
    pub env: Option<PathBuf>,
    /// Overrides `SMARTRUN_TIMEOUT` for the script itself.
    pub timeout: Option<Duration>,
    pub exclude: Option<String>,
    pub include: Option<String>,
    pub mode: InstallMode,
    /// Standard-library version to filter against instead of the target's.
    pub python: Option<PythonVersion>,
    /// Skip the scan-and-install step.
    pub no_install: bool,
}

/// Scans a script, installs what it needs, and runs it.
///
/// Script output is mirrored to the terminal as it arrives unless JSON
/// output was requested; either way it is captured into the outcome.
///
/// # Errors
/// Returns an error if the installer cannot be launched or the notebook
/// staging file cannot be written.
pub fn run(ctx: &CommandContext, request: &RunRequest) -> Result<ExecutionOutcome> {
    let script = ctx.project_root().join(&request.script);
    if !script.is_file() {
        return Ok(script_not_found_outcome(&script));
    }
    let source = match read_source(&script) {
        Ok(source) => source,
        Err(err) => return Ok(unreadable_source_outcome(&err)),
    };
    let target = match prepare_target(ctx, request.env.as_deref()) {
        Ok(target) => target,
        Err(outcome) => return Ok(outcome),
    };

    let set = if request.no_install {
        RequirementSet::new()
    } else {
        let python = target.python_version(ctx, request.python);
        let scanner = scanner_for(
            request.exclude.as_deref(),
            request.include.as_deref(),
            Some(python),
        );
        scanner.scan(&source)
    };
    debug!(script = %script.display(), packages = set.len(), "scanned script");

    let mut installed = Vec::new();
    if !set.is_empty() {
        let report = install_into(ctx, &target, &set, request.mode)?;
        if !report.is_success() {
            let failed: Vec<&str> = report.failed.iter().map(|f| f.spec.as_str()).collect();
            return Ok(ExecutionOutcome::failure(
                format!("could not install {}; script not run", failed.join(", ")),
                json!({
                    "reason": "install_failed",
                    "env": target.path.display().to_string(),
                    "packages": requirements_to_json(&set),
                    "installed": report.installed,
                    "failed": report.failed,
                }),
            ));
        }
        installed = report.installed;
    }

    let entry = if is_notebook(&script) {
        stage_notebook(ctx, &script, &source)?
    } else {
        script.clone()
    };
    let streamed = !ctx.global.json;
    let timeout = request.timeout.unwrap_or_else(|| ctx.config().run_timeout());
    let mut options = RunOptions {
        max_capture_bytes: ctx.config().max_capture_bytes(),
        ..RunOptions::default()
    }
    .with_timeout(timeout);
    if streamed {
        options = options.with_echo(Arc::new(StdioEcho));
    }

    let mut args = vec![entry.to_string_lossy().into_owned()];
    args.extend(request.args.iter().cloned());
    let python = target.python.to_string_lossy().into_owned();
    info!(script = %script.display(), env = %target.path.display(), "running script");
    let result = ctx
        .runner()
        .run(&python, &args, &[], ctx.project_root(), &options);

    let base = RunDetails {
        script: &script,
        target: &target,
        installed: &installed,
        streamed,
    };
    match result {
        Ok(output) => Ok(finished_outcome(&base, &output)),
        Err(ProcessError::TimedOut {
            timeout, partial, ..
        }) => {
            let mut details = base.to_json(&partial);
            details["reason"] = json!("timeout");
            details["timeout_secs"] = json!(timeout.as_secs_f64());
            Ok(ExecutionOutcome::failure(
                format!("script timed out after {}s", timeout.as_secs()),
                details,
            ))
        }
        Err(err) if err.is_not_found() => Ok(ExecutionOutcome::failure(
            format!("environment interpreter not found: {python}"),
            json!({
                "reason": "missing_interpreter",
                "env": target.path.display().to_string(),
                "hint": "recreate the environment with `smartrun env create`",
            }),
        )),
        Err(err) => Err(err).context("running script"),
    }
}

struct RunDetails<'a> {
    script: &'a Path,
    target: &'a TargetEnv,
    installed: &'a [String],
    streamed: bool,
}

impl RunDetails<'_> {
    fn to_json(&self, output: &RunOutput) -> Value {
        json!({
            "script": self.script.display().to_string(),
            "env": self.target.path.display().to_string(),
            "env_created": self.target.created,
            "warning": self.target.warning(),
            "installed": self.installed,
            "exit_code": output.code,
            "success": output.success(),
            "stdout": output.stdout,
            "stderr": output.stderr,
            "streamed": self.streamed,
        })
    }
}

fn finished_outcome(details: &RunDetails<'_>, output: &RunOutput) -> ExecutionOutcome {
    let json = details.to_json(output);
    let name = details
        .script
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if output.success() {
        ExecutionOutcome::success(format!("{name} finished"), json)
    } else {
        ExecutionOutcome::failure(format!("script exited with code {}", output.code), json)
    }
}

/// Writes notebook code cells to `<state dir>/<stem>_notebook.py`.
fn stage_notebook(ctx: &CommandContext, notebook: &Path, code: &str) -> Result<PathBuf> {
    let dir = ctx.state_store().dir();
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let stem = notebook
        .file_stem()
        .map_or_else(|| "notebook".to_string(), |stem| stem.to_string_lossy().into_owned());
    let staged = dir.join(format!("{stem}_notebook.py"));
    fs::write(&staged, code).with_context(|| format!("writing {}", staged.display()))?;
    debug!(notebook = %notebook.display(), staged = %staged.display(), "staged notebook code");
    Ok(staged)
}
