use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use smartrun_domain::{activation_command, is_managed_environment, EnvState};

use crate::env::{expected_env_path, reconcile, EnvironmentManager, DEFAULT_ENV_DIR};
use crate::tooling::{env_error_outcome, missing_python_outcome, no_active_env_outcome};
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug, Default)]
pub struct EnvCreateRequest {
    /// Directory name or path relative to the project; `.venv` when absent.
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct EnvCheckRequest {
    pub env: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct EnvListRequest {
    /// Directory to list instead of `~/.smartrun_envs`.
    pub root: Option<PathBuf>,
}

/// Creates (or reuses) a managed environment under the project.
///
/// # Errors
/// Never fails; creation problems become user-error outcomes.
pub fn env_create(ctx: &CommandContext, request: &EnvCreateRequest) -> Result<ExecutionOutcome> {
    let name = request.name.as_deref().unwrap_or(DEFAULT_ENV_DIR);
    let path = expected_env_path(ctx.project_root(), Some(Path::new(name)));
    let base_python = match ctx.base_python() {
        Ok(python) => python,
        Err(err) => return Ok(missing_python_outcome(&err)),
    };

    let ensured = match EnvironmentManager::new(
        ctx.runner(),
        base_python,
        ctx.state_store(),
        ctx.project_root(),
    )
    .with_backoff(ctx.config().create_backoff())
    .with_run_options(ctx.tool_run_options())
    .ensure(&path)
    {
        Ok(ensured) => ensured,
        Err(err) => return Ok(env_error_outcome(&err)),
    };

    let activate = activation_command(&ensured.path);
    let details = json!({
        "path": ensured.path.display().to_string(),
        "python": ensured.python.display().to_string(),
        "python_version": ensured.state.as_ref().map(|state| state.python_version.clone()),
        "created": ensured.created,
        "activate": activate,
    });
    let headline = if ensured.created {
        format!("created environment at {}", ensured.path.display())
    } else {
        format!("environment already exists at {}", ensured.path.display())
    };
    Ok(ExecutionOutcome::success(
        format!("{headline}\nactivate with: {activate}"),
        details,
    ))
}

/// Reports whether commands would run in the current environment.
///
/// # Errors
/// Never fails; an inactive environment becomes a user-error outcome.
pub fn env_check(ctx: &CommandContext, request: &EnvCheckRequest) -> Result<ExecutionOutcome> {
    let expected = expected_env_path(ctx.project_root(), request.env.as_deref());
    let check = reconcile(ctx.detector(), ctx.state_store(), &expected);
    if !check.proceed {
        return Ok(no_active_env_outcome(&check));
    }
    let active = &check.active;
    let location = check
        .active_path()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    let message = match &check.warning {
        Some(warning) => warning.to_string(),
        None => format!("using {} environment {} ({location})", active.kind.as_str(), active.name),
    };
    Ok(ExecutionOutcome::success(message, check.to_json()))
}

/// Lists environments under the user-wide environment directory.
///
/// # Errors
/// Returns an error if the directory exists but cannot be read.
pub fn env_list(ctx: &CommandContext, request: &EnvListRequest) -> Result<ExecutionOutcome> {
    let Some(root) = request.root.clone().or_else(|| ctx.home_envs_dir()) else {
        return Ok(ExecutionOutcome::user_error(
            "could not determine the home directory",
            json!({
                "reason": "missing_home",
                "hint": "set HOME or pass --root",
            }),
        ));
    };
    let last_created = ctx.state_store().last_valid();
    let envs = if root.is_dir() { list_dirs(&root)? } else { Vec::new() };

    let entries: Vec<_> = envs
        .iter()
        .map(|path| {
            json!({
                "name": dir_name(path),
                "path": path.display().to_string(),
                "managed": is_managed_environment(path),
            })
        })
        .collect();
    let details = json!({
        "root": root.display().to_string(),
        "envs": entries,
        "last_created": last_created,
    });

    let mut lines = Vec::new();
    if envs.is_empty() {
        lines.push(format!("no environments in {}", root.display()));
    } else {
        lines.push(format!("environments in {}:", root.display()));
        lines.extend(envs.iter().map(|path| format!("  {}", dir_name(path))));
    }
    if let Some(EnvState { name, path, .. }) = &last_created {
        lines.push(format!("last created: {name} ({})", path.display()));
    }
    Ok(ExecutionOutcome::success(lines.join("\n"), details))
}

fn list_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let entry = entry.with_context(|| format!("reading {}", root.display()))?;
        if entry.file_type().is_ok_and(|kind| kind.is_dir()) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
