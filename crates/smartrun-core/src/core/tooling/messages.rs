use std::path::Path;

use serde_json::json;

use crate::env::{EnvCheck, EnvError};
use crate::ExecutionOutcome;

pub(crate) fn script_not_found_outcome(script: &Path) -> ExecutionOutcome {
    ExecutionOutcome::user_error(
        format!("script not found: {}", script.display()),
        json!({
            "reason": "script_not_found",
            "script": script.display().to_string(),
            "hint": "pass a path to an existing .py or .ipynb file",
        }),
    )
}

pub(crate) fn unreadable_source_outcome(err: &dyn std::error::Error) -> ExecutionOutcome {
    let mut detail = err.to_string();
    if let Some(source) = err.source() {
        detail = format!("{detail}: {source}");
    }
    ExecutionOutcome::user_error(
        detail,
        json!({
            "reason": "unreadable_source",
            "hint": "check that the file exists, is readable, and is UTF-8 text or a valid notebook",
        }),
    )
}

pub(crate) fn no_active_env_outcome(check: &EnvCheck) -> ExecutionOutcome {
    let hint = check
        .warning
        .as_ref()
        .map_or_else(String::new, ToString::to_string);
    ExecutionOutcome::user_error(
        "no active virtual environment",
        json!({
            "reason": "no_active_env",
            "hint": hint,
            "check": check.to_json(),
        }),
    )
}

pub(crate) fn env_error_outcome(err: &EnvError) -> ExecutionOutcome {
    let mut details = json!({
        "reason": "env_creation_failed",
        "hint": err.hint(),
    });
    if let EnvError::Creation { attempts, source, .. } = err {
        details["attempts"] = json!(attempts);
        details["cause"] = json!(source.to_string());
    }
    ExecutionOutcome::user_error(err.to_string(), details)
}

pub(crate) fn missing_python_outcome(err: &anyhow::Error) -> ExecutionOutcome {
    ExecutionOutcome::user_error(
        format!("{err:#}"),
        json!({
            "reason": "missing_python",
            "hint": "install Python 3 or point SMARTRUN_PYTHON at an interpreter",
        }),
    )
}
