use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::Config;
use crate::effects::CommandRunner;
use crate::process::RunOptions;

const VERSION_SCRIPT: &str = r#"import json, platform
print(json.dumps({"version": platform.python_version()}))
"#;

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Detects the base interpreter used to create environments.
///
/// # Errors
///
/// Returns an error when no interpreter is configured and none is on `PATH`,
/// or the detected path is not valid UTF-8.
pub fn detect_interpreter(config: &Config, runner: &dyn CommandRunner) -> Result<String> {
    if let Some(explicit) = config.python() {
        return Ok(explicit.to_string());
    }

    for candidate in ["python3", "python"] {
        if let Some(path) = runner.which(candidate) {
            return path
                .into_os_string()
                .into_string()
                .map_err(|_| anyhow!("non-utf8 path"));
        }
    }

    bail!("no python interpreter found; set SMARTRUN_PYTHON")
}

/// Full `major.minor.micro` version of `python`.
///
/// # Errors
///
/// Returns an error when the interpreter cannot be invoked or the payload is
/// malformed.
pub fn query_version(runner: &dyn CommandRunner, python: &str, cwd: &Path) -> Result<String> {
    let payload: VersionPayload = query_python(runner, python, cwd, VERSION_SCRIPT, "version")?;
    Ok(payload.version)
}

fn query_python<T>(
    runner: &dyn CommandRunner,
    python: &str,
    cwd: &Path,
    script: &str,
    guide: &str,
) -> Result<T>
where
    T: DeserializeOwned,
{
    let options = RunOptions::default().with_timeout(QUERY_TIMEOUT);
    let output = runner
        .run(
            python,
            &["-c".to_string(), script.to_string()],
            &[],
            cwd,
            &options,
        )
        .with_context(|| format!("failed to query {guide} via {python}"))?;
    if !output.success() {
        bail!("python {guide} query failed: {}", output.stderr.trim());
    }
    serde_json::from_str(output.stdout.trim()).context(format!("invalid {guide} payload"))
}

#[derive(Deserialize)]
struct VersionPayload {
    version: String,
}
