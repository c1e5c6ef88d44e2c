use std::path::{Path, PathBuf};

use smartrun_domain::{has_interpreter, interpreter_path, recorded_python_version, PythonVersion};
use tracing::{debug, warn};

use crate::env::{expected_env_path, reconcile, EnvCheck, EnvironmentManager};
use crate::python_sys::query_version;
use crate::tooling::{env_error_outcome, missing_python_outcome, no_active_env_outcome};
use crate::{CommandContext, ExecutionOutcome};

/// The environment a command installs into and runs with.
pub(crate) struct TargetEnv {
    pub(crate) path: PathBuf,
    pub(crate) python: PathBuf,
    pub(crate) created: bool,
    pub(crate) check: EnvCheck,
}

impl TargetEnv {
    /// Reconciliation warning text, when there is one worth showing.
    pub(crate) fn warning(&self) -> Option<String> {
        self.check.warning.as_ref().map(ToString::to_string)
    }

    /// Version whose standard library is filtered out of scans: `requested`
    /// when given, else what `pyvenv.cfg` records, else what the interpreter
    /// reports.
    pub(crate) fn python_version(
        &self,
        ctx: &CommandContext,
        requested: Option<PythonVersion>,
    ) -> PythonVersion {
        if let Some(version) = requested.or_else(|| recorded_python_version(&self.path)) {
            return version;
        }
        let python = self.python.to_string_lossy();
        match query_version(ctx.runner(), &python, ctx.project_root())
            .and_then(|version| version.parse::<PythonVersion>())
        {
            Ok(version) => version,
            Err(err) => {
                debug!(%err, env = %self.path.display(), "could not query interpreter version");
                PythonVersion::default()
            }
        }
    }
}

/// Picks and prepares the target environment.
///
/// An explicit `env` is created on demand. Otherwise the active environment
/// is used, and running without one is a user error carrying the setup
/// instructions.
pub(crate) fn prepare_target(
    ctx: &CommandContext,
    env: Option<&Path>,
) -> Result<TargetEnv, ExecutionOutcome> {
    let expected = expected_env_path(ctx.project_root(), env);
    let check = reconcile(ctx.detector(), ctx.state_store(), &expected);

    let path = match (env, check.active_path()) {
        (Some(_), _) => expected.clone(),
        (None, Some(active)) if check.proceed => active.to_path_buf(),
        _ => return Err(no_active_env_outcome(&check)),
    };
    if let Some(warning) = &check.warning {
        warn!("{warning}");
    }

    let base_python = match ctx.base_python() {
        Ok(python) => python,
        Err(err) if !has_interpreter(&path) => return Err(missing_python_outcome(&err)),
        Err(err) => {
            debug!(%err, "no base interpreter; reusing the environment's own");
            interpreter_path(&path).to_string_lossy().into_owned()
        }
    };
    let ensured = EnvironmentManager::new(
        ctx.runner(),
        base_python,
        ctx.state_store(),
        ctx.project_root(),
    )
    .with_backoff(ctx.config().create_backoff())
    .with_run_options(ctx.tool_run_options())
    .ensure(&path)
    .map_err(|err| env_error_outcome(&err))?;

    Ok(TargetEnv {
        path: ensured.path,
        python: ensured.python,
        created: ensured.created,
        check,
    })
}
