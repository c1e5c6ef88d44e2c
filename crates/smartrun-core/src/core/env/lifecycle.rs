use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use smartrun_domain::{absolute_path, has_interpreter, interpreter_path, EnvState, EnvStateStore};
use tracing::{debug, info, warn};

use super::errors::{EnvError, StrategyFailure};
use super::repair::ensure_installer;
use crate::effects::CommandRunner;
use crate::process::RunOptions;
use crate::python_sys::query_version;

const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

const BUILDER_SCRIPT: &str = "import os, sys, venv
venv.EnvBuilder(with_pip=True, clear=True, symlinks=os.name != 'nt').create(sys.argv[1])
";

const BUILDER_COPIES_SCRIPT: &str = "import sys, venv
venv.EnvBuilder(with_pip=True, clear=True, symlinks=False).create(sys.argv[1])
";

/// One way of asking the base interpreter for a new environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreationStrategy {
    /// `venv.EnvBuilder` with the platform's default linking.
    Builder,
    /// `venv.EnvBuilder` copying binaries instead of symlinking them.
    BuilderCopies,
    /// `python -m venv`.
    Module,
}

impl CreationStrategy {
    pub const DEFAULT_ORDER: [CreationStrategy; 3] = [
        CreationStrategy::Builder,
        CreationStrategy::BuilderCopies,
        CreationStrategy::Module,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CreationStrategy::Builder => "builder",
            CreationStrategy::BuilderCopies => "builder-copies",
            CreationStrategy::Module => "module",
        }
    }

    fn args(self, path: &Path) -> Vec<String> {
        let target = path.to_string_lossy().into_owned();
        match self {
            CreationStrategy::Builder => vec!["-c".into(), BUILDER_SCRIPT.into(), target],
            CreationStrategy::BuilderCopies => {
                vec!["-c".into(), BUILDER_COPIES_SCRIPT.into(), target]
            }
            CreationStrategy::Module => {
                vec!["-m".into(), "venv".into(), "--clear".into(), target]
            }
        }
    }
}

enum Attempt {
    Success,
    Recoverable(StrategyFailure),
    Fatal(StrategyFailure),
}

/// Result of [`EnvironmentManager::ensure`].
#[derive(Clone, Debug, Serialize)]
pub struct EnsuredEnvironment {
    pub path: PathBuf,
    pub python: PathBuf,
    pub created: bool,
    pub state: Option<EnvState>,
}

/// Creates and repairs managed environments, recording each creation in the
/// project's [`EnvStateStore`].
pub struct EnvironmentManager<'a> {
    runner: &'a dyn CommandRunner,
    base_python: String,
    store: &'a EnvStateStore,
    project_dir: &'a Path,
    options: RunOptions,
    backoff: Duration,
    strategies: Vec<CreationStrategy>,
}

impl<'a> EnvironmentManager<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        base_python: impl Into<String>,
        store: &'a EnvStateStore,
        project_dir: &'a Path,
    ) -> Self {
        Self {
            runner,
            base_python: base_python.into(),
            store,
            project_dir,
            options: RunOptions::default().with_timeout(DEFAULT_CREATE_TIMEOUT),
            backoff: DEFAULT_BACKOFF,
            strategies: CreationStrategy::DEFAULT_ORDER.to_vec(),
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Options for creation subprocesses; a missing timeout gets the default.
    #[must_use]
    pub fn with_run_options(mut self, options: RunOptions) -> Self {
        let timeout = options.timeout.unwrap_or(DEFAULT_CREATE_TIMEOUT);
        self.options = options.with_timeout(timeout);
        self
    }

    #[must_use]
    pub fn with_strategies(mut self, strategies: &[CreationStrategy]) -> Self {
        self.strategies = strategies.to_vec();
        self
    }

    /// Reuses the environment at `path` when it has an interpreter, repairing
    /// a missing installer; creates it otherwise.
    pub fn ensure(&self, path: &Path) -> Result<EnsuredEnvironment, EnvError> {
        let path = absolute_path(path);
        if has_interpreter(&path) {
            debug!(env = %path.display(), "reusing existing environment");
            ensure_installer(self.runner, &path, self.project_dir, &self.options)?;
            return Ok(EnsuredEnvironment {
                python: interpreter_path(&path),
                path,
                created: false,
                state: None,
            });
        }
        let state = self.create(&path)?;
        Ok(EnsuredEnvironment {
            python: interpreter_path(&state.path),
            path: state.path.clone(),
            created: true,
            state: Some(state),
        })
    }

    /// Builds a fresh environment at `path`, trying each strategy in order.
    pub fn create(&self, path: &Path) -> Result<EnvState, EnvError> {
        let path = absolute_path(path);
        info!(env = %path.display(), python = %self.base_python, "creating virtual environment");

        self.run_strategies(&path)?;

        if !has_interpreter(&path) {
            return Err(EnvError::MissingInterpreter { path });
        }
        ensure_installer(self.runner, &path, self.project_dir, &self.options)?;

        let python = interpreter_path(&path).to_string_lossy().into_owned();
        let version = match query_version(self.runner, &python, self.project_dir) {
            Ok(version) => version,
            Err(err) => {
                warn!(%err, "could not determine environment python version");
                "unknown".to_string()
            }
        };
        let name = path
            .file_name()
            .map_or_else(|| ".venv".to_string(), |name| name.to_string_lossy().into_owned());
        let state = self
            .store
            .record_created(&name, &path, &version, self.project_dir);
        info!(env = %path.display(), version = %version, "virtual environment ready");
        Ok(state)
    }

    fn run_strategies(&self, path: &Path) -> Result<(), EnvError> {
        let mut failure: Option<StrategyFailure> = None;
        for (idx, strategy) in self.strategies.iter().copied().enumerate() {
            let attempts = idx + 1;
            if let Some(cause) = failure.take() {
                warn!(%cause, attempt = idx, next = strategy.name(), "environment creation failed; retrying");
                thread::sleep(self.backoff);
                remove_partial(path);
            }
            match self.attempt(strategy, path) {
                Attempt::Success => {
                    debug!(strategy = strategy.name(), attempts, "creation strategy succeeded");
                    return Ok(());
                }
                Attempt::Recoverable(cause) => failure = Some(cause),
                Attempt::Fatal(source) => {
                    return Err(EnvError::Creation {
                        path: path.to_path_buf(),
                        attempts,
                        source,
                    });
                }
            }
        }
        match failure {
            Some(source) => Err(EnvError::Creation {
                path: path.to_path_buf(),
                attempts: self.strategies.len(),
                source,
            }),
            None => Ok(()),
        }
    }

    fn attempt(&self, strategy: CreationStrategy, path: &Path) -> Attempt {
        debug!(strategy = strategy.name(), "trying creation strategy");
        let result = self.runner.run(
            &self.base_python,
            &strategy.args(path),
            &[],
            self.project_dir,
            &self.options,
        );
        match result {
            Ok(output) if output.success() => Attempt::Success,
            Ok(output) => Attempt::Recoverable(StrategyFailure::Exit {
                strategy: strategy.name(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            }),
            Err(err) if err.is_not_found() => Attempt::Fatal(err.into()),
            Err(err) => Attempt::Recoverable(err.into()),
        }
    }
}

fn remove_partial(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(err) = fs::remove_dir_all(path) {
        warn!(%err, env = %path.display(), "failed to remove partial environment");
    }
}
