use std::path::PathBuf;

use crate::process::ProcessError;

/// Why a single creation strategy did not produce an environment.
#[derive(Debug, thiserror::Error)]
pub enum StrategyFailure {
    #[error("`{strategy}` exited with code {code}: {stderr}")]
    Exit {
        strategy: &'static str,
        code: i32,
        stderr: String,
    },
    #[error(transparent)]
    Process(#[from] ProcessError),
}

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("failed to create environment at {} after {attempts} attempt(s)", path.display())]
    Creation {
        path: PathBuf,
        attempts: usize,
        #[source]
        source: StrategyFailure,
    },
    #[error("python executable not found after creating {}", path.display())]
    MissingInterpreter { path: PathBuf },
    #[error("failed to bootstrap pip inside {}: {detail}", path.display())]
    Repair { path: PathBuf, detail: String },
}

impl EnvError {
    /// Remediation text shown alongside the error.
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            EnvError::Creation { .. } => {
                "check that the base interpreter includes the venv module, or set SMARTRUN_PYTHON"
            }
            EnvError::MissingInterpreter { .. } => {
                "remove the directory and create the environment again"
            }
            EnvError::Repair { .. } => {
                "install pip into the environment manually with `python -m ensurepip`"
            }
        }
    }
}
