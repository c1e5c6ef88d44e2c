use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::process::{run_command, ProcessError, RunOptions, RunOutput};
use crate::env::detector::{detect_active, ActiveEnvironment};

pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
        options: &RunOptions,
    ) -> Result<RunOutput, ProcessError>;

    /// Locates an executable on `PATH`.
    fn which(&self, binary: &str) -> Option<PathBuf>;
}

pub trait EnvironmentDetector: Send + Sync {
    fn get(&self) -> ActiveEnvironment;
}

pub trait Effects: Send + Sync {
    fn runner(&self) -> &dyn CommandRunner;
    fn detector(&self) -> &dyn EnvironmentDetector;
}

pub struct SystemEffects {
    runner: Arc<SystemCommandRunner>,
    detector: Arc<SystemEnvironmentDetector>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            runner: Arc::new(SystemCommandRunner),
            detector: Arc::new(SystemEnvironmentDetector),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn detector(&self) -> &dyn EnvironmentDetector {
        self.detector.as_ref()
    }
}

struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
        options: &RunOptions,
    ) -> Result<RunOutput, ProcessError> {
        run_command(program, args, envs, cwd, options)
    }

    fn which(&self, binary: &str) -> Option<PathBuf> {
        which::which(binary).ok()
    }
}

struct SystemEnvironmentDetector;

impl EnvironmentDetector for SystemEnvironmentDetector {
    fn get(&self) -> ActiveEnvironment {
        detect_active(|key| std::env::var(key).ok())
    }
}

pub type SharedEffects = Arc<dyn Effects>;
