use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use smartrun_domain::EnvStateStore;

use crate::config::{Config, EnvSnapshot, GlobalOptions};
use crate::effects::{self, Effects, SharedEffects};
use crate::process::{RunOptions, StdioEcho};
use crate::python_sys::detect_interpreter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandGroup {
    Run,
    Scan,
    Install,
    Env,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Run => "run",
            CommandGroup::Scan => "scan",
            CommandGroup::Install => "install",
            CommandGroup::Env => "env",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    env: EnvSnapshot,
    config: Config,
    project_root: PathBuf,
    state: EnvStateStore,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a context rooted at the current directory.
    ///
    /// # Errors
    /// Returns an error if the working directory cannot be inspected.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        let cwd = env::current_dir().context("reading current directory")?;
        Ok(Self::with_parts(global, EnvSnapshot::capture(), cwd, effects))
    }

    pub fn with_parts(
        global: &'a GlobalOptions,
        env: EnvSnapshot,
        project_root: PathBuf,
        effects: SharedEffects,
    ) -> Self {
        let config = Config::from_snapshot(&env).with_global(global);
        let state = EnvStateStore::for_project(&project_root);
        Self {
            global,
            env,
            config,
            project_root,
            state,
            effects,
        }
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn shared_effects(&self) -> SharedEffects {
        Arc::clone(&self.effects)
    }

    pub fn runner(&self) -> &dyn effects::CommandRunner {
        self.effects.runner()
    }

    pub fn detector(&self) -> &dyn effects::EnvironmentDetector {
        self.effects.detector()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state_store(&self) -> &EnvStateStore {
        &self.state
    }

    /// Base interpreter used to create environments.
    ///
    /// # Errors
    /// Returns an error if no interpreter is configured or on `PATH`.
    pub fn base_python(&self) -> Result<String> {
        detect_interpreter(&self.config, self.runner())
    }

    /// Subprocess options for tool invocations (installers, venv creation).
    /// Output is mirrored to the terminal only in verbose mode.
    pub fn tool_run_options(&self) -> RunOptions {
        let options = RunOptions {
            max_capture_bytes: self.config.max_capture_bytes(),
            ..RunOptions::default()
        };
        if self.config.verbose() && !self.global.json {
            options.with_echo(Arc::new(StdioEcho))
        } else {
            options
        }
    }

    /// Directory holding user-wide environments (`~/.smartrun_envs`).
    pub fn home_envs_dir(&self) -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".smartrun_envs"))
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.var(key)
    }
}
