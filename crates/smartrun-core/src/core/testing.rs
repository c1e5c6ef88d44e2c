//! Scripted effects for unit tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use smartrun_domain::{installer_path, interpreter_path};

use crate::effects::{CommandRunner, Effects, EnvironmentDetector};
use crate::env::detector::ActiveEnvironment;
use crate::process::{ProcessError, RunOptions, RunOutput};

#[derive(Clone, Debug)]
pub(crate) struct RecordedCall {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) timeout: Option<std::time::Duration>,
}

type Responder = Box<dyn Fn(&RecordedCall) -> Result<RunOutput, ProcessError> + Send + Sync>;

pub(crate) struct ScriptedRunner {
    calls: Mutex<Vec<RecordedCall>>,
    responder: Responder,
    binaries: HashMap<String, PathBuf>,
}

impl ScriptedRunner {
    pub(crate) fn new(
        responder: impl Fn(&RecordedCall) -> Result<RunOutput, ProcessError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            binaries: HashMap::new(),
        }
    }

    pub(crate) fn with_binary(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.binaries.insert(name.to_string(), path.into());
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        _envs: &[(String, String)],
        _cwd: &Path,
        options: &RunOptions,
    ) -> Result<RunOutput, ProcessError> {
        let call = RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
            timeout: options.timeout,
        };
        self.calls.lock().unwrap().push(call.clone());
        (self.responder)(&call)
    }

    fn which(&self, binary: &str) -> Option<PathBuf> {
        self.binaries.get(binary).cloned()
    }
}

pub(crate) struct FixedDetector(pub(crate) ActiveEnvironment);

impl EnvironmentDetector for FixedDetector {
    fn get(&self) -> ActiveEnvironment {
        self.0.clone()
    }
}

pub(crate) struct TestEffects {
    pub(crate) runner: Arc<ScriptedRunner>,
    pub(crate) detector: FixedDetector,
}

impl Effects for TestEffects {
    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn detector(&self) -> &dyn EnvironmentDetector {
        &self.detector
    }
}

pub(crate) fn ok_output(stdout: &str) -> Result<RunOutput, ProcessError> {
    Ok(RunOutput {
        code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub(crate) fn exit_with(code: i32, stderr: &str) -> Result<RunOutput, ProcessError> {
    Ok(RunOutput {
        code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

pub(crate) fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

/// Lays out an interpreter and installer under `root`.
pub(crate) fn fake_env(root: &Path) {
    fake_env_with_version(root, "3.12.4");
}

/// Like [`fake_env`], recording `version` in `pyvenv.cfg`.
pub(crate) fn fake_env_with_version(root: &Path, version: &str) {
    touch(&interpreter_path(root));
    touch(&installer_path(root));
    fs::write(root.join("pyvenv.cfg"), format!("version = {version}\n")).unwrap();
}

pub(crate) fn active_venv(path: &Path) -> ActiveEnvironment {
    ActiveEnvironment {
        active: true,
        kind: crate::env::detector::EnvironmentKind::VirtualEnv,
        name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: Some(path.to_path_buf()),
    }
}
