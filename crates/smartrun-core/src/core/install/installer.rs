use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use smartrun_domain::{RejectedSpec, RequirementSet};
use tracing::{debug, info, warn};

use crate::effects::CommandRunner;
use crate::process::{ProcessError, RunOptions, RunOutput};

pub const MANIFEST_FILE_NAME: &str = "requirements.txt";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMode {
    /// One installer invocation per requirement; failures do not stop the rest.
    #[default]
    PerPackage,
    /// A single `-r requirements.txt` invocation.
    Bulk,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstallTool {
    Pip,
    Uv(PathBuf),
}

impl InstallTool {
    /// `uv` when enabled and on `PATH`, otherwise pip.
    pub fn select(runner: &dyn CommandRunner, use_uv: bool) -> Self {
        if use_uv {
            if let Some(uv) = runner.which("uv") {
                debug!(uv = %uv.display(), "using uv for installs");
                return InstallTool::Uv(uv);
            }
        }
        InstallTool::Pip
    }

    pub fn name(&self) -> &'static str {
        match self {
            InstallTool::Pip => "pip",
            InstallTool::Uv(_) => "uv",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct InstallFailure {
    pub spec: String,
    pub code: Option<i32>,
    pub error: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct InstallReport {
    pub tool: &'static str,
    pub mode: InstallMode,
    pub installed: Vec<String>,
    pub failed: Vec<InstallFailure>,
}

impl InstallReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Counts requirements that never reached the installer because they
    /// did not parse.
    pub fn record_rejected(&mut self, rejected: &[RejectedSpec]) {
        for RejectedSpec { spec, error } in rejected {
            warn!(spec = %spec, %error, "invalid requirement");
            self.failed.push(InstallFailure {
                spec: spec.clone(),
                code: None,
                error: format!("invalid requirement: {error}"),
            });
        }
    }
}

/// Installs requirements into one environment's interpreter.
pub struct Installer<'a> {
    runner: &'a dyn CommandRunner,
    python: PathBuf,
    tool: InstallTool,
    mode: InstallMode,
    cwd: &'a Path,
    manifest_dir: PathBuf,
    options: RunOptions,
}

impl<'a> Installer<'a> {
    pub fn new(runner: &'a dyn CommandRunner, python: &Path, cwd: &'a Path) -> Self {
        Self {
            runner,
            python: python.to_path_buf(),
            tool: InstallTool::Pip,
            mode: InstallMode::default(),
            cwd,
            manifest_dir: cwd.to_path_buf(),
            options: RunOptions::default(),
        }
    }

    #[must_use]
    pub fn with_tool(mut self, tool: InstallTool) -> Self {
        self.tool = tool;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: InstallMode) -> Self {
        self.mode = mode;
        self
    }

    /// Directory that receives the bulk manifest.
    #[must_use]
    pub fn with_manifest_dir(mut self, dir: &Path) -> Self {
        self.manifest_dir = dir.to_path_buf();
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs every requirement in `set`.
    ///
    /// # Errors
    ///
    /// Returns an error when the installer cannot be launched at all or the
    /// bulk manifest cannot be written. Individual install failures are
    /// reported in [`InstallReport::failed`].
    pub fn install(&self, set: &RequirementSet) -> Result<InstallReport> {
        let specs = set.to_specs();
        let mut report = InstallReport {
            tool: self.tool.name(),
            mode: self.mode,
            installed: Vec::new(),
            failed: Vec::new(),
        };
        if specs.is_empty() {
            return Ok(report);
        }
        info!(count = specs.len(), tool = self.tool.name(), "installing requirements");

        match self.mode {
            InstallMode::PerPackage => {
                for spec in specs {
                    let result = self.invoke(std::slice::from_ref(&spec))?;
                    record(&mut report, vec![spec], result);
                }
            }
            InstallMode::Bulk => {
                let manifest = self.write_manifest(&specs)?;
                let args = vec!["-r".to_string(), manifest.to_string_lossy().into_owned()];
                let result = self.invoke(&args)?;
                record(&mut report, specs, result);
            }
        }
        Ok(report)
    }

    fn write_manifest(&self, specs: &[String]) -> Result<PathBuf> {
        fs::create_dir_all(&self.manifest_dir)
            .with_context(|| format!("creating {}", self.manifest_dir.display()))?;
        let path = self.manifest_dir.join(MANIFEST_FILE_NAME);
        let mut contents = specs.join("\n");
        contents.push('\n');
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        debug!(manifest = %path.display(), "wrote requirements manifest");
        Ok(path)
    }

    fn command(&self, targets: &[String]) -> (String, Vec<String>) {
        let python = self.python.to_string_lossy().into_owned();
        match &self.tool {
            InstallTool::Pip => {
                let mut args = vec!["-m".to_string(), "pip".to_string(), "install".to_string()];
                args.extend_from_slice(targets);
                (python, args)
            }
            InstallTool::Uv(uv) => {
                let mut args = vec![
                    "pip".to_string(),
                    "install".to_string(),
                    "--python".to_string(),
                    python,
                ];
                args.extend_from_slice(targets);
                (uv.to_string_lossy().into_owned(), args)
            }
        }
    }

    /// Runs one installer invocation. A missing installer binary is fatal;
    /// everything else is reported per requirement.
    fn invoke(&self, targets: &[String]) -> Result<Result<RunOutput, ProcessError>> {
        let (program, args) = self.command(targets);
        debug!(program = %program, args = ?args, "running installer");
        match self
            .runner
            .run(&program, &args, &[], self.cwd, &self.options)
        {
            Err(err) if err.is_not_found() => {
                Err(anyhow::Error::new(err).context(format!("installer {program} not found")))
            }
            other => Ok(other),
        }
    }
}

fn record(
    report: &mut InstallReport,
    specs: Vec<String>,
    result: Result<RunOutput, ProcessError>,
) {
    let (code, error) = match result {
        Ok(output) if output.success() => {
            report.installed.extend(specs);
            return;
        }
        Ok(output) => (Some(output.code), last_lines(&output.stderr, 5)),
        Err(err) => (None, err.to_string()),
    };
    for spec in specs {
        warn!(spec = %spec, code = ?code, "install failed");
        report.failed.push(InstallFailure {
            spec,
            code,
            error: error.clone(),
        });
    }
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}
