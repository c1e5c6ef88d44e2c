#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;

const ACTIVATION_VARS: &[&str] = &[
    "VIRTUAL_ENV",
    "CONDA_DEFAULT_ENV",
    "CONDA_PREFIX",
    "SMARTRUN_PYTHON",
    "SMARTRUN_NO_UV",
    "SMARTRUN_TIMEOUT",
    "SMARTRUN_VERBOSE",
    "RUST_LOG",
];

/// The binary, run from `dir`, with no environment activated.
pub fn smartrun(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("smartrun");
    cmd.current_dir(dir).env("NO_COLOR", "1");
    for var in ACTIVATION_VARS {
        cmd.env_remove(var);
    }
    cmd
}

pub fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("json output")
}

/// Lays out an interpreter and installer the way a venv would.
pub fn fake_env(root: &Path) -> PathBuf {
    let bin = if cfg!(windows) {
        root.join("Scripts")
    } else {
        root.join("bin")
    };
    fs::create_dir_all(&bin).expect("bin dir");
    let suffix = if cfg!(windows) { ".exe" } else { "" };
    fs::write(bin.join(format!("python{suffix}")), "").expect("python");
    fs::write(bin.join(format!("pip{suffix}")), "").expect("pip");
    root.to_path_buf()
}

/// A usable `python3` on PATH, if the machine has one.
pub fn find_python() -> Option<String> {
    ["python3", "python"].into_iter().find_map(|candidate| {
        let status = StdCommand::new(candidate).arg("--version").output().ok()?;
        status.status.success().then(|| candidate.to_string())
    })
}
