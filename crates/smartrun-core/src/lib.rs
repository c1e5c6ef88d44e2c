#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

mod core;

pub mod env {
    pub use crate::core::env::*;
}

pub(crate) use crate::core::config;
pub(crate) use crate::core::config::context;
pub(crate) use crate::core::install;
pub(crate) use crate::core::python::python_sys;
pub(crate) use crate::core::runtime::{effects, process};
pub(crate) use crate::core::tooling;

#[cfg(test)]
pub(crate) use crate::core::testing;

pub use crate::core::config::context::{CommandContext, CommandGroup, CommandInfo};
pub use crate::core::config::{Config, EnvSnapshot, GlobalOptions};
pub use crate::core::install::{
    InstallFailure, InstallMode, InstallReport, InstallSource, InstallSourceError, InstallTool,
    Installer, ResolvedSource, MANIFEST_FILE_NAME,
};
pub use crate::core::runtime::effects::{
    CommandRunner, Effects, EnvironmentDetector, SharedEffects, SystemEffects,
};
pub use crate::core::runtime::process::{run_command, ProcessError, RunOptions, RunOutput};
pub use crate::core::tooling::outcome::{
    format_status_message, to_json_response, CommandStatus, ExecutionOutcome,
};

pub use crate::core::commands::{
    env_check, env_create, env_list, install, run, scan, EnvCheckRequest, EnvCreateRequest,
    EnvListRequest, InstallRequest, RunRequest, ScanRequest,
};
