//! Command entry points: each takes a [`CommandContext`](crate::CommandContext)
//! and a request and returns an [`ExecutionOutcome`](crate::ExecutionOutcome).

mod env;
mod install;
mod run;
mod scan;
mod target;

pub use env::{env_check, env_create, env_list, EnvCheckRequest, EnvCreateRequest, EnvListRequest};
pub use install::{install, InstallRequest};
pub use run::{run, RunRequest};
pub use scan::{scan, ScanRequest};
