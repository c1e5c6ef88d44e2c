use std::time::Duration;

use color_eyre::Result;
use smartrun_core::{
    CommandContext, CommandGroup, CommandInfo, EnvCheckRequest, EnvCreateRequest, EnvListRequest,
    ExecutionOutcome, InstallMode, InstallRequest, RunRequest, ScanRequest,
};

use crate::cli::{CommandGroupCli, EnvCommand, InstallArgs, RunArgs};

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    match group {
        CommandGroupCli::Run(args) => {
            let info = CommandInfo::new(CommandGroup::Run, "run");
            let request = run_request_from_args(args);
            core_call(info, || smartrun_core::run(ctx, &request))
        }
        CommandGroupCli::Scan(args) => {
            let info = CommandInfo::new(CommandGroup::Scan, "scan");
            let request = ScanRequest {
                path: args.path.clone(),
                exclude: args.filter.exclude.clone(),
                include: args.filter.include.clone(),
                python: args.python,
            };
            core_call(info, || smartrun_core::scan(ctx, &request))
        }
        CommandGroupCli::Install(args) => {
            let info = CommandInfo::new(CommandGroup::Install, "install");
            let request = install_request_from_args(args);
            core_call(info, || smartrun_core::install(ctx, &request))
        }
        CommandGroupCli::Env(cmd) => match cmd {
            EnvCommand::Create(args) => {
                let info = CommandInfo::new(CommandGroup::Env, "create");
                let request = EnvCreateRequest {
                    name: args.name.clone(),
                };
                core_call(info, || smartrun_core::env_create(ctx, &request))
            }
            EnvCommand::Check(args) => {
                let info = CommandInfo::new(CommandGroup::Env, "check");
                let request = EnvCheckRequest {
                    env: args.env.clone(),
                };
                core_call(info, || smartrun_core::env_check(ctx, &request))
            }
            EnvCommand::List(args) => {
                let info = CommandInfo::new(CommandGroup::Env, "list");
                let request = EnvListRequest {
                    root: args.root.clone(),
                };
                core_call(info, || smartrun_core::env_list(ctx, &request))
            }
        },
    }
}

fn install_mode(bulk: bool) -> InstallMode {
    if bulk {
        InstallMode::Bulk
    } else {
        InstallMode::PerPackage
    }
}

fn run_request_from_args(args: &RunArgs) -> RunRequest {
    RunRequest {
        script: args.script.clone(),
        args: args.args.clone(),
        env: args.env.clone(),
        timeout: args.timeout.filter(|secs| *secs > 0).map(Duration::from_secs),
        exclude: args.filter.exclude.clone(),
        include: args.filter.include.clone(),
        mode: install_mode(args.bulk),
        python: args.python,
        no_install: args.no_install,
    }
}

fn install_request_from_args(args: &InstallArgs) -> InstallRequest {
    InstallRequest {
        source: args.source.join(" "),
        env: args.env.clone(),
        mode: install_mode(args.bulk),
        exclude: args.filter.exclude.clone(),
        include: args.filter.include.clone(),
        python: args.python,
    }
}

fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(outcome) => Ok((info, outcome)),
        Err(err) => {
            let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
            Ok((
                info,
                ExecutionOutcome::failure(
                    err.to_string(),
                    serde_json::json!({
                        "reason": "internal_error",
                        "error": format!("{err:#}"),
                        "issues": issues,
                        "hint": "re-run with -v for more detail",
                    }),
                ),
            ))
        }
    }
}
