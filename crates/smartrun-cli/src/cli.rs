use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use smartrun_domain::PythonVersion;

pub const SMARTRUN_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const SMARTRUN_BEFORE_HELP: &str = concat!(
    "smartrun ",
    env!("CARGO_PKG_VERSION"),
    " – run Python scripts with the packages they import\n\n",
    "\x1b[1;36mCommands\x1b[0m\n",
    "  run              Scan a script, install what it imports, then run it.\n",
    "  scan             List the third-party packages a script or notebook needs.\n",
    "  install          Install packages from a script, a list, or a requirements file.\n",
    "  env create       Create a virtual environment under the project (default .venv).\n",
    "  env check        Show which environment commands would use.\n",
    "  env list         List environments under ~/.smartrun_envs.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "smartrun",
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = SMARTRUN_BEFORE_HELP,
    help_template = SMARTRUN_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct SmartrunCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[arg(
        long,
        help = "Install with pip even when uv is on PATH (same as SMARTRUN_NO_UV=1)",
        global = true
    )]
    pub no_uv: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Scan a script, install what it imports, then run it.",
        override_usage = "smartrun run <SCRIPT> [-- <ARG>...]",
        after_help = "Examples:\n  smartrun run analysis.py\n  smartrun run report.ipynb --env .venv\n  smartrun run train.py --timeout 120 -- --epochs 3"
    )]
    Run(RunArgs),
    #[command(
        about = "List the third-party packages a script or notebook needs.",
        override_usage = "smartrun scan <PATH> [--exclude NAMES] [--include NAMES]"
    )]
    Scan(ScanArgs),
    #[command(
        about = "Install packages from a script, a list, or a requirements file.",
        override_usage = "smartrun install <SOURCE>...",
        after_help = "Examples:\n  smartrun install analysis.py\n  smartrun install \"pandas==2.2.0, cv2 rich\"\n  smartrun install requirements.txt --bulk"
    )]
    Install(InstallArgs),
    #[command(subcommand, about = "Create, check, and list virtual environments.")]
    Env(EnvCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(
        long,
        value_name = "NAMES",
        help = "Packages to leave out (comma, semicolon, or space separated)"
    )]
    pub exclude: Option<String>,
    #[arg(
        long,
        value_name = "NAMES",
        help = "Packages to keep even if they look like standard library modules"
    )]
    pub include: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(value_name = "SCRIPT", help = "Python script or notebook to run")]
    pub script: PathBuf,
    #[arg(
        long,
        value_name = "ENV",
        help = "Environment directory to use, created if missing"
    )]
    pub env: Option<PathBuf>,
    #[arg(
        long,
        value_name = "SECONDS",
        help = "Kill the script after this many seconds (default SMARTRUN_TIMEOUT or 600)"
    )]
    pub timeout: Option<u64>,
    #[arg(long, help = "Install everything with a single requirements file")]
    pub bulk: bool,
    #[arg(long, help = "Run without scanning or installing")]
    pub no_install: bool,
    #[arg(
        long,
        value_name = "VERSION",
        help = "Python version whose standard library is skipped (default: the environment's)"
    )]
    pub python: Option<PythonVersion>,
    #[command(flatten)]
    pub filter: FilterArgs,
    #[arg(
        value_name = "ARG",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Arguments passed to the script"
    )]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[arg(value_name = "PATH", help = "Python script or notebook to scan")]
    pub path: PathBuf,
    #[arg(
        long,
        value_name = "VERSION",
        help = "Python version whose standard library is skipped (default 3.12)"
    )]
    pub python: Option<PythonVersion>,
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[arg(
        value_name = "SOURCE",
        required = true,
        num_args = 1..,
        help = "Script, notebook, .txt/.json file, or package specs"
    )]
    pub source: Vec<String>,
    #[arg(
        long,
        value_name = "ENV",
        help = "Environment directory to use, created if missing"
    )]
    pub env: Option<PathBuf>,
    #[arg(long, help = "Install everything with a single requirements file")]
    pub bulk: bool,
    #[arg(
        long,
        value_name = "VERSION",
        help = "Python version whose standard library is skipped (default: the environment's)"
    )]
    pub python: Option<PythonVersion>,
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    #[command(
        about = "Create a virtual environment under the project.",
        override_usage = "smartrun env create [NAME]"
    )]
    Create(EnvCreateArgs),
    #[command(about = "Show which environment commands would use.")]
    Check(EnvCheckArgs),
    #[command(about = "List environments under ~/.smartrun_envs.")]
    List(EnvListArgs),
}

#[derive(Args, Debug)]
pub struct EnvCreateArgs {
    #[arg(value_name = "NAME", help = "Directory name (default .venv)")]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct EnvCheckArgs {
    #[arg(
        long,
        value_name = "ENV",
        help = "Environment the project expects (default .venv)"
    )]
    pub env: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EnvListArgs {
    #[arg(
        long,
        value_name = "DIR",
        help = "Directory to list instead of ~/.smartrun_envs"
    )]
    pub root: Option<PathBuf>,
}
