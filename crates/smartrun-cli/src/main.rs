#![deny(clippy::all, warnings)]

use std::sync::Arc;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use smartrun_core::{CommandContext, GlobalOptions, SystemEffects};
use tracing_subscriber::EnvFilter;

mod cli;
mod dispatch;
mod output;
mod style;

use cli::SmartrunCli;
use output::OutputOptions;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = SmartrunCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet)?;

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
        no_uv: cli.no_uv,
    };

    let ctx = CommandContext::new(&global, Arc::new(SystemEffects::new()))
        .map_err(|err| eyre!("{err:?}"))?;
    let (info, outcome) = dispatch::dispatch_command(&ctx, &cli.command)?;
    let opts = OutputOptions {
        quiet: cli.quiet,
        json: cli.json,
        no_color: cli.no_color,
    };
    let code = output::emit_output(&opts, info, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

/// Logs go to stderr so `--json` stdout stays machine-readable. `RUST_LOG`
/// wins over the flags when set.
fn init_tracing(trace: bool, verbose: u8, quiet: bool) -> Result<()> {
    let level = if trace {
        "trace"
    } else if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "smartrun={level},smartrun_cli={level},smartrun_core={level},smartrun_domain={level}"
        ))
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| eyre!("failed to install the log subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_second_subscriber_is_reported() {
        assert!(init_tracing(false, 0, false).is_ok());
        let err = init_tracing(false, 1, false).unwrap_err();
        assert!(err.to_string().contains("log subscriber"), "{err}");
    }
}
