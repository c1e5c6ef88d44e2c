use atty::Stream;
use color_eyre::Result;
use serde_json::Value;
use smartrun_core::{CommandGroup, CommandInfo, CommandStatus, ExecutionOutcome};

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

/// Prints the outcome and returns the process exit code.
pub fn emit_output(opts: &OutputOptions, info: CommandInfo, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = exit_code(info, outcome);

    if opts.json {
        let payload = smartrun_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    if outcome.status == CommandStatus::Ok {
        if !opts.quiet {
            let style = Style::new(opts.no_color, atty::is(Stream::Stdout));
            let message = smartrun_core::format_status_message(info, &outcome.message);
            println!("{}", style.status(outcome.status, &message));
            if let Some(hint) = hint_from_details(&outcome.details) {
                println!("{}", style.info(&format!("Tip: {hint}")));
            }
        }
        return Ok(code);
    }

    let style = Style::new(opts.no_color, atty::is(Stream::Stderr));
    let message = smartrun_core::format_status_message(info, &outcome.message);
    eprintln!("{}", style.status(outcome.status, &message));
    let why = collect_why_bullets(&outcome.details);
    if !why.is_empty() {
        eprintln!();
        eprintln!("{}", style.heading("Why:"));
        for reason in why {
            eprintln!("  • {reason}");
        }
    }
    if let Some(stderr) = unstreamed_stderr(&outcome.details) {
        eprintln!();
        eprintln!("{}", style.heading("stderr:"));
        eprintln!("{}", style.dimmed(stderr.trim_end()));
    }
    if let Some(hint) = hint_from_details(&outcome.details) {
        eprintln!();
        eprintln!("{}", style.heading("Fix:"));
        for line in hint.lines() {
            eprintln!("  {line}");
        }
    }
    Ok(code)
}

/// 0 on success, 1 for user errors, 2 for failures. A script that ran and
/// exited nonzero passes its own code through.
fn exit_code(info: CommandInfo, outcome: &ExecutionOutcome) -> i32 {
    let code = match outcome.status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    };
    if info.group != CommandGroup::Run || outcome.status != CommandStatus::Failure {
        return code;
    }
    outcome
        .details
        .get("exit_code")
        .and_then(Value::as_i64)
        .and_then(|exit| i32::try_from(exit).ok())
        .filter(|exit| *exit > 0)
        .unwrap_or(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
        .filter(|hint| !hint.trim().is_empty())
}

fn unstreamed_stderr(details: &Value) -> Option<&str> {
    let streamed = details.get("streamed").and_then(Value::as_bool).unwrap_or(true);
    if streamed {
        return None;
    }
    details
        .get("stderr")
        .and_then(Value::as_str)
        .filter(|stderr| !stderr.trim().is_empty())
}

fn collect_why_bullets(details: &Value) -> Vec<String> {
    let mut bullets = Vec::new();
    if let Some(reason) = details.get("reason").and_then(Value::as_str) {
        if let Some(text) = reason_display(reason) {
            push_unique(&mut bullets, text);
        }
    }
    if let Some(cause) = details.get("cause").and_then(Value::as_str) {
        push_unique(&mut bullets, cause);
    }
    if let Some(failed) = details.get("failed").and_then(Value::as_array) {
        for entry in failed {
            let Some(spec) = entry.get("spec").and_then(Value::as_str) else {
                continue;
            };
            let error = entry
                .get("error")
                .and_then(Value::as_str)
                .and_then(|error| error.lines().last())
                .unwrap_or_default();
            if error.is_empty() {
                push_unique(&mut bullets, spec);
            } else {
                push_unique(&mut bullets, format!("{spec}: {error}"));
            }
        }
    }
    bullets
}

fn push_unique(vec: &mut Vec<String>, text: impl Into<String>) {
    let entry = text.into();
    if entry.trim().is_empty() {
        return;
    }
    if !vec.iter().any(|existing| existing == &entry) {
        vec.push(entry);
    }
}

fn reason_display(code: &str) -> Option<&'static str> {
    match code {
        "no_active_env" => Some("No virtual environment is active."),
        "env_creation_failed" => Some("The virtual environment could not be prepared."),
        "missing_python" => Some("No base Python interpreter was found."),
        "install_failed" => Some("Some packages could not be installed."),
        "timeout" => Some("The script ran past its time limit and was stopped."),
        "missing_interpreter" => Some("The environment has no Python interpreter."),
        _ => None,
    }
}
