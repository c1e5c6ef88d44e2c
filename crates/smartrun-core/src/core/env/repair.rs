use std::path::Path;

use smartrun_domain::{has_installer, interpreter_path};
use tracing::{debug, info, warn};

use super::errors::EnvError;
use crate::effects::CommandRunner;
use crate::process::RunOptions;

const BOOTSTRAP_STEPS: [&[&str]; 2] = [
    &["-m", "ensurepip", "--upgrade"],
    &["-m", "pip", "install", "--upgrade", "pip", "setuptools"],
];

/// Makes sure `pip` exists inside the environment at `env_root`, running
/// `ensurepip` and a pip self-upgrade when it does not.
pub fn ensure_installer(
    runner: &dyn CommandRunner,
    env_root: &Path,
    cwd: &Path,
    options: &RunOptions,
) -> Result<(), EnvError> {
    if has_installer(env_root) {
        return Ok(());
    }
    warn!(env = %env_root.display(), "pip not found; bootstrapping with ensurepip");

    let python = interpreter_path(env_root).to_string_lossy().into_owned();
    let mut detail = None;
    for step in BOOTSTRAP_STEPS {
        let args: Vec<String> = step.iter().map(ToString::to_string).collect();
        let failure = match runner.run(&python, &args, &[], cwd, options) {
            Ok(output) if output.success() => None,
            Ok(output) => Some(format!(
                "`{}` exited with code {}: {}",
                step.join(" "),
                output.code,
                output.stderr.trim()
            )),
            Err(err) => Some(err.to_string()),
        };
        if let Some(failure) = failure {
            debug!(step = %step.join(" "), %failure, "pip bootstrap step failed");
            detail = Some(failure);
            break;
        }
    }

    if has_installer(env_root) {
        info!(env = %env_root.display(), "pip bootstrapped");
        return Ok(());
    }
    Err(EnvError::Repair {
        path: env_root.to_path_buf(),
        detail: detail.unwrap_or_else(|| "pip is still missing".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{exit_with, fake_env, ok_output, touch, ScriptedRunner};
    use smartrun_domain::installer_path;
    use tempfile::tempdir;

    #[test]
    fn present_installer_needs_no_commands() {
        let temp = tempdir().unwrap();
        fake_env(temp.path());
        let runner = ScriptedRunner::new(|_| ok_output(""));
        ensure_installer(&runner, temp.path(), temp.path(), &RunOptions::default()).unwrap();
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn ensurepip_restores_missing_installer() {
        let temp = tempdir().unwrap();
        let root = temp.path().to_path_buf();
        touch(&interpreter_path(&root));
        let pip = installer_path(&root);
        let runner = ScriptedRunner::new(move |call| {
            if call.args.iter().any(|arg| arg == "ensurepip") {
                touch(&pip);
            }
            ok_output("")
        });
        ensure_installer(&runner, &root, &root, &RunOptions::default()).unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args, ["-m", "ensurepip", "--upgrade"]);
        assert_eq!(calls[1].args[..3], ["-m", "pip", "install"]);
    }

    #[test]
    fn failed_bootstrap_is_a_repair_error() {
        let temp = tempdir().unwrap();
        touch(&interpreter_path(temp.path()));
        let runner = ScriptedRunner::new(|_| exit_with(1, "No module named ensurepip"));
        let err = ensure_installer(&runner, temp.path(), temp.path(), &RunOptions::default())
            .unwrap_err();
        match err {
            EnvError::Repair { detail, .. } => assert!(detail.contains("ensurepip")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(runner.calls().len(), 1, "stops after the first failed step");
    }
}
