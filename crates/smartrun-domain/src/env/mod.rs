//! On-disk layout of managed environments and the per-project record of the
//! last one created.

mod layout;
mod state;

pub use layout::{
    absolute_path, activation_command, bin_dir, has_installer, has_interpreter, installer_path,
    interpreter_path, is_managed_environment, recorded_python_version,
};
pub use state::{EnvState, EnvStateStore, STATE_DIR_NAME, STATE_FILE_NAME};
