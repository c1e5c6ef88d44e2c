#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod env;
pub mod notebook;
pub mod package;
pub mod python;
pub mod scan;

pub use env::{
    absolute_path, activation_command, has_installer, has_interpreter, installer_path,
    interpreter_path, is_managed_environment, recorded_python_version, EnvState, EnvStateStore,
    STATE_DIR_NAME,
};
pub use package::{
    distribution_for, known_mapping, normalize_distribution_name, PackageName, Requirement,
    RequirementOrigin, RequirementSet, SpecError, VersionOperator, VersionPredicate,
};
pub use python::PythonVersion;
pub use scan::{
    is_stdlib, read_source, resolve_specs, resolve_specs_checked, split_name_list, RejectedSpec,
    ScanError, ScanOptions, Scanner, DEFAULT_DIRECTIVE_RADIUS,
};
