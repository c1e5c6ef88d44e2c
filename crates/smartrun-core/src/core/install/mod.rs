mod installer;
mod source;

pub use installer::{
    InstallFailure, InstallMode, InstallReport, InstallTool, Installer, MANIFEST_FILE_NAME,
};
pub use source::{InstallSource, InstallSourceError, ResolvedSource};
