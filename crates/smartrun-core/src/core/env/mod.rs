//! Environment detection, creation, repair and reconciliation.

pub mod detector;
mod errors;
pub mod lifecycle;
pub mod reconcile;
mod repair;

pub use detector::{detect_active, ActiveEnvironment, EnvironmentKind};
pub use errors::{EnvError, StrategyFailure};
pub use lifecycle::{CreationStrategy, EnsuredEnvironment, EnvironmentManager};
pub use reconcile::{expected_env_path, reconcile, EnvCheck, EnvWarning, DEFAULT_ENV_DIR};
pub use repair::ensure_installer;
