use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::process::DEFAULT_MAX_CAPTURE_BYTES;

pub const PYTHON_ENV: &str = "SMARTRUN_PYTHON";
pub const NO_UV_ENV: &str = "SMARTRUN_NO_UV";
pub const TIMEOUT_ENV: &str = "SMARTRUN_TIMEOUT";
pub const VERBOSE_ENV: &str = "SMARTRUN_VERBOSE";
pub const BACKOFF_ENV: &str = "SMARTRUN_CREATE_BACKOFF_MS";
pub const MAX_CAPTURE_ENV: &str = "SMARTRUN_MAX_CAPTURE_BYTES";

const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_CREATE_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
    pub no_uv: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    #[must_use]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }

    pub fn flag_is_enabled(&self, key: &str) -> bool {
        matches!(self.vars.get(key).map(String::as_str), Some("1"))
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    fn parse_u64(&self, key: &str) -> Option<u64> {
        let raw = self.var(key)?.trim();
        match raw.parse::<u64>() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%err, key, value = raw, "ignoring invalid numeric setting");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) python: Option<String>,
    pub(crate) use_uv: bool,
    pub(crate) verbose: bool,
    pub(crate) run_timeout: Duration,
    pub(crate) create_backoff: Duration,
    pub(crate) max_capture_bytes: usize,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    #[must_use]
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            python: snapshot
                .var(PYTHON_ENV)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
            use_uv: !snapshot.contains(NO_UV_ENV),
            verbose: snapshot.flag_is_enabled(VERBOSE_ENV),
            run_timeout: snapshot
                .parse_u64(TIMEOUT_ENV)
                .filter(|secs| *secs > 0)
                .map_or(DEFAULT_RUN_TIMEOUT, Duration::from_secs),
            create_backoff: snapshot
                .parse_u64(BACKOFF_ENV)
                .map_or(DEFAULT_CREATE_BACKOFF, Duration::from_millis),
            max_capture_bytes: snapshot
                .parse_u64(MAX_CAPTURE_ENV)
                .and_then(|value| usize::try_from(value).ok())
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES),
        }
    }

    /// Applies command-line flags, which win over environment variables.
    #[must_use]
    pub fn with_global(mut self, global: &GlobalOptions) -> Self {
        if global.no_uv {
            self.use_uv = false;
        }
        if global.verbose > 0 || global.trace {
            self.verbose = true;
        }
        self
    }

    pub fn python(&self) -> Option<&str> {
        self.python.as_deref()
    }

    pub fn use_uv(&self) -> bool {
        self.use_uv
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run_timeout(&self) -> Duration {
        self.run_timeout
    }

    pub fn create_backoff(&self) -> Duration {
        self.create_backoff
    }

    pub fn max_capture_bytes(&self) -> usize {
        self.max_capture_bytes
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_snapshot(&EnvSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_without_variables() {
        let config = Config::default();
        assert!(config.python().is_none());
        assert!(config.use_uv());
        assert!(!config.verbose());
        assert_eq!(config.run_timeout(), Duration::from_secs(600));
        assert_eq!(config.create_backoff(), Duration::from_secs(2));
        assert_eq!(config.max_capture_bytes(), DEFAULT_MAX_CAPTURE_BYTES);
    }

    #[test]
    fn reads_every_variable() {
        let snapshot = EnvSnapshot::from_pairs(&[
            (PYTHON_ENV, "/opt/python/bin/python3.11"),
            (NO_UV_ENV, ""),
            (TIMEOUT_ENV, "30"),
            (VERBOSE_ENV, "1"),
            (BACKOFF_ENV, "0"),
            (MAX_CAPTURE_ENV, "2048"),
        ]);
        let config = Config::from_snapshot(&snapshot);
        assert_eq!(config.python(), Some("/opt/python/bin/python3.11"));
        assert!(!config.use_uv(), "presence alone disables uv");
        assert!(config.verbose());
        assert_eq!(config.run_timeout(), Duration::from_secs(30));
        assert_eq!(config.create_backoff(), Duration::ZERO);
        assert_eq!(config.max_capture_bytes(), 2048);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let snapshot = EnvSnapshot::from_pairs(&[(TIMEOUT_ENV, "soon"), (MAX_CAPTURE_ENV, "0")]);
        let config = Config::from_snapshot(&snapshot);
        assert_eq!(config.run_timeout(), Duration::from_secs(600));
        assert_eq!(config.max_capture_bytes(), DEFAULT_MAX_CAPTURE_BYTES);
    }

    #[test]
    fn flags_override_environment() {
        let config = Config::default().with_global(&GlobalOptions {
            no_uv: true,
            verbose: 1,
            ..GlobalOptions::default()
        });
        assert!(!config.use_uv());
        assert!(config.verbose());
    }

    #[test]
    #[serial]
    fn from_env_captures_the_process_environment() {
        let previous = env::var_os(TIMEOUT_ENV);
        env::set_var(TIMEOUT_ENV, "75");
        let config = Config::from_env();
        match previous {
            Some(value) => env::set_var(TIMEOUT_ENV, value),
            None => env::remove_var(TIMEOUT_ENV),
        }
        assert_eq!(config.run_timeout(), Duration::from_secs(75));
    }
}
