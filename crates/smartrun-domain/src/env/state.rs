use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::layout;

pub const STATE_DIR_NAME: &str = ".smartrun";
pub const STATE_FILE_NAME: &str = "last_env.json";

/// The environment most recently created for a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvState {
    pub name: String,
    pub path: PathBuf,
    pub created_at: String,
    pub python_version: String,
    pub project_dir: PathBuf,
}

impl EnvState {
    pub fn new(name: &str, path: &Path, python_version: &str, project_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            path: layout::absolute_path(path),
            created_at: timestamp(),
            python_version: python_version.to_string(),
            project_dir: layout::absolute_path(project_dir),
        }
    }

    /// The recorded environment still has an interpreter on disk.
    pub fn is_valid(&self) -> bool {
        layout::has_interpreter(&self.path)
    }
}

fn timestamp() -> String {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
    );
    OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| "1970-01-01T00:00:00.000000Z".to_string())
}

/// Reads and writes `<project>/.smartrun/last_env.json`.
///
/// Failures are logged and swallowed: a missing or broken record only costs a
/// suggestion, never a run.
#[derive(Clone, Debug)]
pub struct EnvStateStore {
    dir: PathBuf,
}

impl EnvStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_project(project_dir: &Path) -> Self {
        Self::new(project_dir.join(STATE_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state_file(&self) -> PathBuf {
        self.dir.join(STATE_FILE_NAME)
    }

    pub fn save(&self, state: &EnvState) {
        if let Err(err) = self.try_save(state) {
            warn!(%err, path = %self.state_file().display(), "failed to record environment state");
        }
    }

    fn try_save(&self, state: &EnvState) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(state).map_err(io::Error::other)?;
        fs::write(self.state_file(), contents + "\n")
    }

    /// Records a freshly created environment, replacing any earlier record.
    pub fn record_created(
        &self,
        name: &str,
        path: &Path,
        python_version: &str,
        project_dir: &Path,
    ) -> EnvState {
        let state = EnvState::new(name, path, python_version, project_dir);
        self.save(&state);
        state
    }

    pub fn load(&self) -> Option<EnvState> {
        let path = self.state_file();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(%err, path = %path.display(), "failed to read environment state");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(%err, path = %path.display(), "ignoring malformed environment state");
                None
            }
        }
    }

    /// Deletes the record when its environment no longer exists. Returns
    /// whether a record was removed.
    pub fn clear_invalid(&self) -> bool {
        match self.load() {
            Some(state) if !state.is_valid() => {
                debug!(path = %state.path.display(), "discarding stale environment state");
                self.remove();
                true
            }
            _ => false,
        }
    }

    /// The recorded environment if it is still usable; a stale record is
    /// removed on the way.
    pub fn last_valid(&self) -> Option<EnvState> {
        let state = self.load()?;
        if state.is_valid() {
            return Some(state);
        }
        debug!(path = %state.path.display(), "discarding stale environment state");
        self.remove();
        None
    }

    fn remove(&self) {
        let path = self.state_file();
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(%err, path = %path.display(), "failed to remove environment state");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fake_env(root: &Path) {
        let python = layout::interpreter_path(root);
        fs::create_dir_all(python.parent().unwrap()).unwrap();
        fs::write(python, "").unwrap();
    }

    #[test]
    fn record_round_trips_through_disk() {
        let temp = tempdir().unwrap();
        let env_root = temp.path().join(".venv");
        fake_env(&env_root);
        let store = EnvStateStore::for_project(temp.path());

        let saved = store.record_created(".venv", &env_root, "3.12.4", temp.path());
        assert!(saved.path.is_absolute());
        assert!(saved.created_at.ends_with('Z'));
        assert_eq!(saved.created_at.len(), "2024-01-01T00:00:00.000000Z".len());

        let loaded = store.load().expect("state");
        assert_eq!(loaded, saved);
        assert_eq!(store.last_valid(), Some(saved));
    }

    #[test]
    fn stale_record_is_deleted() {
        let temp = tempdir().unwrap();
        let env_root = temp.path().join("gone");
        fake_env(&env_root);
        let store = EnvStateStore::for_project(temp.path());
        store.record_created("gone", &env_root, "3.12.0", temp.path());

        fs::remove_dir_all(&env_root).unwrap();
        assert!(store.clear_invalid());
        assert!(!store.state_file().exists());
        assert!(store.last_valid().is_none());
    }

    #[test]
    fn newer_creation_overwrites_record() {
        let temp = tempdir().unwrap();
        let store = EnvStateStore::for_project(temp.path());
        for name in ["first", "second"] {
            let root = temp.path().join(name);
            fake_env(&root);
            store.record_created(name, &root, "3.11.9", temp.path());
        }
        assert_eq!(store.load().unwrap().name, "second");
    }

    #[test]
    fn malformed_record_reads_as_absent() {
        let temp = tempdir().unwrap();
        let store = EnvStateStore::for_project(temp.path());
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.state_file(), "{ not json").unwrap();
        assert!(store.load().is_none());
        assert!(!store.clear_invalid());
    }

    #[test]
    fn state_file_uses_documented_field_names() {
        let temp = tempdir().unwrap();
        let store = EnvStateStore::for_project(temp.path());
        store.record_created("env", &temp.path().join("env"), "3.12.1", temp.path());
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.state_file()).unwrap()).unwrap();
        for key in ["name", "path", "created_at", "python_version", "project_dir"] {
            assert!(raw.get(key).is_some(), "missing {key}");
        }
    }
}
