//! Durable, file-system-resident record of local registration intent.
//!
//! The marker files are hints, not ground truth: any of them can be stale
//! or missing, and the controller reconciles them with the remote lookup.
//! At most one of `.registered` / `.unregistered` should describe the
//! current state, but nothing here enforces that atomically; sequencing
//! is the controller's responsibility.

use chrono::{DateTime, Utc};
use roost_config::StateConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const MACHINE_ID_FILE: &str = "machine-id";
const REGISTERED_MARKER: &str = ".registered";
const UNREGISTERED_MARKER: &str = ".unregistered";

/// Existence snapshot of the local marker files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers {
    pub machine_id: bool,
    pub registered: bool,
    pub unregistered: bool,
}

impl Markers {
    /// Local evidence that this host was registered at some point.
    pub fn registration_evidence(&self) -> bool {
        self.machine_id || self.registered
    }
}

#[derive(Debug, Clone)]
pub struct LocalState {
    state_dir: PathBuf,
    facts_file: PathBuf,
    data_dir: PathBuf,
}

impl LocalState {
    pub fn new(config: &StateConfig) -> Self {
        Self {
            state_dir: config.dir.clone(),
            facts_file: config.facts_file.clone(),
            data_dir: config.data_dir.clone(),
        }
    }

    #[inline]
    pub fn machine_id_path(&self) -> PathBuf {
        self.state_dir.join(MACHINE_ID_FILE)
    }

    #[inline]
    pub fn registered_marker_path(&self) -> PathBuf {
        self.state_dir.join(REGISTERED_MARKER)
    }

    #[inline]
    pub fn unregistered_marker_path(&self) -> PathBuf {
        self.state_dir.join(UNREGISTERED_MARKER)
    }

    #[inline]
    pub fn facts_file_path(&self) -> &Path {
        &self.facts_file
    }

    #[inline]
    pub fn data_dir_path(&self) -> &Path {
        &self.data_dir
    }

    pub fn read_markers(&self) -> Markers {
        Markers {
            machine_id: self.machine_id_path().exists(),
            registered: self.registered_marker_path().exists(),
            unregistered: self.unregistered_marker_path().exists(),
        }
    }

    /// The persisted machine identifier, if one exists and is non-empty.
    pub fn machine_id(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(self.machine_id_path()) {
            Ok(content) => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_owned()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn write_machine_id(&self, machine_id: &str) -> io::Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        fs::write(self.machine_id_path(), machine_id)
    }

    pub fn write_registered_marker(&self, now: DateTime<Utc>) -> io::Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        fs::write(self.registered_marker_path(), now.to_rfc3339())
    }

    pub fn write_unregistered_marker(&self, now: DateTime<Utc>) -> io::Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        fs::write(self.unregistered_marker_path(), now.to_rfc3339())
    }

    /// Remove the `.unregistered` marker; an already-missing marker is fine.
    pub fn remove_unregistered_marker(&self) -> io::Result<()> {
        match fs::remove_file(self.unregistered_marker_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Remove every local registration artifact: the machine identifier,
    /// the `.registered` marker, the facts file, and everything under the
    /// data directory. Best-effort per path: a failed removal is logged
    /// and the loop continues. Returns the paths that were present before
    /// removal; that presence is evidence the controller uses to decide
    /// whether anything observable changed.
    pub fn clear_registration_artifacts(&self) -> Vec<PathBuf> {
        let mut targets = vec![
            self.machine_id_path(),
            self.registered_marker_path(),
            self.facts_file.clone(),
        ];
        if let Ok(entries) = fs::read_dir(&self.data_dir) {
            for entry in entries.flatten() {
                targets.push(entry.path());
            }
        }

        let mut present = Vec::new();
        for path in targets {
            let Ok(metadata) = fs::symlink_metadata(&path) else {
                continue;
            };
            present.push(path.clone());
            let removed = if metadata.is_dir() {
                tracing::debug!("removing directory {}", path.display());
                fs::remove_dir_all(&path)
            } else {
                tracing::debug!("removing file {}", path.display());
                fs::remove_file(&path)
            };
            if let Err(e) = removed {
                tracing::warn!("could not remove {}: {e}", path.display());
            }
        }
        present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_in(dir: &Path) -> LocalState {
        LocalState::new(&StateConfig {
            dir: dir.join("etc"),
            facts_file: dir.join("etc/facts/roost.facts"),
            data_dir: dir.join("var"),
        })
    }

    #[test]
    fn markers_default_to_absent() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let markers = state.read_markers();
        assert!(!markers.machine_id);
        assert!(!markers.registered);
        assert!(!markers.unregistered);
        assert!(!markers.registration_evidence());
    }

    #[test]
    fn machine_id_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        assert_eq!(state.machine_id().unwrap(), None);
        state.write_machine_id("abc-123").unwrap();
        assert_eq!(state.machine_id().unwrap().as_deref(), Some("abc-123"));
        assert!(state.read_markers().machine_id);
    }

    #[test]
    fn empty_machine_id_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        state.write_machine_id("").unwrap();
        assert_eq!(state.machine_id().unwrap(), None);
    }

    #[test]
    fn markers_carry_parseable_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let now = Utc::now();
        state.write_registered_marker(now).unwrap();
        state.write_unregistered_marker(now).unwrap();
        for path in [
            state.registered_marker_path(),
            state.unregistered_marker_path(),
        ] {
            let content = fs::read_to_string(path).unwrap();
            chrono::DateTime::parse_from_rfc3339(&content).unwrap();
        }
    }

    #[test]
    fn remove_unregistered_marker_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        state.remove_unregistered_marker().unwrap();
        state.write_unregistered_marker(Utc::now()).unwrap();
        state.remove_unregistered_marker().unwrap();
        assert!(!state.read_markers().unregistered);
        state.remove_unregistered_marker().unwrap();
    }

    #[test]
    fn clear_reports_present_paths_and_removes_them() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        state.write_machine_id("abc").unwrap();
        state.write_registered_marker(Utc::now()).unwrap();
        fs::create_dir_all(state.facts_file_path().parent().unwrap()).unwrap();
        fs::write(state.facts_file_path(), "{}").unwrap();
        let cached = state.data_dir_path().join("cache");
        fs::create_dir_all(&cached).unwrap();
        fs::write(cached.join("archive.tar.gz"), b"blob").unwrap();

        let present = state.clear_registration_artifacts();
        assert_eq!(present.len(), 4);
        assert!(present.contains(&state.machine_id_path()));
        assert!(present.contains(&cached));

        assert!(!state.machine_id_path().exists());
        assert!(!state.registered_marker_path().exists());
        assert!(!state.facts_file_path().exists());
        assert!(!cached.exists());
        // the data directory itself survives, only its contents go
        assert!(state.data_dir_path().exists());
    }

    #[test]
    fn clear_on_pristine_state_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        assert!(state.clear_registration_artifacts().is_empty());
    }

    #[test]
    fn clear_leaves_unregistered_marker_alone() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        state.write_unregistered_marker(Utc::now()).unwrap();
        state.clear_registration_artifacts();
        assert!(state.read_markers().unregistered);
    }
}
