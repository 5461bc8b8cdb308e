//! Interface to the external fact-collection runtime.
//!
//! The collector produces the canonical facts payload and the advisory
//! archive uploaded during registration. It lives outside this codebase;
//! `CommandCollector` drives it as a helper executable, and the trait keeps
//! the controller testable without one.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    /// The collector runtime itself is unavailable.
    #[error("collector unavailable: {0}")]
    Load(String),
    /// The runtime loaded but failed to produce data.
    #[error("collection failed: {0}")]
    Collection(String),
}

/// An advisory archive produced by the collector: a file on disk plus the
/// content type to upload it under. Owned by the caller only for the
/// duration of one upload.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveArtifact {
    pub path: PathBuf,
    pub content_type: String,
}

pub trait Collector {
    /// Prepare the collector runtime.
    fn load(&self) -> Result<(), CollectorError>;

    /// Collect the canonical facts payload.
    fn canonical_facts(&self) -> Result<serde_json::Value, CollectorError>;

    /// Collect an advisory archive.
    fn advisory_archive(&self) -> Result<ArchiveArtifact, CollectorError>;
}

/// Production collector: a configured helper executable.
///
/// Protocol: `<command> probe` exits zero when the runtime is usable;
/// `<command> facts` prints the canonical facts as JSON on stdout;
/// `<command> archive` prints `{"path": ..., "content_type": ...}`.
pub struct CommandCollector {
    command: PathBuf,
}

impl CommandCollector {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn run(&self, subcommand: &str) -> Result<Vec<u8>, String> {
        let output = std::process::Command::new(&self.command)
            .arg(subcommand)
            .output()
            .map_err(|e| format!("{} {subcommand}: {e}", self.command.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} {subcommand} exited with {}: {}",
                self.command.display(),
                output.status,
                stderr.trim()
            ));
        }
        Ok(output.stdout)
    }
}

impl Collector for CommandCollector {
    fn load(&self) -> Result<(), CollectorError> {
        self.run("probe").map(drop).map_err(CollectorError::Load)
    }

    fn canonical_facts(&self) -> Result<serde_json::Value, CollectorError> {
        let stdout = self.run("facts").map_err(CollectorError::Collection)?;
        serde_json::from_slice(&stdout)
            .map_err(|e| CollectorError::Collection(format!("facts output: {e}")))
    }

    fn advisory_archive(&self) -> Result<ArchiveArtifact, CollectorError> {
        let stdout = self.run("archive").map_err(CollectorError::Collection)?;
        serde_json::from_slice(&stdout)
            .map_err(|e| CollectorError::Collection(format!("archive output: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn write_script(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("collector.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn missing_command_is_a_load_error() {
        let collector = CommandCollector::new("/nonexistent/roost-collector");
        assert!(matches!(collector.load(), Err(CollectorError::Load(_))));
    }

    #[cfg(unix)]
    #[test]
    fn probe_failure_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "echo 'runtime missing' >&2; exit 3");
        let collector = CommandCollector::new(script);
        match collector.load() {
            Err(CollectorError::Load(msg)) => assert!(msg.contains("runtime missing")),
            other => panic!("expected Load error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn facts_and_archive_parse_stdout_json() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            r#"case "$1" in
probe) exit 0 ;;
facts) echo '{"fqdn": "node.example.org"}' ;;
archive) echo '{"path": "/tmp/advisory.tar.gz", "content_type": "application/gzip"}' ;;
esac"#,
        );
        let collector = CommandCollector::new(script);
        collector.load().unwrap();
        let facts = collector.canonical_facts().unwrap();
        assert_eq!(facts["fqdn"], "node.example.org");
        let archive = collector.advisory_archive().unwrap();
        assert_eq!(archive.path, PathBuf::from("/tmp/advisory.tar.gz"));
        assert_eq!(archive.content_type, "application/gzip");
    }

    #[cfg(unix)]
    #[test]
    fn garbage_facts_output_is_a_collection_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "echo 'not json'");
        let collector = CommandCollector::new(script);
        assert!(matches!(
            collector.canonical_facts(),
            Err(CollectorError::Collection(_))
        ));
    }
}
