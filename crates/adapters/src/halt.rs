//! Sentinel-file halt signal

use social_daemon_domain::HaltSignal;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Requests a halt while a file exists at `path`
#[derive(Debug, Clone)]
pub struct SentinelFile {
    path: PathBuf,
}

impl SentinelFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HaltSignal for SentinelFile {
    fn should_halt(&self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Cannot stat halt file, continuing"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_presence_toggles_halt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kill.switch");
        let signal = SentinelFile::new(&path);

        assert!(!signal.should_halt());

        std::fs::write(&path, "").unwrap();
        assert!(signal.should_halt());

        std::fs::remove_file(&path).unwrap();
        assert!(!signal.should_halt());
    }

    #[test]
    fn test_directory_counts_as_present() {
        let dir = TempDir::new().unwrap();
        let signal = SentinelFile::new(dir.path());
        assert!(signal.should_halt());
    }
}
