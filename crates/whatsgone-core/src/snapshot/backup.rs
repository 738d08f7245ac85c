//! Archive copy of a normalised snapshot.
use crate::error::{ScanError, ScanResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// No backup directory configured.
    Skipped,
    /// Copied this many bytes to the path.
    Copied { path: PathBuf, bytes: u64 },
}

/// Copy `output` to `dest`, replacing whatever is there.
///
/// `None` is a no-op. The destination's directory is created on demand.
pub fn backup(output: &Path, dest: Option<&Path>) -> ScanResult<BackupOutcome> {
    let Some(dest) = dest else {
        return Ok(BackupOutcome::Skipped);
    };
    let err = |source| ScanError::Backup {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(err)?;
    }
    let bytes = fs::copy(output, dest).map_err(err)?;
    info!("Backed up {} to {}", output.display(), dest.display());

    Ok(BackupOutcome::Copied {
        path: dest.to_path_buf(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn no_destination_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("X_all.txt");
        fs::write(&output, "a\n").unwrap();

        assert_eq!(backup(&output, None).unwrap(), BackupOutcome::Skipped);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn copy_is_byte_identical_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("X_all.txt");
        let dest = tmp.path().join("archive").join("deeper").join("X_all.txt");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, "stale contents that are longer\n").unwrap();
        fs::write(&output, "C:\\a.mkv\nC:\\b.mkv\n").unwrap();

        let outcome = backup(&output, Some(&dest)).unwrap();
        assert_eq!(
            outcome,
            BackupOutcome::Copied {
                path: dest.clone(),
                bytes: 18
            }
        );
        assert_eq!(fs::read(&dest).unwrap(), fs::read(&output).unwrap());
    }

    #[test]
    fn creates_missing_destination_dir() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("X_all.txt");
        fs::write(&output, "p\n").unwrap();
        let dest = tmp.path().join("new").join("X_all.txt");

        backup(&output, Some(&dest)).unwrap();
        assert!(dest.is_file());
    }

    #[test]
    fn unreadable_source_is_a_backup_error() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("missing.txt");
        let dest = tmp.path().join("b.txt");
        let err = backup(&source, Some(&dest)).unwrap_err();
        assert!(matches!(err, ScanError::Backup { .. }));
    }
}
