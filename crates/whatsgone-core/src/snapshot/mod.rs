//! Snapshot bookkeeping: where a scan's files live, what happens to them
//! when the drive disappears, and the archive copy.
pub mod backup;
pub mod missing;

pub use backup::{backup, BackupOutcome};
pub use missing::{missing_line, preserve_once, record_missing_drive, whats_gone_path};

use crate::config::{DriveLetter, ScanSpec};
use std::path::PathBuf;

/// Derived file locations for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    /// `<output_dir>/<L>_<tag>.txt`
    pub output: PathBuf,
    /// `<backup_dir>/<L>_<tag>.txt`
    pub backup: Option<PathBuf>,
    /// `<output_dir>/<L>_missingdrive.txt`
    pub missing_log: PathBuf,
}

impl SnapshotPaths {
    pub fn new(drive: DriveLetter, spec: &ScanSpec) -> Self {
        let file_name = format!("{drive}_{}.txt", spec.tag);
        Self {
            output: spec.output_dir.join(&file_name),
            backup: spec.backup_dir.as_ref().map(|dir| dir.join(&file_name)),
            missing_log: spec.output_dir.join(format!("{drive}_missingdrive.txt")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_naming_scheme() {
        let mut spec = ScanSpec::new("Music", DriveLetter::parse("m"), "out");
        spec.backup_dir = Some(PathBuf::from("bak"));
        let paths = SnapshotPaths::new(spec.drive.unwrap(), &spec);

        assert_eq!(paths.output, PathBuf::from("out").join("M_Music.txt"));
        assert_eq!(paths.backup, Some(PathBuf::from("bak").join("M_Music.txt")));
        assert_eq!(
            paths.missing_log,
            PathBuf::from("out").join("M_missingdrive.txt")
        );
    }

    #[test]
    fn no_backup_dir_means_no_backup_path() {
        let spec = ScanSpec::new("all", DriveLetter::parse("X"), "out");
        assert_eq!(SnapshotPaths::new(spec.drive.unwrap(), &spec).backup, None);
    }
}
