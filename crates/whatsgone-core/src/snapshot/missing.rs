//! Missing-drive handling.
//!
//! When a drive is absent its log gets one timestamped line, and the last
//! good snapshot is moved aside to `<stem>_whats_gone<ext>`. The move only
//! happens while no such file exists, so the first absence is the one that
//! is preserved; later absences and the drive's eventual (possibly emptier)
//! return cannot overwrite it.
use crate::config::DriveLetter;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const WHATS_GONE_SUFFIX: &str = "_whats_gone";

/// `Drive M: is missing as of 2024-05-01 09:30:00.`
pub fn missing_line(drive: DriveLetter, at: DateTime<Local>) -> String {
    format!(
        "Drive {} is missing as of {}.",
        drive.volume(),
        at.format(TIMESTAMP_FORMAT)
    )
}

/// Append one line to the drive's missing log, creating it if needed.
pub fn record_missing_drive(
    log: &Path,
    drive: DriveLetter,
    at: DateTime<Local>,
) -> io::Result<()> {
    if let Some(dir) = log.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(log)?;
    writeln!(file, "{}", missing_line(drive, at))?;
    file.flush()
}

/// `M_Music.txt` -> `M_Music_whats_gone.txt`
pub fn whats_gone_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{WHATS_GONE_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{WHATS_GONE_SUFFIX}"),
    };
    path.with_file_name(name)
}

/// Rename `path` to its `_whats_gone` sibling unless that sibling exists.
///
/// Returns the new path when a rename happened.
pub fn preserve_once(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    let target = whats_gone_path(path);
    if target.exists() {
        return Ok(None);
    }
    fs::rename(path, &target)?;
    info!("Preserved {} as {}", path.display(), target.display());
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn m() -> DriveLetter {
        DriveLetter::parse("M").unwrap()
    }

    #[test]
    fn line_format() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(
            missing_line(m(), at),
            "Drive M: is missing as of 2024-05-01 09:30:00."
        );
    }

    #[test]
    fn log_is_appended_never_truncated() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("nested").join("M_missingdrive.txt");
        let first = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let second = Local.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap();

        record_missing_drive(&log, m(), first).unwrap();
        record_missing_drive(&log, m(), second).unwrap();

        let content = fs::read_to_string(&log).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            [
                "Drive M: is missing as of 2024-05-01 09:30:00.",
                "Drive M: is missing as of 2024-05-02 09:30:00.",
            ]
        );
    }

    #[test]
    fn whats_gone_name() {
        assert_eq!(
            whats_gone_path(Path::new("out/M_Music.txt")),
            PathBuf::from("out/M_Music_whats_gone.txt")
        );
        assert_eq!(
            whats_gone_path(Path::new("out/M_Music")),
            PathBuf::from("out/M_Music_whats_gone")
        );
    }

    #[test]
    fn preserves_only_once() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("M_Music.txt");
        fs::write(&output, "old\n").unwrap();

        let renamed = preserve_once(&output).unwrap().unwrap();
        assert_eq!(fs::read_to_string(&renamed).unwrap(), "old\n");
        assert!(!output.exists());

        // A newer snapshot appears, then the drive vanishes again.
        fs::write(&output, "newer\n").unwrap();
        assert_eq!(preserve_once(&output).unwrap(), None);
        assert_eq!(fs::read_to_string(&output).unwrap(), "newer\n");
        assert_eq!(fs::read_to_string(&renamed).unwrap(), "old\n");
    }

    #[test]
    fn nothing_to_preserve() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(preserve_once(&tmp.path().join("absent.txt")).unwrap(), None);
    }
}
