//! Drive presence detection.
//!
//! A drive letter that is not mounted has no root directory. On Windows the
//! drive type is checked first, because probing an empty card reader or a
//! disconnected network share through the filesystem can stall for seconds.
use std::path::Path;

/// Returns `true` if `root` is currently observable.
pub fn drive_present(root: &Path) -> bool {
    #[cfg(windows)]
    {
        if is_drive_root(root) && !win::has_root_dir(root) {
            tracing::debug!("{} reports DRIVE_NO_ROOT_DIR", root.display());
            return false;
        }
    }
    root.is_dir()
}

#[cfg(windows)]
fn is_drive_root(root: &Path) -> bool {
    let s = root.to_string_lossy();
    let bytes = s.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\'
}

#[cfg(windows)]
mod win {
    use std::path::Path;
    use windows::Win32::Storage::FileSystem::GetDriveTypeW;

    // Drive type constants from the Windows API.
    const DRIVE_UNKNOWN_VAL: u32 = 0;
    const DRIVE_NO_ROOT_DIR_VAL: u32 = 1;

    pub(super) fn has_root_dir(root: &Path) -> bool {
        let root_wide: Vec<u16> = root
            .to_string_lossy()
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();
        let root_pcwstr = windows::core::PCWSTR(root_wide.as_ptr());

        let raw_type = unsafe { GetDriveTypeW(root_pcwstr) };
        !matches!(raw_type, DRIVE_UNKNOWN_VAL | DRIVE_NO_ROOT_DIR_VAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_directory_is_present() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(drive_present(tmp.path()));
    }

    #[test]
    fn missing_directory_is_absent() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(!drive_present(&tmp.path().join("unplugged")));
    }

    #[test]
    fn regular_file_is_not_a_drive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("f.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(!drive_present(&file));
    }
}
