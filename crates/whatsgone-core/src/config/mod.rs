//! Configuration: the table of named scans plus scanner settings.
//!
//! The table is read once from a TOML file at start-up and handed to the
//! orchestrator as an immutable `Vec<ScanSpec>`. Nothing mutates it at
//! runtime.
//!
//! ```toml
//! [tool]
//! path = "C:/Program Files/WizTree/WizTree64.exe"
//! timeout_secs = 3600
//!
//! [defaults]
//! output_dir = "C:/WhatsGone"
//! backup_dir = "D:/WhatsGoneBackup"
//!
//! [[scan]]
//! tag = "Movies"
//! drive = "X"
//! include = ['Videos\Movies', 'Videos\TV']
//! ```
pub mod drive;

pub use drive::DriveLetter;

use crate::invoke::wait::WaitOptions;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "whatsgone.toml";

pub const DEFAULT_TOOL_PATH: &str = "C:/Program Files/WizTree/WizTree64.exe";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("scan {tag:?} has no output_dir and [defaults] does not set one")]
    MissingOutputDir { tag: String },

    #[error("scan tag must not be empty")]
    EmptyTag,

    #[error("scan {tag:?} is configured twice for the same drive")]
    Duplicate { tag: String },

    #[error("tool.poll_interval_secs must be at least 1")]
    ZeroPollInterval,
}

/// Settings for the external scanner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    /// Path to the scanner executable.
    pub path: PathBuf,
    /// Image names that must all be gone before the export is read.
    pub process_names: Vec<String>,
    /// Launch through the UAC shim when the current process is not elevated.
    pub elevate: bool,
    pub poll_interval_secs: u64,
    /// Upper bound on a single scan. `None` waits forever.
    pub timeout_secs: Option<u64>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_TOOL_PATH),
            process_names: vec!["WizTree64.exe".to_owned(), "WizTree.exe".to_owned()],
            elevate: true,
            poll_interval_secs: 1,
            timeout_secs: None,
        }
    }
}

impl ToolSettings {
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Defaults {
    output_dir: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanEntry {
    tag: String,
    drive: Option<DriveLetter>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    output_dir: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    root: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    tool: ToolSettings,
    #[serde(default)]
    defaults: Defaults,
    #[serde(default, rename = "scan")]
    scans: Vec<ScanEntry>,
}

/// One named scan, fully resolved against `[defaults]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSpec {
    pub tag: String,
    /// `None` means the entry is not actionable and is skipped.
    pub drive: Option<DriveLetter>,
    /// Path globs passed to the scanner. Empty means everything.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub output_dir: PathBuf,
    pub backup_dir: Option<PathBuf>,
    /// Overrides the probed drive root (mount points, tests).
    pub root: Option<PathBuf>,
}

impl ScanSpec {
    /// A spec with no filters and no backup.
    pub fn new(
        tag: impl Into<String>,
        drive: Option<DriveLetter>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tag: tag.into(),
            drive,
            include: Vec::new(),
            exclude: Vec::new(),
            output_dir: output_dir.into(),
            backup_dir: None,
            root: None,
        }
    }

    /// Directory whose presence decides whether the drive is mounted.
    pub fn drive_root(&self, drive: DriveLetter) -> PathBuf {
        self.root.clone().unwrap_or_else(|| drive.root())
    }
}

/// Loaded configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub tool: ToolSettings,
    pub scans: Vec<ScanSpec>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;

        if file.tool.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        let mut seen = HashSet::new();
        let mut scans = Vec::with_capacity(file.scans.len());
        for entry in file.scans {
            let tag = entry.tag.trim().to_owned();
            if tag.is_empty() {
                return Err(ConfigError::EmptyTag);
            }
            if !seen.insert((entry.drive, tag.clone())) {
                return Err(ConfigError::Duplicate { tag });
            }

            let output_dir = entry
                .output_dir
                .or_else(|| file.defaults.output_dir.clone())
                .ok_or_else(|| ConfigError::MissingOutputDir { tag: tag.clone() })?;
            let backup_dir = entry
                .backup_dir
                .or_else(|| file.defaults.backup_dir.clone());

            scans.push(ScanSpec {
                tag,
                drive: entry.drive,
                include: entry.include,
                exclude: entry.exclude,
                output_dir,
                backup_dir,
                root: entry.root,
            });
        }

        Ok(Self {
            tool: file.tool,
            scans,
        })
    }

    /// Keep only the scans whose tag is listed. An empty list keeps all.
    pub fn retain_tags(&mut self, tags: &[String]) {
        if tags.is_empty() {
            return;
        }
        self.scans
            .retain(|spec| tags.iter().any(|t| t.eq_ignore_ascii_case(&spec.tag)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[tool]
path = "D:/Tools/WizTree64.exe"
timeout_secs = 600

[defaults]
output_dir = "C:/WhatsGone"
backup_dir = "E:/Backup"

[[scan]]
tag = "all"
drive = "X:"
include = ['Videos\Movies', 'Videos\TV']

[[scan]]
tag = "Music"
drive = "m"
exclude = ['*.tmp']
output_dir = "C:/Music"
backup_dir = "F:/MusicBackup"

[[scan]]
tag = "Unplugged"
"#;

    #[test]
    fn parses_and_inherits_defaults() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.tool.path, PathBuf::from("D:/Tools/WizTree64.exe"));
        assert_eq!(config.tool.process_names, ["WizTree64.exe", "WizTree.exe"]);
        assert!(config.tool.elevate);
        assert_eq!(config.scans.len(), 3);

        let all = &config.scans[0];
        assert_eq!(all.drive, DriveLetter::parse("X"));
        assert_eq!(all.include, ["Videos\\Movies", "Videos\\TV"]);
        assert!(all.exclude.is_empty());
        assert_eq!(all.output_dir, PathBuf::from("C:/WhatsGone"));
        assert_eq!(all.backup_dir, Some(PathBuf::from("E:/Backup")));

        let music = &config.scans[1];
        assert_eq!(music.drive.unwrap().letter(), 'M');
        assert_eq!(music.output_dir, PathBuf::from("C:/Music"));
        assert_eq!(music.backup_dir, Some(PathBuf::from("F:/MusicBackup")));

        assert_eq!(config.scans[2].drive, None);
    }

    #[test]
    fn wait_options_from_settings() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let opts = config.tool.wait_options();
        assert_eq!(opts.poll_interval, Duration::from_secs(1));
        assert_eq!(opts.timeout, Some(Duration::from_secs(600)));

        let unbounded = ToolSettings::default().wait_options();
        assert_eq!(unbounded.timeout, None);
    }

    #[test]
    fn empty_config_has_no_scans() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.scans.is_empty());
        assert_eq!(config.tool.path, PathBuf::from(DEFAULT_TOOL_PATH));
    }

    #[test]
    fn missing_output_dir_is_fatal() {
        let toml = "[[scan]]\ntag = \"a\"\ndrive = \"C\"\n";
        let err = Config::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOutputDir { .. }));
    }

    #[test]
    fn invalid_drive_is_fatal() {
        let err = Config::from_toml_str(
            "[defaults]\noutput_dir = \"out\"\n[[scan]]\ntag = \"a\"\ndrive = \"CD\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn duplicate_scan_is_rejected() {
        let toml = r#"
[defaults]
output_dir = "out"
[[scan]]
tag = "a"
drive = "C"
[[scan]]
tag = "a"
drive = "c:"
"#;
        assert!(matches!(
            Config::from_toml_str(toml),
            Err(ConfigError::Duplicate { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("[tool]\npaht = \"x\"\n").is_err());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(matches!(
            Config::from_toml_str("[tool]\npoll_interval_secs = 0\n"),
            Err(ConfigError::ZeroPollInterval)
        ));
    }

    #[test]
    fn example_config_parses() {
        let example = include_str!("../../../../whatsgone.example.toml");
        let config = Config::from_toml_str(example).unwrap();
        assert_eq!(config.scans.len(), 2);
        assert_eq!(config.scans[1].exclude, ["*.tmp"]);
        assert_eq!(config.scans[1].backup_dir, None);
    }

    #[test]
    fn retain_tags_filters_case_insensitively() {
        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.retain_tags(&["music".to_owned()]);
        assert_eq!(config.scans.len(), 1);
        assert_eq!(config.scans[0].tag, "Music");

        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.retain_tags(&[]);
        assert_eq!(config.scans.len(), 3);
    }
}
