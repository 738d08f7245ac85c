//! Run progress reporting: lightweight messages sent from the orchestrator
//! thread to whoever renders them, via a crossbeam channel.
use crate::config::DriveLetter;
use std::path::PathBuf;
use std::time::Duration;

/// Why a scan entry was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry has no drive letter configured.
    NoDrive,
    /// The drive is not mounted. Lists the files moved to `_whats_gone`.
    DriveMissing { preserved: Vec<PathBuf> },
    /// The run was cancelled before this entry started.
    Cancelled,
}

#[derive(Debug)]
pub enum RunProgress {
    /// An entry is about to be processed.
    Started {
        tag: String,
        drive: Option<DriveLetter>,
    },
    /// Still waiting on the scanner. Sent once per poll interval.
    Waiting {
        tag: String,
        process: String,
        elapsed: Duration,
    },
    Skipped {
        tag: String,
        reason: SkipReason,
    },
    /// The export was normalised and (if configured) backed up.
    Finished {
        tag: String,
        paths: usize,
        output: PathBuf,
        backup: Option<PathBuf>,
    },
    /// A non-fatal failure; the run continues with the next entry.
    Failed {
        tag: String,
        message: String,
    },
    /// All entries processed.
    Complete {
        duration: Duration,
        finished: usize,
        skipped: usize,
        failed: usize,
    },
}
