//! Run orchestrator: walks the scan table one entry at a time.
//!
//! Per entry: resolve the drive, check it is mounted (logging and
//! preserving the previous snapshot if not), launch the scanner, wait for
//! it, normalise the export, and copy it to the backup location. Entries are
//! independent; a failure is recorded against its entry and the next one
//! proceeds.
//!
//! [`Orchestrator::run`] is synchronous. [`start_run`] moves it onto a
//! background thread and streams [`RunProgress`] messages, which is what
//! the CLI uses so it can render the wait and react to Ctrl+C.
pub mod progress;

use crate::config::{DriveLetter, ScanSpec};
use crate::error::{ScanError, ScanResult};
use crate::export::normalize_export;
use crate::invoke::{CancelToken, ScanInvocation, ScanTool};
use crate::platform::drive_present;
use crate::snapshot::{self, BackupOutcome, SnapshotPaths};
use chrono::Local;
use crossbeam_channel::{Receiver, Sender};
use progress::{RunProgress, SkipReason};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

/// Maximum number of progress messages that may queue up in the channel.
///
/// The consumer drains continuously; the bound only matters if it stalls,
/// in which case the orchestrator blocks instead of growing the queue.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Result of one scan entry.
#[derive(Debug)]
pub enum SpecOutcome {
    Finished {
        paths: usize,
        output: PathBuf,
        backup: BackupOutcome,
    },
    Skipped(SkipReason),
    Failed(ScanError),
}

/// Outcome of every entry, in table order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<(String, SpecOutcome)>,
}

impl RunReport {
    pub fn finished(&self) -> usize {
        self.count(|o| matches!(o, SpecOutcome::Finished { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SpecOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SpecOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&SpecOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

pub struct Orchestrator<T> {
    tool: T,
    cancel: CancelToken,
    progress_tx: Option<Sender<RunProgress>>,
}

impl<T: ScanTool> Orchestrator<T> {
    pub fn new(tool: T) -> Self {
        Self {
            tool,
            cancel: CancelToken::new(),
            progress_tx: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, tx: Sender<RunProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    fn emit(&self, msg: RunProgress) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(msg);
        }
    }

    /// Process every spec in order. Never fails as a whole.
    pub fn run(&self, specs: &[ScanSpec]) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::default();

        for spec in specs {
            let outcome = if self.cancel.is_cancelled() {
                SpecOutcome::Skipped(SkipReason::Cancelled)
            } else {
                self.emit(RunProgress::Started {
                    tag: spec.tag.clone(),
                    drive: spec.drive,
                });
                self.run_one(spec)
            };

            match &outcome {
                SpecOutcome::Finished {
                    paths,
                    output,
                    backup,
                } => self.emit(RunProgress::Finished {
                    tag: spec.tag.clone(),
                    paths: *paths,
                    output: output.clone(),
                    backup: match backup {
                        BackupOutcome::Copied { path, .. } => Some(path.clone()),
                        BackupOutcome::Skipped => None,
                    },
                }),
                SpecOutcome::Skipped(reason) => self.emit(RunProgress::Skipped {
                    tag: spec.tag.clone(),
                    reason: reason.clone(),
                }),
                SpecOutcome::Failed(e) => {
                    // The progress message is the user-facing report.
                    debug!("Scan {:?} failed: {e:?}", spec.tag);
                    self.emit(RunProgress::Failed {
                        tag: spec.tag.clone(),
                        message: e.to_string(),
                    });
                }
            }
            report.outcomes.push((spec.tag.clone(), outcome));
        }

        info!(
            "Run finished in {:.1}s: {} finished, {} skipped, {} failed",
            start.elapsed().as_secs_f64(),
            report.finished(),
            report.skipped(),
            report.failed()
        );
        self.emit(RunProgress::Complete {
            duration: start.elapsed(),
            finished: report.finished(),
            skipped: report.skipped(),
            failed: report.failed(),
        });
        report
    }

    fn run_one(&self, spec: &ScanSpec) -> SpecOutcome {
        let Some(drive) = spec.drive else {
            warn!("Scan {:?} has no drive configured, skipping", spec.tag);
            return SpecOutcome::Skipped(SkipReason::NoDrive);
        };
        let paths = SnapshotPaths::new(drive, spec);

        let root = spec.drive_root(drive);
        if !drive_present(&root) {
            warn!("Drive {} ({}) is missing", drive.volume(), root.display());
            return match handle_missing(drive, &paths) {
                Ok(preserved) => SpecOutcome::Skipped(SkipReason::DriveMissing { preserved }),
                Err(e) => SpecOutcome::Failed(e),
            };
        }

        match self.scan(drive, spec, &paths) {
            Ok(outcome) => outcome,
            Err(e) => SpecOutcome::Failed(e),
        }
    }

    fn scan(
        &self,
        drive: DriveLetter,
        spec: &ScanSpec,
        paths: &SnapshotPaths,
    ) -> ScanResult<SpecOutcome> {
        fs::create_dir_all(&spec.output_dir).map_err(|source| ScanError::Io {
            path: spec.output_dir.clone(),
            source,
        })?;

        let before = fingerprint(&paths.output);
        let invocation = ScanInvocation::new(
            drive,
            &spec.include,
            &spec.exclude,
            &paths.output,
        );
        self.tool.run(&invocation, &self.cancel, &mut |process, elapsed| {
            self.emit(RunProgress::Waiting {
                tag: spec.tag.clone(),
                process: process.to_owned(),
                elapsed,
            })
        })?;

        // An export the scanner never rewrote is the previous normalised
        // snapshot; re-normalising it would eat its first path.
        if before.is_some() && fingerprint(&paths.output) == before {
            return Err(ScanError::ExportNotWritten(paths.output.clone()));
        }

        let count = normalize_export(&paths.output)?;
        let backup = snapshot::backup(&paths.output, paths.backup.as_deref())?;

        Ok(SpecOutcome::Finished {
            paths: count,
            output: paths.output.clone(),
            backup,
        })
    }
}

fn fingerprint(path: &Path) -> Option<(u64, SystemTime)> {
    let meta = fs::metadata(path).ok()?;
    Some((meta.len(), meta.modified().ok()?))
}

/// Log the absence and move the last snapshots aside, once.
fn handle_missing(drive: DriveLetter, paths: &SnapshotPaths) -> ScanResult<Vec<PathBuf>> {
    snapshot::record_missing_drive(&paths.missing_log, drive, Local::now()).map_err(|source| {
        ScanError::Io {
            path: paths.missing_log.clone(),
            source,
        }
    })?;

    let mut preserved = Vec::new();
    for path in std::iter::once(&paths.output).chain(paths.backup.as_ref()) {
        match snapshot::preserve_once(path) {
            Ok(Some(renamed)) => preserved.push(renamed),
            Ok(None) => {}
            Err(source) => {
                return Err(ScanError::Io {
                    path: path.clone(),
                    source,
                });
            }
        }
    }
    Ok(preserved)
}

/// Handle to a run executing on a background thread.
pub struct RunHandle {
    /// Progress messages; disconnects once the run thread exits.
    pub progress_rx: Receiver<RunProgress>,
    cancel: CancelToken,
    thread: thread::JoinHandle<RunReport>,
}

impl RunHandle {
    /// Stop the current wait and skip the remaining entries.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the run thread exits. `None` if it panicked.
    pub fn join(self) -> Option<RunReport> {
        self.thread.join().ok()
    }
}

/// Start the orchestrator on a background thread.
pub fn start_run<T>(
    tool: T,
    specs: Vec<ScanSpec>,
    cancel: CancelToken,
) -> std::io::Result<RunHandle>
where
    T: ScanTool + Send + 'static,
{
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<RunProgress>(PROGRESS_CHANNEL_CAPACITY);
    let orchestrator = Orchestrator::new(tool)
        .with_cancel(cancel.clone())
        .with_progress(progress_tx);

    let thread = thread::Builder::new()
        .name("whatsgone-run".into())
        .spawn(move || {
            info!("Starting run of {} scan(s)", specs.len());
            orchestrator.run(&specs)
        })?;

    Ok(RunHandle {
        progress_rx,
        cancel,
        thread,
    })
}
