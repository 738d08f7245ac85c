//! Completion waits for the external scanner.
//!
//! The scanner is launched through a UAC shim, and WizTree may hand off to a
//! second image (`WizTree.exe` relaunching `WizTree64.exe`), so two waits are
//! offered:
//!
//! - [`wait_for_child`]: blocks on a process we spawned. A watcher thread
//!   owns the `Child` and delivers its exit over a channel, so completion is
//!   seen immediately rather than on the next poll tick.
//! - [`wait_for_images`]: watches the process table until no process with
//!   one of the given image names is left.
//!
//! Both take the `Instant` the overall wait started at, so back-to-back waits
//! share one [`WaitOptions::timeout`] budget. Both honour a [`CancelToken`].
//! The `on_poll` callback fires once per interval while still waiting, with
//! the time elapsed since that start.
use crossbeam_channel::RecvTimeoutError;
use std::io;
use std::process::{Child, Output};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessesToUpdate, System};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WaitError {
    #[error("{what} still running after {}s", .after.as_secs())]
    TimedOut { what: String, after: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Shared cancellation flag. Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request every wait holding this token to stop at its next tick.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

impl WaitOptions {
    fn check(&self, what: &str, start: Instant, cancel: &CancelToken) -> Result<(), WaitError> {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        match self.timeout {
            Some(limit) if start.elapsed() >= limit => Err(WaitError::TimedOut {
                what: what.to_owned(),
                after: limit,
            }),
            _ => Ok(()),
        }
    }
}

/// Wait for a spawned child to exit, collecting any piped output.
///
/// The timeout counts from `start`. On timeout or cancellation the child is
/// killed (best effort) before the error is returned.
pub fn wait_for_child(
    child: Child,
    what: &str,
    opts: WaitOptions,
    start: Instant,
    cancel: &CancelToken,
    on_poll: &mut dyn FnMut(&str, Duration),
) -> Result<Output, WaitError> {
    let pid = child.id();
    let (tx, rx) = crossbeam_channel::bounded::<io::Result<Output>>(1);

    thread::Builder::new()
        .name("whatsgone-child-wait".into())
        .spawn(move || {
            let _ = tx.send(child.wait_with_output());
        })?;

    loop {
        match rx.recv_timeout(opts.poll_interval) {
            Ok(result) => {
                let output = result?;
                debug!("{what} (pid {pid}) exited with {}", output.status);
                return Ok(output);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(WaitError::Io(io::Error::other(
                    "child watcher thread exited without a status",
                )));
            }
        }

        if let Err(e) = opts.check(what, start, cancel) {
            kill_pid(pid);
            return Err(e);
        }
        on_poll(what, start.elapsed());
    }
}

/// Wait until no running process matches any of `names` (case-insensitive).
///
/// The timeout counts from `start`, which may lie in the past.
pub fn wait_for_images(
    names: &[String],
    opts: WaitOptions,
    start: Instant,
    cancel: &CancelToken,
    on_poll: &mut dyn FnMut(&str, Duration),
) -> Result<(), WaitError> {
    if names.is_empty() {
        return Ok(());
    }

    let mut sys = System::new();
    let mut polled = false;
    loop {
        sys.refresh_processes(ProcessesToUpdate::All, true);
        let running = sys.processes().values().find_map(|p| {
            let image = p.name().to_string_lossy();
            names.iter().find(|n| n.eq_ignore_ascii_case(&image))
        });

        let Some(name) = running else {
            if polled {
                info!("{} has finished", names.join(" / "));
            }
            return Ok(());
        };

        opts.check(name, start, cancel)?;
        on_poll(name, start.elapsed());
        polled = true;
        thread::sleep(opts.poll_interval);
    }
}

fn kill_pid(pid: u32) {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    match sys.process(pid) {
        Some(process) if process.kill() => debug!("Killed pid {pid}"),
        Some(_) => warn!("Could not kill pid {pid}; it may keep running"),
        None => {}
    }
}
