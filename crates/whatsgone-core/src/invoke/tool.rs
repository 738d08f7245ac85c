//! WizTree invocation.
//!
//! [`ScanInvocation`] turns a scan into the discrete arguments WizTree
//! expects; [`WizTree`] launches it (elevated if needed) and blocks until
//! the export has been written. The orchestrator only sees the [`ScanTool`]
//! trait so the pipeline can be driven without the real executable.
use crate::config::{DriveLetter, ToolSettings};
use crate::error::{ScanError, ScanResult};
use crate::invoke::elevate;
use crate::invoke::wait::{self, CancelToken};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything WizTree needs for one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInvocation {
    pub drive: DriveLetter,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub export: PathBuf,
}

impl ScanInvocation {
    pub fn new(drive: DriveLetter, include: &[String], exclude: &[String], export: &Path) -> Self {
        Self {
            drive,
            include: include.to_vec(),
            exclude: exclude.to_vec(),
            export: export.to_path_buf(),
        }
    }

    /// The argument vector, one element per WizTree switch.
    ///
    /// ```text
    /// X:  /filter="Videos\Movies"|"Videos\TV"  /filterexclude="*.tmp"
    ///     /export="C:\WhatsGone\X_all.txt"  /admin=1  /exportfolders=0
    /// ```
    ///
    /// Filter switches are left out when their list is empty, which makes
    /// WizTree export the whole drive.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec![self.drive.volume()];
        if !self.include.is_empty() {
            args.push(format!("/filter={}", quoted_list(&self.include)));
        }
        if !self.exclude.is_empty() {
            args.push(format!("/filterexclude={}", quoted_list(&self.exclude)));
        }
        let export = strip_quotes(&self.export.to_string_lossy());
        args.push(format!("/export=\"{export}\""));
        args.push("/admin=1".to_owned());
        args.push("/exportfolders=0".to_owned());
        args
    }
}

/// `"a"|"b"`. Double quotes inside a glob would end the quoted element
/// early, and no Windows path can contain one, so they are dropped.
fn quoted_list(globs: &[String]) -> String {
    globs
        .iter()
        .map(|g| format!("\"{}\"", strip_quotes(g)))
        .collect::<Vec<_>>()
        .join("|")
}

fn strip_quotes(s: &str) -> String {
    s.replace('"', "")
}

/// Something that can produce an export for a [`ScanInvocation`].
///
/// `run` returns once the export is complete (or the attempt failed).
/// `on_poll` receives the name of what is being waited on and the elapsed
/// time, once per poll interval.
pub trait ScanTool {
    fn run(
        &self,
        invocation: &ScanInvocation,
        cancel: &CancelToken,
        on_poll: &mut dyn FnMut(&str, Duration),
    ) -> ScanResult<()>;
}

/// The real WizTree executable.
#[derive(Debug, Clone)]
pub struct WizTree {
    settings: ToolSettings,
}

impl WizTree {
    pub fn new(settings: ToolSettings) -> Self {
        Self { settings }
    }

    fn needs_shim(&self) -> bool {
        cfg!(windows) && self.settings.elevate && !crate::platform::is_elevated()
    }

    fn direct_command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.settings.path);
        // WizTree parses its own command line; pass the switches verbatim
        // instead of letting std re-quote the embedded double quotes.
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            for arg in args {
                cmd.raw_arg(arg);
            }
        }
        #[cfg(not(windows))]
        cmd.args(args);
        cmd
    }
}

impl ScanTool for WizTree {
    fn run(
        &self,
        invocation: &ScanInvocation,
        cancel: &CancelToken,
        on_poll: &mut dyn FnMut(&str, Duration),
    ) -> ScanResult<()> {
        let tool = &self.settings.path;
        if !tool.is_file() {
            return Err(ScanError::ToolNotFound(tool.clone()));
        }

        let args = invocation.arguments();
        let elevated = self.needs_shim();
        debug!("Scanner arguments: {args:?} (elevation shim: {elevated})");

        let (mut cmd, what) = if elevated {
            (
                elevate::shim_command(tool, &args),
                "elevation shim".to_owned(),
            )
        } else {
            let name = tool
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| tool.display().to_string());
            (self.direct_command(&args), name)
        };

        // One timeout budget covers the launch and any relaunched image.
        let start = Instant::now();
        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound if !elevated => ScanError::ToolNotFound(tool.clone()),
                _ => ScanError::LaunchFailed(e.to_string()),
            })?;

        info!(
            "Scanning {} with {}",
            invocation.drive.volume(),
            tool.display()
        );

        let opts = self.settings.wait_options();
        let output = wait::wait_for_child(child, &what, opts, start, cancel, on_poll)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!("{what} stdout: {}", stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("{what} stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            if elevated {
                let reason = match stderr.trim() {
                    "" => format!("elevation shim exited with {}", output.status),
                    msg => msg.to_owned(),
                };
                return Err(ScanError::LaunchFailed(reason));
            }
            warn!("{what} exited with {}", output.status);
        }

        // WizTree.exe may relaunch WizTree64.exe and return early.
        let names = &self.settings.process_names;
        wait::wait_for_images(names, opts, start, cancel, on_poll)?;
        Ok(())
    }
}
